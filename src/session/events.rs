use std::collections::HashMap;

use serde::Serialize;

use crate::engine::EngineEvent;
use crate::render::{PaneKind, Renderer};
use crate::stats::InfoBar;
use crate::timeline::TimelineIntervalPlan;

use super::{Generation, SessionSnapshot};

/// Results of work the controller started, tagged with the generation that started it.
#[derive(Debug)]
pub(crate) enum ControllerEvent {
    Engine {
        generation: Generation,
        event: EngineEvent,
    },
    StatsComputed {
        generation: Generation,
        summary: crate::stats::DecodedAudioSummary,
    },
    ResizeSettled {
        generation: Generation,
        sequence: u64,
        width_px: f64,
    },
}

/// Instructions for the rendering layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ViewEvent {
    #[serde(rename_all = "camelCase")]
    Progress { percent: f64, status: String },
    StateChanged { snapshot: SessionSnapshot },
    #[serde(rename_all = "camelCase")]
    PaneConstructed {
        generation: Generation,
        renderer: Renderer,
    },
    #[serde(rename_all = "camelCase")]
    PaneDestroyed {
        generation: Generation,
        pane: PaneKind,
    },
    #[serde(rename_all = "camelCase")]
    PaneResized { pane: PaneKind, width_px: f64 },
    TimelineApplied { plan: TimelineIntervalPlan },
    InfoUpdated { info: InfoBar },
    #[serde(rename_all = "camelCase")]
    Zoom { pixels_per_second: f64 },
    Cursors { offsets: HashMap<PaneKind, f64> },
    SeekTo { ratio: f64 },
    PlayPause { playing: bool },
    Error { kind: &'static str, message: String },
}
