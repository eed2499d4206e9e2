use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::DecodedAudio;
use crate::models::AudioSourceRef;
use crate::quality::{QualityPreference, QualityProfile};
use crate::stats::DecodedAudioSummary;
use crate::timeline::TimelineIntervalPlan;

/// Identifies one load attempt. Strictly increasing per controller.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Generation(u64);

impl Generation {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Loading,
    Decoding,
    Ready,
    Reloading,
    Error,
}

impl LifecycleState {
    /// States in which engine callbacks are still expected.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, LifecycleState::Loading | LifecycleState::Decoding)
    }
}

/// The single progress bar plus its status line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressIndicator {
    pub percent: f64,
    pub status: String,
}

impl ProgressIndicator {
    /// Move forward; the bar never goes backwards within one generation.
    pub fn advance(&mut self, percent: f64, status: impl Into<String>) {
        let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        self.percent = self.percent.max(percent);
        self.status = status.into();
    }
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub lifecycle: LifecycleState,
    pub generation: Generation,
    pub source: Option<AudioSourceRef>,
    pub profile: Option<QualityProfile>,
    pub summary: Option<DecodedAudioSummary>,
    pub timeline: Option<TimelineIntervalPlan>,
    pub playback_ratio: f64,
    pub playing: bool,
    pub progress: ProgressIndicator,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    /// Decoded samples for the current generation; released on teardown.
    #[serde(skip)]
    pub decoded: Option<Arc<DecodedAudio>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole state for a new generation.
    pub fn begin(
        &mut self,
        generation: Generation,
        source: AudioSourceRef,
        profile: QualityProfile,
        started_at: DateTime<Utc>,
    ) {
        *self = Self {
            lifecycle: LifecycleState::Loading,
            generation,
            source: Some(source),
            profile: Some(profile),
            started_at: Some(started_at),
            ..Self::default()
        };
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    pub fn enter_decoding(&mut self) -> bool {
        if self.lifecycle == LifecycleState::Loading {
            self.lifecycle = LifecycleState::Decoding;
            return true;
        }
        false
    }

    pub fn begin_reload(&mut self) {
        self.lifecycle = LifecycleState::Reloading;
    }

    pub fn attach_decoded(&mut self, audio: Arc<DecodedAudio>) {
        self.decoded = Some(audio);
    }

    pub fn finish(
        &mut self,
        summary: DecodedAudioSummary,
        plan: TimelineIntervalPlan,
        at: DateTime<Utc>,
    ) {
        self.summary = Some(summary);
        self.timeline = Some(plan);
        self.lifecycle = LifecycleState::Ready;
        self.ready_at = Some(at);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.lifecycle = LifecycleState::Error;
        self.error = Some(message.into());
        self.playing = false;
        self.decoded = None;
    }

    pub fn release_decoded(&mut self) {
        self.decoded = None;
    }

    pub fn duration_seconds(&self) -> f64 {
        self.decoded
            .as_ref()
            .map(|audio| audio.duration_seconds())
            .or_else(|| self.summary.as_ref().and_then(|summary| summary.duration_seconds))
            .unwrap_or(0.0)
    }

    pub fn size_bytes(&self) -> u64 {
        self.source.as_ref().map(|source| source.size_bytes).unwrap_or(0)
    }

    /// Time from load instruction to READY, once known.
    pub fn load_time_ms(&self) -> Option<i64> {
        match (self.started_at, self.ready_at) {
            (Some(start), Some(ready)) => Some((ready - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// What the view (and tests) can observe about a controller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub preference: QualityPreference,
    pub secondary_layer: bool,
}
