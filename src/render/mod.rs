pub mod viewport;

pub use viewport::ViewportDimensions;

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;
use crate::quality::QualityProfile;
use crate::session::Generation;
use crate::timeline::TimelineIntervalPlan;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum PaneKind {
    Timeline,
    Waveform,
    Secondary,
}

/// Panes that draw a playback cursor overlay.
const CURSOR_PANES: [PaneKind; 2] = [PaneKind::Waveform, PaneKind::Secondary];

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePane {
    pub height_px: u32,
    pub width_px: Option<f64>,
    pub plan: Option<TimelineIntervalPlan>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaveformPane {
    pub height_px: u32,
    pub width_px: Option<f64>,
    pub bar_width_px: u32,
    pub bar_gap_px: u32,
    pub bar_radius_px: u32,
    pub normalize: bool,
    pub sample_rate_hz: u32,
    pub pixels_per_second: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryPane {
    pub height_px: u32,
    pub width_px: Option<f64>,
    pub frequency_resolution: u32,
    pub frequency_min_hz: u32,
    pub frequency_max_hz: u32,
    pub colormap: &'static str,
}

/// One pane of the composite view. The rendering layer owns the pixels; this
/// is the configuration it draws from.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "pane", rename_all = "camelCase")]
pub enum Renderer {
    Timeline(TimelinePane),
    Waveform(WaveformPane),
    Secondary(SecondaryPane),
}

impl Renderer {
    pub fn construct(
        kind: PaneKind,
        profile: &QualityProfile,
        sample_rate_hz: u32,
    ) -> Result<Self, ViewerError> {
        let renderer = match kind {
            PaneKind::Timeline => Renderer::Timeline(TimelinePane {
                height_px: 40,
                width_px: None,
                plan: None,
            }),
            PaneKind::Waveform => {
                if profile.bar_width_px == 0 {
                    return Err(ViewerError::Initialization(
                        "waveform bar width must be at least one pixel".into(),
                    ));
                }
                Renderer::Waveform(WaveformPane {
                    height_px: 180,
                    width_px: None,
                    bar_width_px: profile.bar_width_px,
                    bar_gap_px: 1,
                    bar_radius_px: 1,
                    normalize: true,
                    sample_rate_hz,
                    pixels_per_second: None,
                })
            }
            PaneKind::Secondary => {
                if !profile.frequency_resolution.is_power_of_two() {
                    return Err(ViewerError::Initialization(format!(
                        "frequency resolution {} is not a power of two",
                        profile.frequency_resolution
                    )));
                }
                let nyquist_hz = sample_rate_hz / 2;
                if profile.max_frequency_hz > nyquist_hz {
                    return Err(ViewerError::Initialization(format!(
                        "max frequency {} Hz exceeds the {} Hz limit of a {} Hz renderer",
                        profile.max_frequency_hz, nyquist_hz, sample_rate_hz
                    )));
                }
                Renderer::Secondary(SecondaryPane {
                    height_px: 280,
                    width_px: None,
                    frequency_resolution: profile.frequency_resolution,
                    frequency_min_hz: 0,
                    frequency_max_hz: profile.max_frequency_hz,
                    colormap: "viridis",
                })
            }
        };
        Ok(renderer)
    }

    pub fn kind(&self) -> PaneKind {
        match self {
            Renderer::Timeline(_) => PaneKind::Timeline,
            Renderer::Waveform(_) => PaneKind::Waveform,
            Renderer::Secondary(_) => PaneKind::Secondary,
        }
    }

    pub fn resize(&mut self, width: f64) {
        let slot = match self {
            Renderer::Timeline(pane) => &mut pane.width_px,
            Renderer::Waveform(pane) => &mut pane.width_px,
            Renderer::Secondary(pane) => &mut pane.width_px,
        };
        *slot = Some(width);
    }

    pub fn width_px(&self) -> Option<f64> {
        match self {
            Renderer::Timeline(pane) => pane.width_px,
            Renderer::Waveform(pane) => pane.width_px,
            Renderer::Secondary(pane) => pane.width_px,
        }
    }

    /// Consume the pane. Returns what was destroyed.
    pub fn destroy(self) -> PaneKind {
        self.kind()
    }
}

/// The set of panes built for one generation.
#[derive(Debug)]
pub struct RenderSession {
    generation: Generation,
    panes: Vec<Renderer>,
}

impl RenderSession {
    /// Build every pane for the profile, or none of them.
    pub fn construct(
        generation: Generation,
        profile: &QualityProfile,
        secondary_layer: bool,
        sample_rate_hz: u32,
    ) -> Result<Self, ViewerError> {
        if sample_rate_hz == 0 {
            return Err(ViewerError::Initialization(
                "renderer sample rate must be positive".into(),
            ));
        }

        let mut kinds = vec![PaneKind::Timeline, PaneKind::Waveform];
        if secondary_layer {
            kinds.push(PaneKind::Secondary);
        }

        let panes = kinds
            .into_iter()
            .map(|kind| Renderer::construct(kind, profile, sample_rate_hz))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { generation, panes })
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn panes(&self) -> &[Renderer] {
        &self.panes
    }

    pub fn pane(&self, kind: PaneKind) -> Option<&Renderer> {
        self.panes.iter().find(|pane| pane.kind() == kind)
    }

    pub fn has_pane(&self, kind: PaneKind) -> bool {
        self.pane(kind).is_some()
    }

    pub fn cursor_panes(&self) -> Vec<PaneKind> {
        CURSOR_PANES
            .into_iter()
            .filter(|kind| self.has_pane(*kind))
            .collect()
    }

    /// Push measured widths into the panes that exist.
    pub fn resize(&mut self, viewport: &ViewportDimensions) {
        for pane in &mut self.panes {
            if let Some(width) = viewport.width(pane.kind()) {
                pane.resize(width);
            }
        }
    }

    pub fn apply_zoom(&mut self, pixels_per_second: f64) {
        for pane in &mut self.panes {
            if let Renderer::Waveform(waveform) = pane {
                waveform.pixels_per_second = Some(pixels_per_second);
            }
        }
    }

    pub fn apply_timeline(&mut self, plan: TimelineIntervalPlan) {
        for pane in &mut self.panes {
            if let Renderer::Timeline(timeline) = pane {
                timeline.plan = Some(plan);
            }
        }
    }

    /// Tear down in reverse construction order.
    pub fn destroy(self) -> Vec<PaneKind> {
        self.panes.into_iter().rev().map(Renderer::destroy).collect()
    }
}
