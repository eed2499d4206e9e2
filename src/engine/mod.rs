use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;

use crate::session::{ControllerEvent, Generation};

/// Samples as the decode engine hands them back: one f32 vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate_hz: u32,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    pub fn new(sample_rate_hz: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate_hz,
            channels,
        }
    }

    pub fn mono(sample_rate_hz: u32, samples: Vec<f32>) -> Self {
        Self::new(sample_rate_hz, vec![samples])
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate_hz)
    }

    /// Loudness is measured on the first channel only.
    pub fn first_channel(&self) -> &[f32] {
        self.channels.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// What the engine reports while a load is in flight.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    FetchProgress(f64),
    DecodeProgress(f64),
    Decoded(Arc<DecodedAudio>),
    Failed(String),
}

/// Handed to the engine for one load. Every report carries the generation it was
/// issued for, so reports that outlive a reload are dropped by the controller.
#[derive(Debug, Clone)]
pub struct LoadReporter {
    generation: Generation,
    events: UnboundedSender<ControllerEvent>,
}

impl LoadReporter {
    pub(crate) fn new(generation: Generation, events: UnboundedSender<ControllerEvent>) -> Self {
        Self { generation, events }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Fetch progress, 0-100.
    pub fn fetch_progress(&self, percent: f64) {
        self.send(EngineEvent::FetchProgress(percent));
    }

    /// Decode progress, 0-100.
    pub fn decode_progress(&self, percent: f64) {
        self.send(EngineEvent::DecodeProgress(percent));
    }

    fn send(&self, event: EngineEvent) {
        // The controller may already be gone; nothing to report to then.
        let _ = self.events.send(ControllerEvent::Engine {
            generation: self.generation,
            event,
        });
    }
}

/// The external fetch + decode engine.
pub trait DecodeEngine: Send + Sync + 'static {
    fn load(
        &self,
        locator: String,
        reporter: LoadReporter,
    ) -> impl Future<Output = Result<DecodedAudio>> + Send;
}
