pub mod format;

pub use format::{format_file_size, InfoBar};

use serde::{Deserialize, Serialize};

/// Upper bound on how many samples feed the RMS estimate before striding kicks in.
pub const MAX_EXAMINED_SAMPLES: usize = 100_000;

/// The decode engine hands back 32-bit float samples whatever the source encoding was.
/// This describes that buffer, not the file on disk.
pub const DECODED_FORMAT_LABEL: &str = "32-bit float";

/// Loudness of the examined samples.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum RmsLevel {
    DbFs(f64),
    /// RMS was exactly zero, so there is no finite dB value.
    Silence,
}

/// Summary shown in the info bar. `None` fields are "unavailable".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DecodedAudioSummary {
    pub sample_rate_hz: Option<u32>,
    pub duration_seconds: Option<f64>,
    pub rms: Option<RmsLevel>,
    pub format_label: Option<String>,
}

impl DecodedAudioSummary {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.rms.is_some()
    }
}

/// Compute the loudness/format summary for one channel of decoded samples.
///
/// Every k-th sample is examined, k = max(1, floor(len / 100000)), which keeps the
/// cost flat for long files.
pub fn compute(samples: &[f32], sample_rate_hz: u32, duration_seconds: f64) -> DecodedAudioSummary {
    if samples.is_empty() {
        return DecodedAudioSummary::unavailable();
    }

    let stride = sample_stride(samples.len());
    let mut sum_squares = 0.0f64;
    let mut examined = 0usize;
    for &sample in samples.iter().step_by(stride) {
        let value = f64::from(sample);
        sum_squares += value * value;
        examined += 1;
    }

    let rms = (sum_squares / examined as f64).sqrt();
    let level = if rms > 0.0 {
        RmsLevel::DbFs(20.0 * rms.log10())
    } else {
        RmsLevel::Silence
    };

    DecodedAudioSummary {
        sample_rate_hz: Some(sample_rate_hz),
        duration_seconds: Some(duration_seconds),
        rms: Some(level),
        format_label: Some(DECODED_FORMAT_LABEL.to_string()),
    }
}

pub fn sample_stride(sample_count: usize) -> usize {
    (sample_count / MAX_EXAMINED_SAMPLES).max(1)
}
