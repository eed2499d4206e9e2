use serde::Serialize;

use super::{DecodedAudioSummary, RmsLevel};

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
const PLACEHOLDER: &str = "--";

/// Human-readable size, e.g. `3.4 MB`. Stops at GB.
pub fn format_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, SIZE_UNITS[unit])
}

/// The text of the view's info bar.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfoBar {
    pub rms: String,
    pub sample_rate: String,
    pub sample_format: String,
    pub duration: String,
    pub size: String,
}

impl InfoBar {
    /// Shown as soon as a load instruction arrives; only the size is known.
    pub fn placeholder(size_bytes: u64) -> Self {
        Self::from_summary(&DecodedAudioSummary::unavailable(), size_bytes)
    }

    pub fn from_summary(summary: &DecodedAudioSummary, size_bytes: u64) -> Self {
        let rms = match summary.rms {
            Some(RmsLevel::DbFs(db)) => format!("{db:.1} dB FS"),
            Some(RmsLevel::Silence) => "-∞ dB FS".to_string(),
            None => PLACEHOLDER.to_string(),
        };
        let sample_rate = summary
            .sample_rate_hz
            .map(|rate| format!("{rate} Hz"))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let duration = summary
            .duration_seconds
            .map(|secs| format!("{secs:.2} s"))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let sample_format = summary
            .format_label
            .clone()
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        Self {
            rms: format!("RMS: {rms}"),
            sample_rate: format!("Sample Rate: {sample_rate}"),
            sample_format: format!("Sample Format: {sample_format}"),
            duration: format!("Duration: {duration}"),
            size: format!("Size: {}", format_file_size(size_bytes)),
        }
    }
}
