use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Viewer tunables, read once at startup.
///
/// Quality preference and the secondary-layer toggle are deliberately absent:
/// they live only as long as the document is open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    pub resize_debounce_ms: u64,
    /// Sample rate the renderer analyses at; bounds the spectrogram's max frequency.
    pub renderer_sample_rate_hz: u32,
    /// Timeline width to plan against before the pane has been measured.
    pub default_timeline_width_px: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: 100,
            renderer_sample_rate_hz: 44_100,
            default_timeline_width_px: 800.0,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read viewer config from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!(
                "Ignoring malformed viewer config {}: {err}; using defaults",
                path.display()
            );
            Self::default()
        }))
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}

/// `SONICSCOPE_DEBUG=1` (or `true`) turns on debug-level output.
pub fn debug_mode() -> bool {
    std::env::var("SONICSCOPE_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
