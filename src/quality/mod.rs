use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

/// Sources below this size get the HIGH profile under `Auto`.
pub const HIGH_QUALITY_MAX_BYTES: u64 = 5 * MIB;
/// Sources below this size (and at least `HIGH_QUALITY_MAX_BYTES`) get MEDIUM.
pub const MEDIUM_QUALITY_MAX_BYTES: u64 = 20 * MIB;

/// The quality choice exposed by the view's selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreference {
    #[default]
    Auto,
    Low,
    Medium,
    High,
}

impl QualityPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreference::Auto => "auto",
            QualityPreference::Low => "low",
            QualityPreference::Medium => "medium",
            QualityPreference::High => "high",
        }
    }
}

impl std::str::FromStr for QualityPreference {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(QualityPreference::Auto),
            "low" => Ok(QualityPreference::Low),
            "medium" => Ok(QualityPreference::Medium),
            "high" => Ok(QualityPreference::High),
            other => Err(anyhow::anyhow!("unknown quality preference '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityLabel {
    Low,
    Medium,
    High,
}

/// Rendering parameters for one session. Replaced, never mutated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualityProfile {
    /// Samples per spectral analysis window.
    pub frequency_resolution: u32,
    pub max_frequency_hz: u32,
    pub bar_width_px: u32,
    pub label: QualityLabel,
}

impl QualityProfile {
    pub const LOW: QualityProfile = QualityProfile {
        frequency_resolution: 512,
        max_frequency_hz: 4000,
        bar_width_px: 3,
        label: QualityLabel::Low,
    };

    pub const MEDIUM: QualityProfile = QualityProfile {
        frequency_resolution: 1024,
        max_frequency_hz: 6000,
        bar_width_px: 2,
        label: QualityLabel::Medium,
    };

    pub const HIGH: QualityProfile = QualityProfile {
        frequency_resolution: 2048,
        max_frequency_hz: 8000,
        bar_width_px: 2,
        label: QualityLabel::High,
    };

    pub fn for_label(label: QualityLabel) -> Self {
        match label {
            QualityLabel::Low => Self::LOW,
            QualityLabel::Medium => Self::MEDIUM,
            QualityLabel::High => Self::HIGH,
        }
    }
}

/// Pick the profile for a preference and source size.
pub fn select(preference: QualityPreference, size_bytes: u64) -> QualityProfile {
    match preference {
        QualityPreference::Auto => QualityProfile::for_label(auto_label(size_bytes)),
        QualityPreference::Low => QualityProfile::LOW,
        QualityPreference::Medium => QualityProfile::MEDIUM,
        QualityPreference::High => QualityProfile::HIGH,
    }
}

fn auto_label(size_bytes: u64) -> QualityLabel {
    if size_bytes < HIGH_QUALITY_MAX_BYTES {
        QualityLabel::High
    } else if size_bytes < MEDIUM_QUALITY_MAX_BYTES {
        QualityLabel::Medium
    } else {
        QualityLabel::Low
    }
}
