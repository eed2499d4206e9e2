use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::AudioSourceRef;

/// Messages the host posts to the view. Nothing flows back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum HostMessage {
    #[serde(rename_all = "camelCase")]
    LoadAudio {
        #[serde(alias = "uri")]
        locator: String,
        #[serde(alias = "fileSize", default)]
        size_bytes: u64,
    },
    ShowError {
        message: String,
    },
}

impl HostMessage {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).with_context(|| format!("invalid host message: {raw}"))
    }

    pub fn load(source: &AudioSourceRef) -> Self {
        HostMessage::LoadAudio {
            locator: source.locator.clone(),
            size_bytes: source.size_bytes,
        }
    }

    pub fn source(&self) -> Option<AudioSourceRef> {
        match self {
            HostMessage::LoadAudio {
                locator,
                size_bytes,
            } => Some(AudioSourceRef::new(locator.clone(), *size_bytes)),
            HostMessage::ShowError { .. } => None,
        }
    }
}
