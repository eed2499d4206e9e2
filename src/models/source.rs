use serde::{Deserialize, Serialize};

/// Where the audio comes from and how big it is. Replaced wholesale on reload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AudioSourceRef {
    pub locator: String,
    pub size_bytes: u64,
}

impl AudioSourceRef {
    pub fn new(locator: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            locator: locator.into(),
            size_bytes,
        }
    }
}
