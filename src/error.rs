use thiserror::Error;

/// Failures surfaced to the user in place of the visualization.
///
/// All of these are handled at the session controller boundary and turned
/// into a status string; none reach the host as a fault.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    /// The host could not produce a source reference (stat/read failure upstream).
    #[error("{0}")]
    SourceUnavailable(String),

    /// The decode engine rejected the source.
    #[error("Error: {0}")]
    Decode(String),

    /// The rendering scaffolding could not be built for the selected profile.
    #[error("Error initializing audio visualizer: {0}")]
    Initialization(String),
}

impl ViewerError {
    /// Status line shown where the visualization would be.
    pub fn status_message(&self) -> String {
        self.to_string()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ViewerError::SourceUnavailable(_) => "sourceUnavailable",
            ViewerError::Decode(_) => "decode",
            ViewerError::Initialization(_) => "initialization",
        }
    }
}
