use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot};

use crate::protocol::HostMessage;
use crate::quality::QualityPreference;
use crate::render::{PaneKind, ViewportDimensions};

use super::{Generation, SessionSnapshot};

/// Inputs from the host and the view.
#[derive(Debug)]
pub enum ViewerCommand {
    Host(HostMessage),
    SetQuality(QualityPreference),
    SetSecondaryLayer(bool),
    Resize(ViewportDimensions),
    Seek(f64),
    Click { pane: PaneKind, x_px: f64 },
    /// Play/pause control (spacebar in the view).
    TogglePlayback,
    /// Playhead position reported by the player, tagged with the generation it plays.
    PlaybackPosition { generation: Generation, seconds: f64 },
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Close,
}

/// Cloneable sender side of one document's controller.
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    tx: mpsc::UnboundedSender<ViewerCommand>,
}

impl ViewerHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ViewerCommand>) -> Self {
        Self { tx }
    }

    pub fn send(&self, command: ViewerCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| anyhow!("viewer controller has shut down"))
    }

    pub fn host_message(&self, message: HostMessage) -> Result<()> {
        self.send(ViewerCommand::Host(message))
    }

    /// Parse a raw JSON message from the host and forward it.
    pub fn host_json(&self, raw: &str) -> Result<()> {
        self.host_message(HostMessage::from_json(raw)?)
    }

    pub fn set_quality(&self, preference: QualityPreference) -> Result<()> {
        self.send(ViewerCommand::SetQuality(preference))
    }

    pub fn set_secondary_layer(&self, enabled: bool) -> Result<()> {
        self.send(ViewerCommand::SetSecondaryLayer(enabled))
    }

    pub fn resize(&self, dimensions: ViewportDimensions) -> Result<()> {
        self.send(ViewerCommand::Resize(dimensions))
    }

    pub fn seek(&self, ratio: f64) -> Result<()> {
        self.send(ViewerCommand::Seek(ratio))
    }

    pub fn click(&self, pane: PaneKind, x_px: f64) -> Result<()> {
        self.send(ViewerCommand::Click { pane, x_px })
    }

    pub fn toggle_playback(&self) -> Result<()> {
        self.send(ViewerCommand::TogglePlayback)
    }

    pub fn playback_position(&self, generation: Generation, seconds: f64) -> Result<()> {
        self.send(ViewerCommand::PlaybackPosition {
            generation,
            seconds,
        })
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(ViewerCommand::Snapshot(tx))?;
        rx.await
            .map_err(|_| anyhow!("viewer controller dropped the snapshot request"))
    }

    pub fn close(&self) -> Result<()> {
        self.send(ViewerCommand::Close)
    }
}
