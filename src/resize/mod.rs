use std::time::Duration;

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle, time};

use crate::session::{ControllerEvent, Generation};

/// Trailing-edge debounce for viewport width changes.
///
/// At most one fire is pending. A new observation aborts the pending timer and
/// starts the window again; each fire carries a sequence number and only the
/// latest one is accepted by [`ResizeReactor::settle`].
pub struct ResizeReactor {
    window: Duration,
    events: UnboundedSender<ControllerEvent>,
    pending: Option<JoinHandle<()>>,
    sequence: u64,
}

impl ResizeReactor {
    pub(crate) fn new(window: Duration, events: UnboundedSender<ControllerEvent>) -> Self {
        Self {
            window,
            events,
            pending: None,
            sequence: 0,
        }
    }

    pub fn observe(&mut self, generation: Generation, width_px: f64) {
        self.cancel();
        self.sequence = self.sequence.wrapping_add(1);

        let sequence = self.sequence;
        let window = self.window;
        let events = self.events.clone();
        self.pending = Some(tokio::spawn(async move {
            time::sleep(window).await;
            let _ = events.send(ControllerEvent::ResizeSettled {
                generation,
                sequence,
                width_px,
            });
        }));
    }

    /// Accept a fire. False when a newer observation superseded it.
    pub fn settle(&mut self, sequence: u64) -> bool {
        if sequence != self.sequence {
            return false;
        }
        self.pending = None;
        true
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Drop any pending fire. Fires already queued are rejected by `settle`.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.sequence = self.sequence.wrapping_add(1);
    }
}

impl Drop for ResizeReactor {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

/// Zoom factor that makes the whole source fit `width_px`.
pub fn pixels_per_second(width_px: f64, duration_seconds: f64) -> Option<f64> {
    if duration_seconds > 0.0 && width_px > 0.0 && width_px.is_finite() {
        Some(width_px / duration_seconds)
    } else {
        None
    }
}
