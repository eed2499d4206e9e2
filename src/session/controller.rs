use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    cursor,
    engine::{DecodeEngine, DecodedAudio, EngineEvent, LoadReporter},
    error::ViewerError,
    models::AudioSourceRef,
    protocol::HostMessage,
    quality::{self, QualityPreference},
    render::{PaneKind, RenderSession, ViewportDimensions},
    resize::{self, ResizeReactor},
    settings::ViewerConfig,
    stats::{self, DecodedAudioSummary, InfoBar},
    timeline,
};

use super::{
    ControllerEvent, Generation, LifecycleState, SessionSnapshot, SessionState, ViewEvent,
    ViewerCommand, ViewerHandle,
};

// Set to false to silence lifecycle logging from this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

const FETCH_BAND: (f64, f64) = (20.0, 30.0);
const DECODE_BAND: (f64, f64) = (50.0, 30.0);

/// Owns one document's session and runs its lifecycle.
///
/// Everything is processed on a single task, one event at a time: host and view
/// commands arrive on the command channel, results of spawned work (engine
/// callbacks, statistics, debounced resizes) come back on the internal channel
/// tagged with the generation that started them.
pub struct SessionController<E: DecodeEngine> {
    engine: Arc<E>,
    config: ViewerConfig,
    state: SessionState,
    last_generation: Generation,
    preference: QualityPreference,
    secondary_layer: bool,
    viewport: ViewportDimensions,
    render: Option<RenderSession>,
    load_token: Option<CancellationToken>,
    reactor: ResizeReactor,
    pending_restore: Option<f64>,
    internal_tx: mpsc::UnboundedSender<ControllerEvent>,
    internal_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    commands: mpsc::UnboundedReceiver<ViewerCommand>,
    view: mpsc::UnboundedSender<ViewEvent>,
}

impl<E: DecodeEngine> SessionController<E> {
    pub fn new(
        engine: Arc<E>,
        config: ViewerConfig,
    ) -> (Self, ViewerHandle, mpsc::UnboundedReceiver<ViewEvent>) {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (view, view_rx) = mpsc::unbounded_channel();

        let controller = Self {
            engine,
            reactor: ResizeReactor::new(config.resize_debounce(), internal_tx.clone()),
            config,
            state: SessionState::new(),
            last_generation: Generation::default(),
            preference: QualityPreference::Auto,
            secondary_layer: true,
            viewport: ViewportDimensions::new(),
            render: None,
            load_token: None,
            pending_restore: None,
            internal_tx,
            internal_rx,
            commands,
            view,
        };

        (controller, ViewerHandle::new(command_tx), view_rx)
    }

    /// Process events until `Close` arrives or every handle is dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                Some(event) = self.internal_rx.recv() => self.handle_event(event),
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        self.teardown();
        log_info!("viewer controller stopped at {}", self.state.generation);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            preference: self.preference,
            secondary_layer: self.secondary_layer,
        }
    }

    fn handle_command(&mut self, command: ViewerCommand) -> bool {
        match command {
            ViewerCommand::Host(message) => self.on_host_message(message),
            ViewerCommand::SetQuality(preference) => {
                self.preference = preference;
                self.reload_if_ready("quality preference changed");
            }
            ViewerCommand::SetSecondaryLayer(enabled) => {
                self.secondary_layer = enabled;
                self.reload_if_ready("secondary layer toggled");
            }
            ViewerCommand::Resize(dimensions) => self.on_resize(dimensions),
            ViewerCommand::Seek(ratio) => self.on_seek(ratio),
            ViewerCommand::Click { pane, x_px } => {
                let width = self.viewport.width(pane).unwrap_or(0.0);
                self.on_seek(cursor::ratio_from_click(x_px, width));
            }
            ViewerCommand::TogglePlayback => self.on_toggle_playback(),
            ViewerCommand::PlaybackPosition {
                generation,
                seconds,
            } => self.on_playback_position(generation, seconds),
            ViewerCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            ViewerCommand::Close => return false,
        }
        true
    }

    fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Engine { generation, event } => {
                self.on_engine_event(generation, event)
            }
            ControllerEvent::StatsComputed {
                generation,
                summary,
            } => self.on_stats_computed(generation, summary),
            ControllerEvent::ResizeSettled {
                generation,
                sequence,
                width_px,
            } => self.on_resize_settled(generation, sequence, width_px),
        }
    }

    fn on_host_message(&mut self, message: HostMessage) {
        match message {
            HostMessage::LoadAudio {
                locator,
                size_bytes,
            } => self.start_generation(AudioSourceRef::new(locator, size_bytes), None),
            HostMessage::ShowError { message } => {
                self.fail(ViewerError::SourceUnavailable(message))
            }
        }
    }

    /// Tear down whatever is live, then build and start loading a fresh generation.
    fn start_generation(&mut self, source: AudioSourceRef, restore_ratio: Option<f64>) {
        self.teardown();

        let generation = self.last_generation.next();
        self.last_generation = generation;
        let profile = quality::select(self.preference, source.size_bytes);
        log_info!(
            "{}: loading {} ({} bytes) with {:?} profile",
            generation,
            source.locator,
            source.size_bytes,
            profile.label
        );

        self.state
            .begin(generation, source.clone(), profile, Utc::now());
        self.pending_restore = restore_ratio;
        self.emit(ViewEvent::InfoUpdated {
            info: InfoBar::placeholder(source.size_bytes),
        });
        self.advance_progress(10.0, "Initializing visualizer...");

        let mut session = match RenderSession::construct(
            generation,
            &profile,
            self.secondary_layer,
            self.config.renderer_sample_rate_hz,
        ) {
            Ok(session) => session,
            Err(err) => {
                self.fail(err);
                return;
            }
        };
        session.resize(&self.viewport);
        for renderer in session.panes() {
            self.emit(ViewEvent::PaneConstructed {
                generation,
                renderer: renderer.clone(),
            });
        }
        self.render = Some(session);
        self.emit_state_changed();

        self.spawn_load(generation, source.locator);
    }

    fn spawn_load(&mut self, generation: Generation, locator: String) {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let reporter = LoadReporter::new(generation, self.internal_tx.clone());
        let engine = Arc::clone(&self.engine);
        let events = self.internal_tx.clone();

        self.advance_progress(FETCH_BAND.0, "Loading audio file...");

        tokio::spawn(async move {
            tokio::select! {
                result = engine.load(locator, reporter) => {
                    let event = match result {
                        Ok(audio) => EngineEvent::Decoded(Arc::new(audio)),
                        Err(err) => EngineEvent::Failed(format!("{err:#}")),
                    };
                    let _ = events.send(ControllerEvent::Engine { generation, event });
                }
                _ = task_token.cancelled() => {
                    log_debug!("{}: load superseded", generation);
                }
            }
        });

        self.load_token = Some(token);
    }

    /// Engine callbacks count only for the live generation while it is still loading.
    fn accepts(&self, generation: Generation) -> bool {
        self.state.is_current(generation) && self.state.lifecycle.is_in_flight()
    }

    fn on_engine_event(&mut self, generation: Generation, event: EngineEvent) {
        if !self.accepts(generation) {
            log_debug!(
                "discarding engine callback from {} (current {}, {:?})",
                generation,
                self.state.generation,
                self.state.lifecycle
            );
            return;
        }

        match event {
            EngineEvent::FetchProgress(percent) => {
                let percent = clamp_percent(percent);
                self.advance_progress(
                    FETCH_BAND.0 + percent * FETCH_BAND.1 / 100.0,
                    format!("Loading... {}%", percent.round()),
                );
            }
            EngineEvent::DecodeProgress(percent) => {
                if self.state.enter_decoding() {
                    self.emit_state_changed();
                }
                let percent = clamp_percent(percent);
                self.advance_progress(
                    DECODE_BAND.0 + percent * DECODE_BAND.1 / 100.0,
                    format!("Decoding... {}%", percent.round()),
                );
            }
            EngineEvent::Decoded(audio) => self.on_decoded(generation, audio),
            EngineEvent::Failed(message) => self.fail(ViewerError::Decode(message)),
        }
    }

    fn on_decoded(&mut self, generation: Generation, audio: Arc<DecodedAudio>) {
        if self.state.enter_decoding() {
            self.emit_state_changed();
        }
        log_debug!(
            "{}: decoded {} frames x {} channels at {} Hz",
            generation,
            audio.frames(),
            audio.channels.len(),
            audio.sample_rate_hz
        );
        self.state.attach_decoded(Arc::clone(&audio));

        // Emitted before the statistics pass starts.
        self.advance_progress(90.0, "Computing audio info...");

        // Skipped when the generation is torn down before the worker starts; a pass
        // already running holds the buffer for at most MAX_EXAMINED_SAMPLES reads.
        let token = self.load_token.clone().unwrap_or_default();
        let events = self.internal_tx.clone();
        tokio::task::spawn_blocking(move || {
            if token.is_cancelled() {
                return;
            }
            let summary = stats::compute(
                audio.first_channel(),
                audio.sample_rate_hz,
                audio.duration_seconds(),
            );
            let _ = events.send(ControllerEvent::StatsComputed {
                generation,
                summary,
            });
        });
    }

    fn on_stats_computed(&mut self, generation: Generation, summary: DecodedAudioSummary) {
        if !self.accepts(generation) || self.state.decoded.is_none() {
            log_debug!("discarding statistics from {}", generation);
            return;
        }

        self.emit(ViewEvent::InfoUpdated {
            info: InfoBar::from_summary(&summary, self.state.size_bytes()),
        });
        self.advance_progress(95.0, "Finalizing setup...");

        let duration = self.state.duration_seconds();
        let timeline_width = self
            .viewport
            .width(PaneKind::Timeline)
            .unwrap_or(self.config.default_timeline_width_px);
        let plan = timeline::plan(duration, timeline_width);
        if let Some(render) = self.render.as_mut() {
            render.apply_timeline(plan);
        }
        self.emit(ViewEvent::TimelineApplied { plan });

        self.advance_progress(100.0, "Done!");
        self.state.finish(summary, plan, Utc::now());
        log_info!(
            "{}: ready in {}ms ({:.2}s, tick {}s)",
            generation,
            self.state.load_time_ms().unwrap_or_default(),
            duration,
            plan.tick_interval_seconds
        );
        self.emit_state_changed();

        if let Some(width) = self.viewport.width(PaneKind::Waveform) {
            self.apply_zoom(width);
        }
        self.sync_cursors(0.0);
        if let Some(ratio) = self.pending_restore.take() {
            self.seek_to(ratio);
        }
    }

    fn reload_if_ready(&mut self, reason: &str) {
        if self.state.lifecycle != LifecycleState::Ready {
            log_debug!("{reason} while {:?}; applies to the next load", self.state.lifecycle);
            return;
        }
        let Some(source) = self.state.source.clone() else {
            return;
        };

        let ratio = self.state.playback_ratio;
        log_info!(
            "{}: {reason}, reloading at ratio {:.3}",
            self.state.generation,
            ratio
        );
        self.state.begin_reload();
        self.emit_state_changed();
        self.start_generation(source, Some(ratio));
    }

    fn on_resize(&mut self, dimensions: ViewportDimensions) {
        self.viewport.merge(&dimensions);
        if let Some(width) = dimensions.width(PaneKind::Waveform) {
            self.reactor.observe(self.state.generation, width);
        }
    }

    fn on_resize_settled(&mut self, generation: Generation, sequence: u64, width_px: f64) {
        if !self.reactor.settle(sequence) {
            return;
        }
        if !self.state.is_current(generation) || self.state.lifecycle != LifecycleState::Ready {
            return;
        }

        if let Some(render) = self.render.as_mut() {
            render.resize(&self.viewport);
        }
        let resized: Vec<(PaneKind, f64)> = self
            .render
            .iter()
            .flat_map(|render| render.panes())
            .filter_map(|pane| pane.width_px().map(|width| (pane.kind(), width)))
            .collect();
        for (pane, width_px) in resized {
            self.emit(ViewEvent::PaneResized { pane, width_px });
        }

        self.apply_zoom(width_px);
        self.sync_cursors(self.state.playback_ratio);
    }

    fn apply_zoom(&mut self, width_px: f64) {
        let Some(pixels_per_second) =
            resize::pixels_per_second(width_px, self.state.duration_seconds())
        else {
            return;
        };
        if let Some(render) = self.render.as_mut() {
            render.apply_zoom(pixels_per_second);
        }
        self.emit(ViewEvent::Zoom { pixels_per_second });
    }

    fn on_seek(&mut self, ratio: f64) {
        if self.state.lifecycle != LifecycleState::Ready {
            log_debug!("ignoring seek while {:?}", self.state.lifecycle);
            return;
        }
        self.seek_to(ratio);
    }

    fn seek_to(&mut self, ratio: f64) {
        let ratio = cursor::clamp_ratio(ratio);
        self.state.playback_ratio = ratio;
        self.emit(ViewEvent::SeekTo { ratio });
        self.sync_cursors(ratio);
    }

    fn on_toggle_playback(&mut self) {
        if self.state.lifecycle != LifecycleState::Ready {
            log_debug!("ignoring play/pause while {:?}", self.state.lifecycle);
            return;
        }
        self.state.playing = !self.state.playing;
        self.emit(ViewEvent::PlayPause {
            playing: self.state.playing,
        });
    }

    fn on_playback_position(&mut self, generation: Generation, seconds: f64) {
        if !self.state.is_current(generation) || self.state.lifecycle != LifecycleState::Ready {
            return;
        }
        let duration = self.state.duration_seconds();
        if duration <= 0.0 {
            return;
        }
        let ratio = cursor::clamp_ratio(seconds / duration);
        self.state.playback_ratio = ratio;
        self.sync_cursors(ratio);
    }

    fn sync_cursors(&self, ratio: f64) {
        let Some(render) = self.render.as_ref() else {
            return;
        };
        let widths = self.viewport.widths_for(&render.cursor_panes());
        self.emit(ViewEvent::Cursors {
            offsets: cursor::sync(ratio, &widths),
        });
    }

    fn fail(&mut self, err: ViewerError) {
        let message = err.status_message();
        log_error!(
            "{}: {} failure: {}",
            self.state.generation,
            err.kind(),
            message
        );
        self.teardown();
        self.pending_restore = None;
        self.state.fail(message.clone());
        self.emit(ViewEvent::Error {
            kind: err.kind(),
            message,
        });
        self.emit_state_changed();
    }

    /// Release the live generation: cancel its load, drop the pending resize,
    /// destroy its panes and let go of the decoded samples.
    fn teardown(&mut self) {
        if let Some(token) = self.load_token.take() {
            token.cancel();
        }
        self.reactor.cancel();
        if let Some(render) = self.render.take() {
            let generation = render.generation();
            for pane in render.destroy() {
                self.emit(ViewEvent::PaneDestroyed { generation, pane });
            }
        }
        self.state.release_decoded();
    }

    fn advance_progress(&mut self, percent: f64, status: impl Into<String>) {
        self.state.progress.advance(percent, status);
        self.emit(ViewEvent::Progress {
            percent: self.state.progress.percent,
            status: self.state.progress.status.clone(),
        });
    }

    fn emit_state_changed(&self) {
        self.emit(ViewEvent::StateChanged {
            snapshot: self.snapshot(),
        });
    }

    fn emit(&self, event: ViewEvent) {
        // The view may have gone away before the document closed.
        let _ = self.view.send(event);
    }
}

fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::time::Duration;

    use anyhow::anyhow;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;
    use tokio::time::{sleep, timeout};

    use crate::quality::QualityProfile;
    use crate::stats::RmsLevel;

    const WAIT: Duration = Duration::from_secs(5);

    struct PendingLoad {
        locator: String,
        reporter: LoadReporter,
        finish: oneshot::Sender<anyhow::Result<DecodedAudio>>,
    }

    /// Engine whose loads complete only when the test says so.
    struct ManualEngine {
        loads: mpsc::UnboundedSender<PendingLoad>,
    }

    impl DecodeEngine for ManualEngine {
        fn load(
            &self,
            locator: String,
            reporter: LoadReporter,
        ) -> impl Future<Output = anyhow::Result<DecodedAudio>> + Send {
            let (finish, done) = oneshot::channel();
            let _ = self.loads.send(PendingLoad {
                locator,
                reporter,
                finish,
            });
            async move {
                match done.await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow!("load abandoned")),
                }
            }
        }
    }

    struct Harness {
        handle: ViewerHandle,
        view: mpsc::UnboundedReceiver<ViewEvent>,
        loads: mpsc::UnboundedReceiver<PendingLoad>,
        task: JoinHandle<()>,
    }

    impl Harness {
        fn start(config: ViewerConfig) -> Self {
            let (loads_tx, loads) = mpsc::unbounded_channel();
            let engine = Arc::new(ManualEngine { loads: loads_tx });
            let (controller, handle, view) = SessionController::new(engine, config);
            let task = tokio::spawn(controller.run());
            Self {
                handle,
                view,
                loads,
                task,
            }
        }

        fn load(&self, locator: &str, size_bytes: u64) {
            self.handle
                .host_message(HostMessage::LoadAudio {
                    locator: locator.to_string(),
                    size_bytes,
                })
                .unwrap();
        }

        async fn next_load(&mut self) -> PendingLoad {
            timeout(WAIT, self.loads.recv())
                .await
                .expect("timed out waiting for the engine to be asked")
                .expect("engine channel closed")
        }

        /// Collect view events up to and including the first one `pick` accepts.
        async fn wait_for<T>(
            &mut self,
            mut pick: impl FnMut(&ViewEvent) -> Option<T>,
        ) -> (T, Vec<ViewEvent>) {
            let mut seen = Vec::new();
            loop {
                let event = timeout(WAIT, self.view.recv())
                    .await
                    .expect("timed out waiting for a view event")
                    .expect("view channel closed");
                let picked = pick(&event);
                seen.push(event);
                if let Some(value) = picked {
                    return (value, seen);
                }
            }
        }

        async fn wait_for_lifecycle(
            &mut self,
            lifecycle: LifecycleState,
        ) -> (SessionSnapshot, Vec<ViewEvent>) {
            self.wait_for(|event| match event {
                ViewEvent::StateChanged { snapshot } if snapshot.state.lifecycle == lifecycle => {
                    Some(snapshot.clone())
                }
                _ => None,
            })
            .await
        }

        fn drain(&mut self) -> Vec<ViewEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.view.try_recv() {
                events.push(event);
            }
            events
        }

        async fn drive_to_ready(&mut self, audio: DecodedAudio) -> SessionSnapshot {
            let load = self.next_load().await;
            load.reporter.fetch_progress(100.0);
            load.reporter.decode_progress(100.0);
            load.finish.send(Ok(audio)).unwrap();
            self.wait_for_lifecycle(LifecycleState::Ready).await.0
        }
    }

    fn tone(seconds: f64) -> DecodedAudio {
        let rate = 1000;
        let frames = (seconds * rate as f64) as usize;
        let samples = (0..frames)
            .map(|i| 0.5 * (i as f32 * 0.05).sin())
            .collect();
        DecodedAudio::mono(rate, samples)
    }

    fn all_panes(width: f64) -> ViewportDimensions {
        ViewportDimensions::new()
            .with(PaneKind::Timeline, width)
            .with(PaneKind::Waveform, width)
            .with(PaneKind::Secondary, width)
    }

    fn progress_values(events: &[ViewEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn load_runs_through_to_ready() {
        let mut h = Harness::start(ViewerConfig::default());
        h.handle.resize(all_panes(800.0)).unwrap();
        h.handle
            .host_json(r#"{"command":"loadAudio","uri":"file:///tone.wav","fileSize":1048576}"#)
            .unwrap();

        let load = h.next_load().await;
        assert_eq!(load.locator, "file:///tone.wav");
        assert_eq!(load.reporter.generation(), Generation::new(1));
        load.reporter.fetch_progress(50.0);
        load.reporter.decode_progress(100.0);
        load.finish.send(Ok(tone(125.0))).unwrap();

        let (snapshot, seen) = h.wait_for_lifecycle(LifecycleState::Ready).await;
        assert_eq!(snapshot.state.profile, Some(QualityProfile::HIGH));
        // The resolved tier shows in the profile; the stored preference stays Auto.
        assert_eq!(snapshot.preference, QualityPreference::Auto);
        let plan = snapshot.state.timeline.expect("timeline planned");
        assert_eq!(plan.tick_interval_seconds, 15.0);
        assert_eq!(plan.secondary_label_interval_seconds, 150.0);
        let summary = snapshot.state.summary.expect("summary computed");
        assert!(matches!(summary.rms, Some(RmsLevel::DbFs(db)) if db < 0.0));
        assert_eq!(summary.sample_rate_hz, Some(1000));

        let percents = progress_values(&seen);
        assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]), "{percents:?}");
        assert!(percents.contains(&35.0));
        assert!(percents.contains(&80.0));
        assert_eq!(percents.last(), Some(&100.0));
        assert!(seen.iter().any(|event| matches!(
            event,
            ViewEvent::StateChanged { snapshot } if snapshot.state.lifecycle == LifecycleState::Decoding
        )));

        let (zoom, _) = h
            .wait_for(|event| match event {
                ViewEvent::Zoom { pixels_per_second } => Some(*pixels_per_second),
                _ => None,
            })
            .await;
        assert!((zoom - 6.4).abs() < 1e-9);

        let (offsets, _) = h
            .wait_for(|event| match event {
                ViewEvent::Cursors { offsets } => Some(offsets.clone()),
                _ => None,
            })
            .await;
        assert_eq!(offsets.len(), 2);
        assert!(offsets.values().all(|offset| *offset == 0.0));
    }

    #[tokio::test]
    async fn stale_generation_callbacks_are_ignored() {
        let mut h = Harness::start(ViewerConfig::default());
        h.load("file:///first.wav", 1024);
        let first = h.next_load().await;
        h.load("file:///second.wav", 30 * 1024 * 1024);
        let second = h.next_load().await;

        first.reporter.decode_progress(90.0);
        first.reporter.fetch_progress(100.0);
        let _ = first.finish.send(Ok(tone(9.0)));

        let snapshot = h.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state.generation, Generation::new(2));
        assert_eq!(snapshot.state.lifecycle, LifecycleState::Loading);
        assert_eq!(snapshot.state.progress.percent, 20.0);
        assert_eq!(snapshot.state.profile, Some(QualityProfile::LOW));
        assert_eq!(
            snapshot.state.source.as_ref().map(|source| source.locator.as_str()),
            Some("file:///second.wav")
        );

        second.reporter.decode_progress(50.0);
        let snapshot = h.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state.lifecycle, LifecycleState::Decoding);
        assert_eq!(snapshot.state.progress.percent, 65.0);

        second.finish.send(Ok(tone(2.0))).unwrap();
        let (ready, seen) = h.wait_for_lifecycle(LifecycleState::Ready).await;
        assert_eq!(ready.state.generation, Generation::new(2));
        assert_eq!(ready.state.summary.unwrap().duration_seconds, Some(2.0));

        // 77% and 50% would only come from the superseded load.
        let percents = progress_values(&seen);
        assert!(!percents.contains(&77.0), "{percents:?}");
        assert!(!percents.contains(&50.0), "{percents:?}");
    }

    #[tokio::test]
    async fn statistics_from_a_superseded_generation_are_dropped() {
        let (loads_tx, _loads) = mpsc::unbounded_channel();
        let engine = Arc::new(ManualEngine { loads: loads_tx });
        let (mut controller, _handle, _view) =
            SessionController::new(engine, ViewerConfig::default());

        let first = Generation::new(1);
        controller.handle_command(ViewerCommand::Host(HostMessage::LoadAudio {
            locator: "file:///a.wav".into(),
            size_bytes: 1024,
        }));
        let audio = Arc::new(tone(3.0));
        controller.handle_event(ControllerEvent::Engine {
            generation: first,
            event: EngineEvent::Decoded(Arc::clone(&audio)),
        });
        assert_eq!(controller.snapshot().state.lifecycle, LifecycleState::Decoding);

        controller.handle_command(ViewerCommand::Host(HostMessage::LoadAudio {
            locator: "file:///b.wav".into(),
            size_bytes: 1024,
        }));
        let stale = stats::compute(audio.first_channel(), audio.sample_rate_hz, 3.0);
        controller.handle_event(ControllerEvent::StatsComputed {
            generation: first,
            summary: stale.clone(),
        });

        let state = controller.snapshot().state;
        assert_eq!(state.lifecycle, LifecycleState::Loading);
        assert_eq!(state.generation, Generation::new(2));
        assert!(state.summary.is_none());
        assert!(state.timeline.is_none());

        // Nothing decoded yet for generation 2, so its "stats" are dropped too.
        controller.handle_event(ControllerEvent::StatsComputed {
            generation: Generation::new(2),
            summary: stale,
        });
        assert!(controller.snapshot().state.summary.is_none());
    }

    #[tokio::test]
    async fn play_pause_only_while_ready_and_reset_on_reload() {
        let mut h = Harness::start(ViewerConfig::default());
        h.load("file:///song.wav", 1024);
        let load = h.next_load().await;

        h.handle.toggle_playback().unwrap();
        let snapshot = h.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state.lifecycle, LifecycleState::Loading);
        assert!(!snapshot.state.playing);
        assert!(!h
            .drain()
            .iter()
            .any(|event| matches!(event, ViewEvent::PlayPause { .. })));

        load.finish.send(Ok(tone(2.0))).unwrap();
        h.wait_for_lifecycle(LifecycleState::Ready).await;

        for expected in [true, false, true] {
            h.handle.toggle_playback().unwrap();
            let (playing, _) = h
                .wait_for(|event| match event {
                    ViewEvent::PlayPause { playing } => Some(*playing),
                    _ => None,
                })
                .await;
            assert_eq!(playing, expected);
        }
        assert!(h.handle.snapshot().await.unwrap().state.playing);

        h.handle.set_quality(QualityPreference::Low).unwrap();
        let reload = h.next_load().await;
        reload.finish.send(Ok(tone(2.0))).unwrap();
        let (ready, _) = h.wait_for_lifecycle(LifecycleState::Ready).await;
        assert_eq!(ready.state.profile, Some(QualityProfile::LOW));
        assert!(!ready.state.playing);
    }

    #[tokio::test]
    async fn decode_failure_enters_error_until_next_load() {
        let mut h = Harness::start(ViewerConfig::default());
        h.load("file:///broken.ogg", 2048);
        let load = h.next_load().await;
        load.finish.send(Err(anyhow!("unsupported codec"))).unwrap();

        let (snapshot, seen) = h.wait_for_lifecycle(LifecycleState::Error).await;
        assert_eq!(snapshot.state.error.as_deref(), Some("Error: unsupported codec"));
        assert!(snapshot.state.decoded.is_none());
        assert!(seen.iter().any(|event| matches!(
            event,
            ViewEvent::Error { kind: "decode", .. }
        )));
        assert!(seen
            .iter()
            .any(|event| matches!(event, ViewEvent::PaneDestroyed { .. })));

        // Controls do nothing while in ERROR.
        h.handle.set_quality(QualityPreference::Low).unwrap();
        h.handle.seek(0.5).unwrap();
        let snapshot = h.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state.lifecycle, LifecycleState::Error);
        assert!(h.loads.try_recv().is_err());

        h.load("file:///fixed.ogg", 2048);
        let ready = h.drive_to_ready(tone(1.0)).await;
        assert_eq!(ready.state.generation, Generation::new(2));
        assert_eq!(ready.state.profile, Some(QualityProfile::LOW));
        assert!(ready.state.error.is_none());
    }

    #[tokio::test]
    async fn incompatible_profile_fails_before_fetch() {
        let config = ViewerConfig {
            renderer_sample_rate_hz: 8_000,
            ..ViewerConfig::default()
        };
        let mut h = Harness::start(config);
        h.load("file:///small.wav", 1024);

        let (snapshot, seen) = h.wait_for_lifecycle(LifecycleState::Error).await;
        let message = snapshot.state.error.unwrap();
        assert!(message.starts_with("Error initializing audio visualizer"), "{message}");
        assert!(seen.iter().any(|event| matches!(
            event,
            ViewEvent::Error { kind: "initialization", .. }
        )));
        assert!(h.loads.try_recv().is_err());

        // LOW tops out at 4 kHz, which an 8 kHz renderer can show.
        h.handle.set_quality(QualityPreference::Low).unwrap();
        h.load("file:///small.wav", 1024);
        let load = h.next_load().await;
        assert_eq!(load.locator, "file:///small.wav");
    }

    #[tokio::test]
    async fn show_error_surfaces_host_failure() {
        let mut h = Harness::start(ViewerConfig::default());
        h.handle
            .host_json(r#"{"command":"showError","message":"Could not load audio file. EACCES"}"#)
            .unwrap();

        let (snapshot, seen) = h.wait_for_lifecycle(LifecycleState::Error).await;
        assert_eq!(
            snapshot.state.error.as_deref(),
            Some("Could not load audio file. EACCES")
        );
        assert!(seen.iter().any(|event| matches!(
            event,
            ViewEvent::Error { kind: "sourceUnavailable", .. }
        )));
        assert!(h.loads.try_recv().is_err());
    }

    #[tokio::test]
    async fn reload_restores_playback_ratio() {
        let mut h = Harness::start(ViewerConfig::default());
        h.handle.resize(all_panes(800.0)).unwrap();
        h.load("file:///song.flac", 1024 * 1024);
        let first = h.drive_to_ready(tone(8.0)).await;
        let first_profile = first.state.profile;

        h.handle.seek(0.25).unwrap();

        for round in 0..2 {
            h.handle.set_quality(QualityPreference::Auto).unwrap();
            h.wait_for_lifecycle(LifecycleState::Reloading).await;

            let load = h.next_load().await;
            load.finish.send(Ok(tone(8.0))).unwrap();
            let (ready, seen) = h.wait_for_lifecycle(LifecycleState::Ready).await;
            assert_eq!(ready.state.profile, first_profile, "round {round}");
            assert_eq!(ready.state.generation, Generation::new(round + 2));

            let first_constructed = seen
                .iter()
                .position(|event| matches!(event, ViewEvent::PaneConstructed { .. }))
                .expect("panes rebuilt");
            let last_destroyed = seen
                .iter()
                .rposition(|event| matches!(event, ViewEvent::PaneDestroyed { .. }))
                .expect("old panes destroyed");
            assert!(last_destroyed < first_constructed);

            let (ratio, _) = h
                .wait_for(|event| match event {
                    ViewEvent::SeekTo { ratio } => Some(*ratio),
                    _ => None,
                })
                .await;
            assert!((ratio - 0.25).abs() < 1e-9);
            let snapshot = h.handle.snapshot().await.unwrap();
            assert!((snapshot.state.playback_ratio - 0.25).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn secondary_toggle_rebuilds_without_overlay() {
        let mut h = Harness::start(ViewerConfig::default());
        h.handle.resize(all_panes(600.0)).unwrap();
        h.load("file:///voice.wav", 1024);
        h.drive_to_ready(tone(3.0)).await;

        h.handle.set_secondary_layer(false).unwrap();
        let load = h.next_load().await;
        load.finish.send(Ok(tone(3.0))).unwrap();
        let (ready, seen) = h.wait_for_lifecycle(LifecycleState::Ready).await;
        assert!(!ready.secondary_layer);

        let rebuilt: Vec<PaneKind> = seen
            .iter()
            .filter_map(|event| match event {
                ViewEvent::PaneConstructed { renderer, .. } => Some(renderer.kind()),
                _ => None,
            })
            .collect();
        assert_eq!(rebuilt, vec![PaneKind::Timeline, PaneKind::Waveform]);

        let (offsets, _) = h
            .wait_for(|event| match event {
                ViewEvent::Cursors { offsets } => Some(offsets.clone()),
                _ => None,
            })
            .await;
        assert_eq!(offsets.keys().copied().collect::<Vec<_>>(), vec![PaneKind::Waveform]);
    }

    #[tokio::test]
    async fn resize_burst_rezooms_once() {
        let mut h = Harness::start(ViewerConfig::default());
        h.handle.resize(all_panes(800.0)).unwrap();
        h.load("file:///loop.wav", 1024);
        let ready = h.drive_to_ready(tone(4.0)).await;
        let plan = ready.state.timeline;

        sleep(Duration::from_millis(250)).await;
        h.drain();

        for width in [400.0, 500.0, 650.0, 900.0, 1000.0] {
            h.handle
                .resize(ViewportDimensions::new().with(PaneKind::Waveform, width))
                .unwrap();
        }
        sleep(Duration::from_millis(300)).await;

        let zooms: Vec<f64> = h
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                ViewEvent::Zoom { pixels_per_second } => Some(pixels_per_second),
                _ => None,
            })
            .collect();
        assert_eq!(zooms, vec![250.0]);

        let snapshot = h.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state.timeline, plan);
    }

    #[tokio::test]
    async fn seeks_clicks_and_playback_move_cursors() {
        let mut h = Harness::start(ViewerConfig::default());
        h.handle
            .resize(
                ViewportDimensions::new()
                    .with(PaneKind::Waveform, 400.0)
                    .with(PaneKind::Secondary, 600.0),
            )
            .unwrap();

        // Seeks before READY are dropped.
        h.handle.seek(0.9).unwrap();
        h.load("file:///talk.wav", 1024);
        let ready = h.drive_to_ready(tone(4.0)).await;
        assert_eq!(ready.state.playback_ratio, 0.0);
        let generation = ready.state.generation;

        // Let the initial resize settle so its cursor sync cannot interleave.
        sleep(Duration::from_millis(250)).await;
        h.drain();

        h.handle.click(PaneKind::Waveform, 100.0).unwrap();
        let (ratio, _) = h
            .wait_for(|event| match event {
                ViewEvent::SeekTo { ratio } => Some(*ratio),
                _ => None,
            })
            .await;
        assert_eq!(ratio, 0.25);
        let (offsets, _) = h
            .wait_for(|event| match event {
                ViewEvent::Cursors { offsets } => Some(offsets.clone()),
                _ => None,
            })
            .await;
        assert_eq!(offsets[&PaneKind::Waveform], 100.0);
        assert_eq!(offsets[&PaneKind::Secondary], 150.0);

        h.handle.playback_position(generation, 2.0).unwrap();
        let (offsets, _) = h
            .wait_for(|event| match event {
                ViewEvent::Cursors { offsets } => Some(offsets.clone()),
                _ => None,
            })
            .await;
        assert_eq!(offsets[&PaneKind::Waveform], 200.0);
        assert_eq!(offsets[&PaneKind::Secondary], 300.0);

        h.handle
            .playback_position(Generation::new(99), 3.0)
            .unwrap();
        let snapshot = h.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state.playback_ratio, 0.5);
    }

    #[tokio::test]
    async fn close_tears_down_and_stops() {
        let mut h = Harness::start(ViewerConfig::default());
        h.load("file:///bye.wav", 1024);
        h.drive_to_ready(tone(1.0)).await;
        h.drain();

        h.handle.close().unwrap();
        timeout(WAIT, &mut h.task)
            .await
            .expect("controller did not stop")
            .unwrap();

        let destroyed = h
            .drain()
            .into_iter()
            .filter(|event| matches!(event, ViewEvent::PaneDestroyed { .. }))
            .count();
        assert_eq!(destroyed, 3);
        assert!(h.handle.seek(0.1).is_err());
    }

    #[tokio::test]
    async fn empty_decode_reaches_ready_with_unavailable_stats() {
        let mut h = Harness::start(ViewerConfig::default());
        h.load("file:///empty.wav", 44);
        let ready = h.drive_to_ready(DecodedAudio::new(44_100, Vec::new())).await;
        let summary = ready.state.summary.unwrap();
        assert!(!summary.is_available());
        assert_eq!(ready.state.timeline.unwrap().tick_interval_seconds, 0.01);
    }
}
