mod cursor;
mod engine;
mod error;
mod models;
mod protocol;
mod quality;
mod registry;
mod render;
mod resize;
mod session;
mod settings;
mod stats;
mod timeline;
mod utils;

use std::path::Path;

pub use cursor::{clamp_ratio, ratio_from_click};
pub use engine::{DecodeEngine, DecodedAudio, EngineEvent, LoadReporter};
pub use error::ViewerError;
pub use models::AudioSourceRef;
pub use protocol::HostMessage;
pub use quality::{QualityLabel, QualityPreference, QualityProfile};
pub use registry::ViewerRegistry;
pub use render::{PaneKind, RenderSession, Renderer, ViewportDimensions};
pub use session::{
    Generation, LifecycleState, ProgressIndicator, SessionController, SessionSnapshot,
    SessionState, ViewEvent, ViewerCommand, ViewerHandle,
};
pub use settings::ViewerConfig;
pub use stats::{format_file_size, DecodedAudioSummary, InfoBar, RmsLevel};
pub use timeline::TimelineIntervalPlan;

/// Initialize logging. `RUST_LOG` still overrides the default level.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let level = if settings::debug_mode() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();

    log::info!("SonicScope viewer core starting up...");
}

/// Read the config file (defaults when absent) and build an empty registry.
pub fn bootstrap<E: DecodeEngine>(
    engine: E,
    config_path: impl AsRef<Path>,
) -> anyhow::Result<ViewerRegistry<E>> {
    let config = ViewerConfig::load(config_path)?;
    log::debug!("Viewer config: {config:?}");
    Ok(ViewerRegistry::new(engine, config))
}
