pub mod commands;
pub mod controller;
pub mod events;
pub mod state;

pub(crate) use events::ControllerEvent;

pub use commands::{ViewerCommand, ViewerHandle};
pub use controller::SessionController;
pub use events::ViewEvent;
pub use state::{Generation, LifecycleState, ProgressIndicator, SessionSnapshot, SessionState};
