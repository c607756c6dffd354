mod controller;
mod dispatch;
mod negotiation;
mod state;

pub use controller::SessionController;
pub use dispatch::{spawn_session, CameraCommand, CommandDispatch, SessionWorker};
pub use negotiation::negotiate_resolution;
pub use state::{SessionSnapshot, SessionState};
