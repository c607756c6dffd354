pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod events;
pub mod keyboard_input;
pub mod monitor;
pub mod session;

pub use app::{SessionOrchestrator, ShutdownReason};
pub use camera::{
    CameraBinding, ControlHandle, Flip, FrameFormat, Orientation, PreviewFormat, Resolution,
    Rotation, SimulatedCamera, SurfaceHandle, UsbDevice,
};
pub use config::{CameraConfig, SessionConfig, UvcConfig};
pub use error::{BindingError, EventBusError, Result, UvcError};
pub use events::{EventBus, EventFilter, EventReceiver, SessionNotice};
pub use monitor::{DeviceMonitor, DeviceSelector, SimulatedMonitor};
pub use session::{
    negotiate_resolution, spawn_session, CameraCommand, CommandDispatch, SessionController,
    SessionSnapshot, SessionState, SessionWorker,
};
