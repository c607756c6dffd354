use crate::camera::{PreviewFormat, SurfaceHandle, UsbDevice};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Camera session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Opening,
    Configured,
    Previewing,
    Stopping,
    Destroyed,
}

impl SessionState {
    /// States in which a camera instance is expected to be live
    pub fn has_instance(&self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Destroyed)
    }
}

/// Point-in-time view of the controller, for status reporting and tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub session_id: Option<Uuid>,
    pub device: Option<UsbDevice>,
    pub preview: Option<PreviewFormat>,
    /// Surface last announced by the display provider
    pub surface: Option<SurfaceHandle>,
    /// Surface currently bound to the camera instance
    pub bound_surface: Option<SurfaceHandle>,
    pub streaming: bool,
    pub start_pending: bool,
}
