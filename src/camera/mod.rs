mod binding;
mod format;
mod simulated;
#[cfg(test)]
mod tests;

pub use binding::{CameraBinding, ControlHandle, SurfaceHandle, UsbDevice};
pub use format::{Flip, FrameFormat, Orientation, PreviewFormat, Resolution, Rotation};
pub use simulated::{BindingCall, SimulatedCamera, SimulatedInstance};
