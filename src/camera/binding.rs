use super::format::{Orientation, PreviewFormat, Resolution};
use crate::error::BindingError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// USB device descriptor as reported by the device monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbDevice {
    /// Bus-unique device id
    pub id: u32,
    pub vendor_id: u16,
    pub product_id: u16,
    pub product_name: String,
    /// Device node name, e.g. `/dev/bus/usb/001/004`
    pub device_name: String,
}

impl UsbDevice {
    /// Label shown when picking between several candidate devices
    pub fn label(&self) -> String {
        format!("{} -> {}", self.product_name, self.device_name)
    }
}

/// Capability granted by the device monitor once access to a device is approved.
///
/// The controller only borrows it for the duration of one `open` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlHandle {
    device: UsbDevice,
    file_descriptor: i32,
}

impl ControlHandle {
    pub fn new(device: UsbDevice, file_descriptor: i32) -> Self {
        Self {
            device,
            file_descriptor,
        }
    }

    pub fn device(&self) -> &UsbDevice {
        &self.device
    }

    pub fn file_descriptor(&self) -> i32 {
        self.file_descriptor
    }
}

/// Reference to an external drawable target owned by the display surface provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceHandle {
    id: u64,
}

impl SurfaceHandle {
    pub const fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.id)
    }
}

/// Device operations the session controller issues against a camera.
///
/// Every call happens on the session worker, one at a time. Implementations may take
/// as long as the hardware needs; nothing else is queued behind them on the producer side.
#[async_trait]
pub trait CameraBinding: Send + Sync {
    /// Open camera instance owned by the controller between `open` and `release`
    type Instance: Send + 'static;

    async fn open(&self, handle: &ControlHandle) -> Result<Self::Instance, BindingError>;

    /// Sizes the device advertises. An empty list means the device could not report them.
    async fn supported_resolutions(&self, instance: &mut Self::Instance) -> Vec<Resolution>;

    async fn set_orientation(
        &self,
        instance: &mut Self::Instance,
        orientation: Orientation,
    ) -> Result<(), BindingError>;

    async fn configure(
        &self,
        instance: &mut Self::Instance,
        format: &PreviewFormat,
    ) -> Result<(), BindingError>;

    async fn bind_display(
        &self,
        instance: &mut Self::Instance,
        surface: &SurfaceHandle,
    ) -> Result<(), BindingError>;

    async fn start_streaming(&self, instance: &mut Self::Instance) -> Result<(), BindingError>;

    async fn stop_streaming(&self, instance: &mut Self::Instance) -> Result<(), BindingError>;

    /// Destroy the instance. Always succeeds from the controller's point of view.
    async fn release(&self, instance: Self::Instance);
}
