use crate::camera::{ControlHandle, UsbDevice};
use crate::error::{Result, UvcError};
use crate::session::CommandDispatch;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Hot-plug monitor that enumerates devices and asks the user for access.
///
/// A granted permission arrives later as `on_device_connected` on the dispatch.
pub trait DeviceMonitor: Send + Sync {
    fn device_list(&self) -> Vec<UsbDevice>;

    fn request_permission(&self, device: &UsbDevice);
}

/// One-of-N device choice in front of the permission request
pub struct DeviceSelector<M: DeviceMonitor> {
    monitor: M,
    dispatch: CommandDispatch,
    index: usize,
}

impl<M: DeviceMonitor> DeviceSelector<M> {
    pub fn new(monitor: M, dispatch: CommandDispatch, index: usize) -> Self {
        Self {
            monitor,
            dispatch,
            index,
        }
    }

    pub fn selected_index(&self) -> usize {
        self.index
    }

    pub fn monitor(&self) -> &M {
        &self.monitor
    }

    /// Labels of the candidate devices, in selection order
    pub fn candidates(&self) -> Vec<String> {
        self.monitor
            .device_list()
            .iter()
            .map(UsbDevice::label)
            .collect()
    }

    /// Request permission for the currently selected device, if any is attached
    pub fn open_selected(&self) -> Option<UsbDevice> {
        let devices = self.monitor.device_list();
        if devices.is_empty() {
            debug!("No USB devices to open");
            return None;
        }

        let device = devices.get(self.index).unwrap_or(&devices[0]).clone();
        info!("Requesting permission for {}", device.label());
        self.monitor.request_permission(&device);
        Some(device)
    }

    /// Switch to another device.
    ///
    /// The current session is torn down before permission for the new device is requested,
    /// so the old instance is always released before the new one can be opened.
    pub fn select(&mut self, index: usize) -> Result<Option<UsbDevice>> {
        let devices = self.monitor.device_list();
        if devices.is_empty() {
            debug!("No USB devices to select from");
            return Ok(None);
        }

        let device = devices
            .get(index)
            .cloned()
            .ok_or(UvcError::InvalidSelection {
                index,
                available: devices.len(),
            })?;

        if index == self.index {
            debug!("Device {} already selected", index);
            return Ok(None);
        }

        info!("Switching camera to {}", device.label());
        self.dispatch.request_teardown();
        self.index = index;
        self.monitor.request_permission(&device);
        Ok(Some(device))
    }
}

#[derive(Default)]
struct MonitorState {
    devices: Vec<UsbDevice>,
    permission_requests: Vec<u32>,
    deny_next_permission: bool,
}

/// Device monitor over a fixed set of fake devices that grants every permission request
#[derive(Clone)]
pub struct SimulatedMonitor {
    dispatch: CommandDispatch,
    state: Arc<Mutex<MonitorState>>,
}

impl SimulatedMonitor {
    pub fn new(dispatch: CommandDispatch) -> Self {
        Self {
            dispatch,
            state: Arc::new(Mutex::new(MonitorState::default())),
        }
    }

    /// Create a monitor with `count` cameras already attached
    pub fn with_devices(dispatch: CommandDispatch, count: u32) -> Self {
        let monitor = Self::new(dispatch);
        for id in 1..=count {
            monitor.attach(UsbDevice {
                id,
                vendor_id: 0x0c45,
                product_id: 12384,
                product_name: format!("UVC Camera {}", id),
                device_name: format!("/dev/bus/usb/001/{:03}", id + 1),
            });
        }
        monitor
    }

    pub fn attach(&self, device: UsbDevice) {
        self.dispatch.on_device_attached(&device);
        self.state.lock().devices.push(device);
    }

    /// Unplug the device at `index`, reporting a disconnect for it
    pub fn detach(&self, index: usize) -> Option<UsbDevice> {
        let device = {
            let mut state = self.state.lock();
            if index >= state.devices.len() {
                return None;
            }
            state.devices.remove(index)
        };

        self.dispatch
            .on_device_disconnected(control_handle(&device));
        self.dispatch.on_device_detached(&device);
        Some(device)
    }

    /// Make the user cancel the next permission dialog
    pub fn deny_next_permission(&self) {
        self.state.lock().deny_next_permission = true;
    }

    /// Device ids permission was requested for, in order
    pub fn permission_requests(&self) -> Vec<u32> {
        self.state.lock().permission_requests.clone()
    }
}

impl DeviceMonitor for SimulatedMonitor {
    fn device_list(&self) -> Vec<UsbDevice> {
        self.state.lock().devices.clone()
    }

    fn request_permission(&self, device: &UsbDevice) {
        let denied = {
            let mut state = self.state.lock();
            state.permission_requests.push(device.id);
            std::mem::take(&mut state.deny_next_permission)
        };

        if denied {
            self.dispatch.on_permission_cancelled(device);
        } else {
            self.dispatch.on_device_connected(control_handle(device));
        }
    }
}

fn control_handle(device: &UsbDevice) -> ControlHandle {
    // Fake descriptor derived from the device id
    ControlHandle::new(device.clone(), 100 + device.id as i32)
}
