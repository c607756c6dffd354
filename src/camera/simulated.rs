use super::binding::{CameraBinding, ControlHandle, SurfaceHandle};
use super::format::{Orientation, PreviewFormat, Resolution};
use crate::error::BindingError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// A device operation observed by [`SimulatedCamera`]
#[derive(Debug, Clone, PartialEq)]
pub enum BindingCall {
    Open { device_id: u32, instance: u64 },
    OpenRejected { device_id: u32 },
    SupportedResolutions { instance: u64 },
    SetOrientation { instance: u64, orientation: Orientation },
    Configure { instance: u64, format: PreviewFormat },
    BindDisplay { instance: u64, surface: SurfaceHandle },
    StartStreaming { instance: u64 },
    StopStreaming { instance: u64 },
    Release { instance: u64 },
}

/// Camera instance handed out by [`SimulatedCamera`]
#[derive(Debug)]
pub struct SimulatedInstance {
    id: u64,
    device_id: u32,
    format: Option<PreviewFormat>,
    surface: Option<SurfaceHandle>,
    streaming: bool,
}

impl SimulatedInstance {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }
}

#[derive(Default)]
struct SimulatedState {
    calls: Vec<BindingCall>,
    next_instance: u64,
    open_instances: HashSet<u64>,
    max_open_instances: usize,
    fail_next_open: Option<BindingError>,
    fail_next_configure: Option<BindingError>,
    fail_next_start: Option<BindingError>,
}

/// In-memory camera binding that records every call it receives.
///
/// Backs the interactive shell when no hardware is attached, and the session tests.
#[derive(Clone)]
pub struct SimulatedCamera {
    supported: Arc<Vec<Resolution>>,
    latency: Duration,
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedCamera {
    pub fn new(supported: Vec<Resolution>) -> Self {
        Self {
            supported: Arc::new(supported),
            latency: Duration::ZERO,
            state: Arc::new(Mutex::new(SimulatedState::default())),
        }
    }

    /// Delay applied to every device call, to mimic slow USB control transfers
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fail_next_open(&self, error: BindingError) {
        self.state.lock().fail_next_open = Some(error);
    }

    pub fn fail_next_configure(&self, error: BindingError) {
        self.state.lock().fail_next_configure = Some(error);
    }

    pub fn fail_next_start(&self, error: BindingError) {
        self.state.lock().fail_next_start = Some(error);
    }

    /// Every call recorded so far, in order
    pub fn calls(&self) -> Vec<BindingCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn open_instances(&self) -> usize {
        self.state.lock().open_instances.len()
    }

    /// Highest number of simultaneously open instances ever observed
    pub fn max_open_instances(&self) -> usize {
        self.state.lock().max_open_instances
    }

    async fn hardware_delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn record(&self, call: BindingCall) {
        trace!("Simulated camera call: {:?}", call);
        self.state.lock().calls.push(call);
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new(vec![
            Resolution::new(320, 240),
            Resolution::new(640, 480),
            Resolution::new(1280, 720),
        ])
    }
}

#[async_trait]
impl CameraBinding for SimulatedCamera {
    type Instance = SimulatedInstance;

    async fn open(&self, handle: &ControlHandle) -> Result<SimulatedInstance, BindingError> {
        self.hardware_delay().await;
        let device_id = handle.device().id;

        let mut state = self.state.lock();
        let rejection = state.fail_next_open.take().or_else(|| {
            (handle.file_descriptor() < 0).then(|| {
                BindingError::transport(format!(
                    "invalid file descriptor {}",
                    handle.file_descriptor()
                ))
            })
        });
        if let Some(error) = rejection {
            state.calls.push(BindingCall::OpenRejected { device_id });
            return Err(error);
        }

        state.next_instance += 1;
        let id = state.next_instance;
        state.open_instances.insert(id);
        state.max_open_instances = state.max_open_instances.max(state.open_instances.len());
        state.calls.push(BindingCall::Open {
            device_id,
            instance: id,
        });
        debug!(
            "Simulated camera opened instance {} for device {} (fd {})",
            id,
            device_id,
            handle.file_descriptor()
        );

        Ok(SimulatedInstance {
            id,
            device_id,
            format: None,
            surface: None,
            streaming: false,
        })
    }

    async fn supported_resolutions(&self, instance: &mut SimulatedInstance) -> Vec<Resolution> {
        self.record(BindingCall::SupportedResolutions {
            instance: instance.id,
        });
        self.supported.as_ref().clone()
    }

    async fn set_orientation(
        &self,
        instance: &mut SimulatedInstance,
        orientation: Orientation,
    ) -> Result<(), BindingError> {
        self.record(BindingCall::SetOrientation {
            instance: instance.id,
            orientation,
        });
        Ok(())
    }

    async fn configure(
        &self,
        instance: &mut SimulatedInstance,
        format: &PreviewFormat,
    ) -> Result<(), BindingError> {
        self.hardware_delay().await;
        self.record(BindingCall::Configure {
            instance: instance.id,
            format: *format,
        });

        if let Some(error) = self.state.lock().fail_next_configure.take() {
            return Err(error);
        }
        if !format.frame_rate_scale.is_finite() || format.frame_rate_scale <= 0.0 {
            return Err(BindingError::invalid_argument(format!(
                "frame rate scale {} must be positive",
                format.frame_rate_scale
            )));
        }
        if !self.supported.is_empty() && !self.supported.contains(&format.resolution) {
            return Err(BindingError::unsupported(format!(
                "preview size {} not supported",
                format.resolution
            )));
        }

        instance.format = Some(*format);
        Ok(())
    }

    async fn bind_display(
        &self,
        instance: &mut SimulatedInstance,
        surface: &SurfaceHandle,
    ) -> Result<(), BindingError> {
        self.record(BindingCall::BindDisplay {
            instance: instance.id,
            surface: *surface,
        });
        instance.surface = Some(*surface);
        Ok(())
    }

    async fn start_streaming(&self, instance: &mut SimulatedInstance) -> Result<(), BindingError> {
        self.hardware_delay().await;
        self.record(BindingCall::StartStreaming {
            instance: instance.id,
        });

        if let Some(error) = self.state.lock().fail_next_start.take() {
            return Err(error);
        }
        if instance.format.is_none() {
            return Err(BindingError::invalid_argument("preview format not configured"));
        }

        instance.streaming = true;
        Ok(())
    }

    async fn stop_streaming(&self, instance: &mut SimulatedInstance) -> Result<(), BindingError> {
        self.hardware_delay().await;
        self.record(BindingCall::StopStreaming {
            instance: instance.id,
        });
        instance.streaming = false;
        Ok(())
    }

    async fn release(&self, instance: SimulatedInstance) {
        self.hardware_delay().await;
        let mut state = self.state.lock();
        state.open_instances.remove(&instance.id);
        state.calls.push(BindingCall::Release {
            instance: instance.id,
        });
        debug!(
            "Simulated camera released instance {} (device {}, streaming={}, surface={:?})",
            instance.id, instance.device_id, instance.streaming, instance.surface
        );
    }
}
