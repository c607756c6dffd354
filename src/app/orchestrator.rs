use super::types::ShutdownReason;
use crate::camera::SimulatedCamera;
use crate::config::UvcConfig;
use crate::events::EventBus;
use crate::keyboard_input::KeyboardInputHandler;
use crate::monitor::{DeviceSelector, SimulatedMonitor};
use crate::session::{CommandDispatch, SessionController};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default number of simulated cameras plugged in at startup
pub const DEFAULT_DEVICE_COUNT: u32 = 1;

/// Application coordinator wiring the device monitor, the session worker and the shell
pub struct SessionOrchestrator {
    pub(super) config: UvcConfig,
    pub(super) camera: SimulatedCamera,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) device_count: u32,

    // Components
    pub(super) dispatch: Option<CommandDispatch>,
    pub(super) selector: Option<Arc<Mutex<DeviceSelector<SimulatedMonitor>>>>,
    pub(super) session_worker: Option<JoinHandle<SessionController<SimulatedCamera>>>,
    pub(super) notice_logger: Option<JoinHandle<()>>,
    pub(super) keyboard_handler: Option<Arc<KeyboardInputHandler>>,
    pub(super) keyboard_enabled: bool,

    // Lifecycle management
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl SessionOrchestrator {
    /// Create a new orchestrator with the given configuration
    pub fn new(config: UvcConfig) -> Self {
        let event_bus = Arc::new(EventBus::new(config.session.event_bus_capacity));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Self {
            config,
            camera: SimulatedCamera::default(),
            event_bus,
            device_count: DEFAULT_DEVICE_COUNT,
            dispatch: None,
            selector: None,
            session_worker: None,
            notice_logger: None,
            keyboard_handler: None,
            keyboard_enabled: false,
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Number of simulated cameras attached when the monitor starts
    pub fn with_device_count(mut self, device_count: u32) -> Self {
        self.device_count = device_count;
        self
    }

    /// Enable or disable the interactive keyboard shell
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    pub fn config(&self) -> &UvcConfig {
        &self.config
    }

    pub fn camera(&self) -> &SimulatedCamera {
        &self.camera
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Queue handle for the running session, once started
    pub fn dispatch(&self) -> Option<CommandDispatch> {
        self.dispatch.clone()
    }

    pub fn selector(&self) -> Option<Arc<Mutex<DeviceSelector<SimulatedMonitor>>>> {
        self.selector.clone()
    }

    /// Token cancelled when the application should stop
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }
}
