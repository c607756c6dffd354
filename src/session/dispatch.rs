use super::controller::SessionController;
use crate::camera::{CameraBinding, ControlHandle, SurfaceHandle, UsbDevice};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Commands processed by the session worker, in the order they were posted
#[derive(Debug, Clone)]
pub enum CameraCommand {
    /// Permission granted for a device; open it
    DeviceConnected(ControlHandle),
    /// A device went away
    DeviceDisconnected(ControlHandle),
    /// A drawable surface is available
    SurfaceReady(SurfaceHandle),
    StartRequested,
    StopRequested,
    /// Release everything; carries the surface when its invalidation triggered the teardown
    TeardownRequested(Option<SurfaceHandle>),
}

impl CameraCommand {
    pub fn name(&self) -> &'static str {
        match self {
            CameraCommand::DeviceConnected(_) => "device_connected",
            CameraCommand::DeviceDisconnected(_) => "device_disconnected",
            CameraCommand::SurfaceReady(_) => "surface_ready",
            CameraCommand::StartRequested => "start_requested",
            CameraCommand::StopRequested => "stop_requested",
            CameraCommand::TeardownRequested(_) => "teardown_requested",
        }
    }
}

/// Producer side of the session queue.
///
/// Cheap to clone; hand one to every callback source. Posting never blocks and never
/// touches the controller directly.
#[derive(Clone)]
pub struct CommandDispatch {
    sender: mpsc::UnboundedSender<CameraCommand>,
}

impl CommandDispatch {
    /// Enqueue a command for the session worker
    pub fn post(&self, command: CameraCommand) {
        let name = command.name();
        if self.sender.send(command).is_err() {
            warn!("Session worker is gone; dropping {}", name);
        }
    }

    /// Whether the session worker has exited
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn on_device_attached(&self, device: &UsbDevice) {
        info!("USB device attached: {} ({})", device.label(), device.product_id);
    }

    pub fn on_device_detached(&self, device: &UsbDevice) {
        info!("USB device detached: {} ({})", device.label(), device.product_id);
    }

    pub fn on_permission_cancelled(&self, device: &UsbDevice) {
        info!("USB permission cancelled for {}", device.label());
    }

    pub fn on_device_connected(&self, handle: ControlHandle) {
        info!("USB device connected: {}", handle.device().label());
        self.post(CameraCommand::DeviceConnected(handle));
    }

    pub fn on_device_disconnected(&self, handle: ControlHandle) {
        info!("USB device disconnected: {}", handle.device().label());
        self.post(CameraCommand::DeviceDisconnected(handle));
    }

    pub fn on_surface_ready(&self, surface: SurfaceHandle) {
        self.post(CameraCommand::SurfaceReady(surface));
    }

    /// The surface is invalid from now on; the session is torn down
    pub fn on_surface_destroyed(&self, surface: SurfaceHandle) {
        debug!("{} destroyed", surface);
        self.post(CameraCommand::TeardownRequested(Some(surface)));
    }

    pub fn request_start(&self) {
        self.post(CameraCommand::StartRequested);
    }

    pub fn request_stop(&self) {
        self.post(CameraCommand::StopRequested);
    }

    pub fn request_teardown(&self) {
        self.post(CameraCommand::TeardownRequested(None));
    }
}

/// Single consumer of the session queue
pub struct SessionWorker<B: CameraBinding> {
    controller: SessionController<B>,
    receiver: mpsc::UnboundedReceiver<CameraCommand>,
    cancellation_token: CancellationToken,
}

impl<B: CameraBinding + 'static> SessionWorker<B> {
    /// Create a worker and the dispatch feeding it
    pub fn new(
        controller: SessionController<B>,
        cancellation_token: CancellationToken,
    ) -> (Self, CommandDispatch) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = Self {
            controller,
            receiver,
            cancellation_token,
        };
        (worker, CommandDispatch { sender })
    }

    /// Process commands until every dispatch is dropped or the token is cancelled,
    /// then release any live camera and hand the controller back.
    pub async fn run(mut self) -> SessionController<B> {
        info!("Camera session worker started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    debug!("Session worker cancelled");
                    break;
                }
                command = self.receiver.recv() => match command {
                    Some(command) => self.controller.handle(command).await,
                    None => {
                        debug!("All session dispatchers dropped");
                        break;
                    }
                },
            }
        }

        self.receiver.close();
        self.controller.shutdown().await;
        info!("Camera session worker stopped");
        self.controller
    }
}

/// Spawn the session worker on its own task
pub fn spawn_session<B: CameraBinding + 'static>(
    controller: SessionController<B>,
    cancellation_token: CancellationToken,
) -> (CommandDispatch, JoinHandle<SessionController<B>>) {
    let (worker, dispatch) = SessionWorker::new(controller, cancellation_token);
    (dispatch, tokio::spawn(worker.run()))
}
