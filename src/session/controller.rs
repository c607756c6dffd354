use super::dispatch::CameraCommand;
use super::negotiation::negotiate_resolution;
use super::state::{SessionSnapshot, SessionState};
use crate::camera::{CameraBinding, ControlHandle, PreviewFormat, SurfaceHandle, UsbDevice};
use crate::config::UvcConfig;
use crate::error::BindingError;
use crate::events::{EventBus, SessionNotice};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// The one camera instance a session owns between open and release
struct ActiveCamera<I> {
    instance: I,
    session_id: Uuid,
    device: UsbDevice,
    preview: PreviewFormat,
    bound_surface: Option<SurfaceHandle>,
    streaming: bool,
}

/// State machine owning at most one open camera.
///
/// Every mutation happens inside [`SessionController::handle`], which the session worker
/// calls for one queued command at a time. Device failures are absorbed here and leave
/// the controller in a well-defined state; nothing is returned to the producer.
pub struct SessionController<B: CameraBinding> {
    binding: B,
    config: UvcConfig,
    state: SessionState,
    camera: Option<ActiveCamera<B::Instance>>,
    surface: Option<SurfaceHandle>,
    start_pending: bool,
    event_bus: Option<Arc<EventBus>>,
}

impl<B: CameraBinding> SessionController<B> {
    pub fn new(binding: B, config: UvcConfig) -> Self {
        Self {
            binding,
            config,
            state: SessionState::Idle,
            camera: None,
            surface: None,
            start_pending: false,
            event_bus: None,
        }
    }

    /// Publish session notices on the given bus
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    pub fn is_streaming(&self) -> bool {
        self.camera.as_ref().is_some_and(|camera| camera.streaming)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            session_id: self.camera.as_ref().map(|c| c.session_id),
            device: self.camera.as_ref().map(|c| c.device.clone()),
            preview: self.camera.as_ref().map(|c| c.preview),
            surface: self.surface,
            bound_surface: self.camera.as_ref().and_then(|c| c.bound_surface),
            streaming: self.is_streaming(),
            start_pending: self.start_pending,
        }
    }

    /// Process a single queued command to completion
    pub async fn handle(&mut self, command: CameraCommand) {
        debug!("Handling {} in state {:?}", command.name(), self.state);

        match command {
            CameraCommand::DeviceConnected(handle) => self.connect(handle).await,
            CameraCommand::DeviceDisconnected(handle) => self.disconnect(handle).await,
            CameraCommand::SurfaceReady(surface) => self.set_surface(surface).await,
            CameraCommand::StartRequested => self.start().await,
            CameraCommand::StopRequested => self.stop().await,
            CameraCommand::TeardownRequested(surface) => self.teardown(surface).await,
        }
    }

    /// Release anything still open; used when the worker exits
    pub async fn shutdown(&mut self) {
        if self.camera.is_some() {
            info!("Releasing live camera on session shutdown");
            self.teardown(None).await;
        }
    }

    async fn connect(&mut self, handle: ControlHandle) {
        let started = Instant::now();
        let device = handle.device().clone();

        if self.camera.is_some() {
            info!(
                "Device {} connected while a camera is live; tearing down the old one first",
                device.id
            );
            self.release_camera().await;
        }

        self.transition(SessionState::Opening);

        let mut instance = match self.binding.open(&handle).await {
            Ok(instance) => instance,
            Err(e) => {
                self.open_failed(&device, e);
                return;
            }
        };

        let preview = match Self::configure(&self.binding, &self.config, &mut instance).await {
            Ok(preview) => preview,
            Err(e) => {
                self.binding.release(instance).await;
                self.open_failed(&device, e);
                return;
            }
        };

        let session_id = Uuid::new_v4();
        self.camera = Some(ActiveCamera {
            instance,
            session_id,
            device: device.clone(),
            preview,
            bound_surface: None,
            streaming: false,
        });
        self.transition(SessionState::Configured);
        self.notify(SessionNotice::CameraOpened {
            session_id,
            device_id: device.id,
            resolution: preview.resolution,
            timestamp: SystemTime::now(),
        });
        debug!("Camera create took {:?}", started.elapsed());

        if self.surface.is_some() && (self.config.session.auto_start_on_open || self.start_pending)
        {
            self.start().await;
        }
    }

    /// Apply orientation defaults, negotiate the preview size and set the preview format
    async fn configure(
        binding: &B,
        config: &UvcConfig,
        instance: &mut B::Instance,
    ) -> Result<PreviewFormat, BindingError> {
        binding
            .set_orientation(instance, config.camera.orientation())
            .await?;

        let desired = config.camera.preview_format();
        let supported = binding.supported_resolutions(instance).await;
        if supported.is_empty() {
            warn!("Device did not report supported sizes; requesting {}", desired.resolution);
        } else {
            debug!("Device supports {} preview sizes: {:?}", supported.len(), supported);
        }

        let preview = PreviewFormat {
            resolution: negotiate_resolution(&supported, desired.resolution),
            ..desired
        };
        info!("Preview size negotiated to {}", preview.resolution);

        binding.configure(instance, &preview).await?;
        Ok(preview)
    }

    async fn disconnect(&mut self, handle: ControlHandle) {
        let device = handle.device();
        let is_live = self
            .camera
            .as_ref()
            .is_some_and(|camera| camera.device.id == device.id);

        if !is_live {
            info!("Device {} disconnected; no live session uses it", device.id);
            return;
        }

        if !self.config.session.teardown_on_disconnect {
            warn!(
                "Live device {} disconnected; session kept until teardown is requested",
                device.id
            );
            return;
        }

        info!("Live device {} disconnected; tearing down session", device.id);
        self.teardown(None).await;
    }

    async fn set_surface(&mut self, surface: SurfaceHandle) {
        if self.state == SessionState::Destroyed {
            debug!("Ignoring {}: session destroyed", surface);
            return;
        }

        let previous = self.surface.replace(surface);
        info!("Surface {} ready (previous: {:?})", surface, previous);

        if self.is_streaming() {
            self.stop().await;
            self.start().await;
        } else if self.camera.is_some() {
            self.start().await;
        }
    }

    async fn start(&mut self) {
        if self.state == SessionState::Destroyed {
            debug!("Ignoring start: session destroyed");
            return;
        }

        let Some(camera) = self.camera.as_mut() else {
            debug!("Start requested with no camera; will start once one is ready");
            self.start_pending = true;
            return;
        };

        if camera.streaming {
            debug!("Start requested while already streaming");
            return;
        }

        let Some(surface) = self.surface else {
            info!("Start requested without a surface; waiting for one");
            self.start_pending = true;
            return;
        };

        let started = Instant::now();
        let session_id = camera.session_id;

        if camera.bound_surface != Some(surface) {
            debug!("Binding {} to session {}", surface, session_id);
            if let Err(e) = self.binding.bind_display(&mut camera.instance, &surface).await {
                self.start_failed(session_id, e);
                return;
            }
            camera.bound_surface = Some(surface);
        }

        if let Err(e) = self.binding.start_streaming(&mut camera.instance).await {
            self.start_failed(session_id, e);
            return;
        }
        camera.streaming = true;

        self.start_pending = false;
        self.transition(SessionState::Previewing);
        self.notify(SessionNotice::StreamingStarted {
            session_id,
            surface,
            timestamp: SystemTime::now(),
        });
        debug!("Camera start took {:?}", started.elapsed());
    }

    async fn stop(&mut self) {
        self.start_pending = false;

        if !self.is_streaming() {
            debug!("Stop requested while not streaming");
            return;
        }

        let started = Instant::now();
        self.transition(SessionState::Stopping);

        let Some(camera) = self.camera.as_mut() else {
            return;
        };
        let session_id = camera.session_id;
        let result = self.binding.stop_streaming(&mut camera.instance).await;
        camera.streaming = false;

        if let Err(e) = result {
            error!("Stopping stream for session {} failed: {}", session_id, e);
        }

        self.transition(SessionState::Configured);
        self.notify(SessionNotice::StreamingStopped {
            session_id,
            timestamp: SystemTime::now(),
        });
        debug!("Camera stop took {:?}", started.elapsed());
    }

    async fn teardown(&mut self, surface: Option<SurfaceHandle>) {
        let started = Instant::now();
        if let Some(surface) = surface {
            debug!("Teardown triggered by invalidated {}", surface);
        }

        self.release_camera().await;
        self.surface = None;
        self.start_pending = false;
        self.transition(SessionState::Destroyed);
        debug!("Camera destroy took {:?}", started.elapsed());
    }

    /// Stop streaming if needed and release the live instance, if any
    async fn release_camera(&mut self) {
        if self.is_streaming() {
            self.stop().await;
        }

        if let Some(camera) = self.camera.take() {
            self.binding.release(camera.instance).await;
            self.notify(SessionNotice::CameraReleased {
                session_id: camera.session_id,
                timestamp: SystemTime::now(),
            });
        }
    }

    fn open_failed(&mut self, device: &UsbDevice, e: BindingError) {
        error!("Failed to open camera on device {}: {}", device.id, e);
        self.transition(SessionState::Idle);
        self.notify(SessionNotice::OpenFailed {
            device_id: device.id,
            error: e.to_string(),
            timestamp: SystemTime::now(),
        });
    }

    fn start_failed(&mut self, session_id: Uuid, e: BindingError) {
        warn!("Failed to start streaming for session {}: {}", session_id, e);
        self.notify(SessionNotice::StartFailed {
            session_id,
            error: e.to_string(),
            timestamp: SystemTime::now(),
        });
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }

        self.state = to;
        debug!("Session state changed: {:?} -> {:?}", from, to);
        self.notify(SessionNotice::StateChanged {
            from,
            to,
            timestamp: SystemTime::now(),
        });
    }

    fn notify(&self, notice: SessionNotice) {
        if let Some(event_bus) = &self.event_bus {
            // No subscribers is fine; notices are advisory
            let _ = event_bus.publish(notice);
        }
    }
}
