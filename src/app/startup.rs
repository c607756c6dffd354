use super::SessionOrchestrator;
use crate::camera::SurfaceHandle;
use crate::error::{EventBusError, Result, UvcError};
use crate::events::{EventFilter, EventReceiver};
use crate::keyboard_input::KeyboardInputHandler;
use crate::monitor::{DeviceSelector, SimulatedMonitor};
use crate::session::{spawn_session, SessionController};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

impl SessionOrchestrator {
    /// Start the session worker, the device monitor and the input side
    pub async fn start(&mut self) -> Result<()> {
        if self.session_worker.is_some() {
            return Err(UvcError::system("Session already started"));
        }

        info!("Starting camera session");

        self.start_notice_logger();

        let controller = SessionController::new(self.camera.clone(), self.config.clone())
            .with_event_bus(Arc::clone(&self.event_bus));
        let (dispatch, worker) =
            spawn_session(controller, self.cancellation_token.child_token());
        self.session_worker = Some(worker);

        let monitor = SimulatedMonitor::with_devices(dispatch.clone(), self.device_count);
        let selector = Arc::new(Mutex::new(DeviceSelector::new(
            monitor,
            dispatch.clone(),
            self.config.session.device_index,
        )));

        if self.keyboard_enabled {
            let handler = Arc::new(KeyboardInputHandler::new(
                Arc::clone(&selector),
                dispatch.clone(),
                self.cancellation_token.clone(),
            ));
            handler.start().await.map_err(|e| {
                error!("Failed to start keyboard input: {}", e);
                e
            })?;
            self.keyboard_handler = Some(handler);
        } else {
            info!("Headless mode: opening the selected camera on surface#1");
            dispatch.on_surface_ready(SurfaceHandle::new(1));
            if selector.lock().open_selected().is_none() {
                warn!("No camera attached");
            }
        }

        self.selector = Some(selector);
        self.dispatch = Some(dispatch);

        info!("Camera session started");
        Ok(())
    }

    fn start_notice_logger(&mut self) {
        let mut receiver = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::All,
            "notice-logger".to_string(),
        );
        let cancellation_token = self.cancellation_token.clone();
        debug!(
            "Notice bus has {} subscribers",
            self.event_bus.subscriber_count()
        );

        self.notice_logger = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancellation_token.cancelled() => break,
                    notice = receiver.recv() => match notice {
                        Ok(notice) => {
                            let delay = SystemTime::now()
                                .duration_since(notice.timestamp())
                                .unwrap_or_default();
                            info!(
                                "Session notice: {} (delivered after {:?})",
                                notice.description(),
                                delay
                            );
                        }
                        Err(EventBusError::Lagged { .. }) => continue,
                        Err(e) => {
                            debug!("Notice logger stopping: {}", e);
                            break;
                        }
                    },
                }
            }
        }));
    }
}
