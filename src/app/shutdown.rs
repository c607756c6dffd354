use super::SessionOrchestrator;
use crate::error::Result;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

impl SessionOrchestrator {
    /// Stop input, then let the session worker release the camera
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        // Cancels the session worker too; it releases any live camera on the way out
        self.cancellation_token.cancel();

        let mut exit_code = 0;

        if let Some(handler) = self.keyboard_handler.take() {
            if let Err(e) = handler.stop().await {
                error!("Error stopping keyboard: {}", e);
                exit_code = 1;
            }
        }

        self.selector.take();
        self.dispatch.take();

        if let Some(worker) = self.session_worker.take() {
            match timeout(Duration::from_secs(10), worker).await {
                Ok(Ok(controller)) => {
                    info!("Camera session closed in state {:?}", controller.state());
                }
                Ok(Err(e)) => {
                    error!("Session worker failed: {}", e);
                    exit_code = 1;
                }
                Err(_) => {
                    error!("Session worker stop timeout");
                    exit_code = 1;
                }
            }
        }

        if let Some(logger) = self.notice_logger.take() {
            if timeout(Duration::from_secs(1), logger).await.is_err() {
                warn!("Notice logger did not stop in time");
            }
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }
}
