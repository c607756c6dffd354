use crate::camera::{Resolution, SurfaceHandle};
use crate::error::EventBusError;
use crate::session::SessionState;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

/// Notifications published by the session controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionNotice {
    /// Session state machine moved between states
    StateChanged {
        from: SessionState,
        to: SessionState,
        timestamp: SystemTime,
    },
    /// A camera instance was opened and configured
    CameraOpened {
        session_id: Uuid,
        device_id: u32,
        resolution: Resolution,
        timestamp: SystemTime,
    },
    /// Opening or configuring a device failed; the controller is back to idle
    OpenFailed {
        device_id: u32,
        error: String,
        timestamp: SystemTime,
    },
    /// Preview streaming started on a surface
    StreamingStarted {
        session_id: Uuid,
        surface: SurfaceHandle,
        timestamp: SystemTime,
    },
    /// Binding the surface or starting the stream failed
    StartFailed {
        session_id: Uuid,
        error: String,
        timestamp: SystemTime,
    },
    /// Preview streaming stopped
    StreamingStopped {
        session_id: Uuid,
        timestamp: SystemTime,
    },
    /// The camera instance was released
    CameraReleased {
        session_id: Uuid,
        timestamp: SystemTime,
    },
}

impl SessionNotice {
    /// Get the timestamp of the notice
    pub fn timestamp(&self) -> SystemTime {
        match self {
            SessionNotice::StateChanged { timestamp, .. }
            | SessionNotice::CameraOpened { timestamp, .. }
            | SessionNotice::OpenFailed { timestamp, .. }
            | SessionNotice::StreamingStarted { timestamp, .. }
            | SessionNotice::StartFailed { timestamp, .. }
            | SessionNotice::StreamingStopped { timestamp, .. }
            | SessionNotice::CameraReleased { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the notice
    pub fn description(&self) -> String {
        match self {
            SessionNotice::StateChanged { from, to, .. } => {
                format!("Session state {:?} -> {:?}", from, to)
            }
            SessionNotice::CameraOpened {
                session_id,
                device_id,
                resolution,
                ..
            } => format!(
                "Camera opened for device {} at {} (session {})",
                device_id, resolution, session_id
            ),
            SessionNotice::OpenFailed {
                device_id, error, ..
            } => format!("Failed to open device {}: {}", device_id, error),
            SessionNotice::StreamingStarted {
                session_id,
                surface,
                ..
            } => format!("Streaming started on {} (session {})", surface, session_id),
            SessionNotice::StartFailed {
                session_id, error, ..
            } => format!("Failed to start streaming (session {}): {}", session_id, error),
            SessionNotice::StreamingStopped { session_id, .. } => {
                format!("Streaming stopped (session {})", session_id)
            }
            SessionNotice::CameraReleased { session_id, .. } => {
                format!("Camera released (session {})", session_id)
            }
        }
    }

    /// Get the notice type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionNotice::StateChanged { .. } => "state_changed",
            SessionNotice::CameraOpened { .. } => "camera_opened",
            SessionNotice::OpenFailed { .. } => "open_failed",
            SessionNotice::StreamingStarted { .. } => "streaming_started",
            SessionNotice::StartFailed { .. } => "start_failed",
            SessionNotice::StreamingStopped { .. } => "streaming_stopped",
            SessionNotice::CameraReleased { .. } => "camera_released",
        }
    }
}

/// Broadcast bus carrying session notices to any number of observers
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionNotice>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        Self {
            debug_logging: true,
            ..Self::new(capacity)
        }
    }

    /// Subscribe to notices and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.sender.subscribe()
    }

    /// Publish a notice to all subscribers, returning how many received it
    pub fn publish(&self, notice: SessionNotice) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing notice: {}", notice.description());
        }

        self.sender
            .send(notice)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Notice filter for selective handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all notices
    All,
    /// Accept only specific notice types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&SessionNotice) -> bool),
}

impl EventFilter {
    /// Check if a notice passes this filter
    pub fn matches(&self, notice: &SessionNotice) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&notice.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(notice),
        }
    }
}

/// Notice receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<SessionNotice>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<SessionNotice>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next notice that passes the filter
    pub async fn recv(&mut self) -> Result<SessionNotice, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(notice) => {
                    if self.filter.matches(&notice) {
                        debug!(
                            "Receiver '{}' received notice: {}",
                            self.name,
                            notice.description()
                        );
                        return Ok(notice);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} notices", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive a notice without blocking
    pub fn try_recv(&mut self) -> Result<Option<SessionNotice>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(notice) => {
                    if self.filter.matches(&notice) {
                        return Ok(Some(notice));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} notices", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    fn released() -> SessionNotice {
        SessionNotice::CameraReleased {
            session_id: Uuid::new_v4(),
            timestamp: SystemTime::now(),
        }
    }

    fn state_changed() -> SessionNotice {
        SessionNotice::StateChanged {
            from: SessionState::Idle,
            to: SessionState::Opening,
            timestamp: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        assert_eq!(event_bus.subscriber_count(), 0);

        let mut receiver = event_bus.subscribe();
        let _second = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 2);

        let notice = state_changed();
        let published_at = notice.timestamp();
        let delivered = event_bus.publish(notice).unwrap();
        assert_eq!(delivered, 2);

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.timestamp(), published_at);
        match received {
            SessionNotice::StateChanged { from, to, .. } => {
                assert_eq!(from, SessionState::Idle);
                assert_eq!(to, SessionState::Opening);
            }
            other => panic!("Unexpected notice: {:?}", other),
        }

        drop(receiver);
        assert_eq!(event_bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_fails() {
        let event_bus = EventBus::new(10);
        assert!(!event_bus.has_subscribers());
        assert!(matches!(
            event_bus.publish(released()),
            Err(EventBusError::PublishFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::with_debug_logging(10);
        let mut receiver = EventReceiver::new(
            event_bus.subscribe(),
            EventFilter::EventTypes(vec!["camera_released"]),
            "test".to_string(),
        );

        event_bus.publish(state_changed()).unwrap();
        event_bus.publish(released()).unwrap();

        let notice = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notice.event_type(), "camera_released");
        assert!(receiver.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_custom_filter() {
        let filter = EventFilter::Custom(|notice| {
            matches!(
                notice,
                SessionNotice::StateChanged {
                    to: SessionState::Destroyed,
                    ..
                }
            )
        });

        assert!(!filter.matches(&state_changed()));
        assert!(filter.matches(&SessionNotice::StateChanged {
            from: SessionState::Configured,
            to: SessionState::Destroyed,
            timestamp: SystemTime::now(),
        }));
        assert!(EventFilter::All.matches(&released()));
    }
}
