use thiserror::Error;

#[derive(Error, Debug)]
pub enum UvcError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera binding error: {0}")]
    Binding(#[from] BindingError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("Device index {index} out of range ({available} devices available)")]
    InvalidSelection { index: usize, available: usize },

    #[error("System error: {message}")]
    System { message: String },
}

impl UvcError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// Failures reported by a camera device binding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("Unsupported operation: {details}")]
    Unsupported { details: String },

    #[error("Invalid argument: {details}")]
    InvalidArgument { details: String },

    #[error("Device transport failure: {details}")]
    Transport { details: String },
}

impl BindingError {
    pub fn unsupported<S: Into<String>>(details: S) -> Self {
        Self::Unsupported {
            details: details.into(),
        }
    }

    pub fn invalid_argument<S: Into<String>>(details: S) -> Self {
        Self::InvalidArgument {
            details: details.into(),
        }
    }

    pub fn transport<S: Into<String>>(details: S) -> Self {
        Self::Transport {
            details: details.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Receiver lagged behind by {skipped} events")]
    Lagged { skipped: u64 },

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, UvcError>;
