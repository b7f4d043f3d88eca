use thiserror::Error;

#[derive(Debug, Error)]
pub enum GembotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel error ({channel}): {reason}")]
    Channel { channel: String, reason: String },
}

impl GembotError {
    /// Short error code string, used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            GembotError::Config(_) => "CONFIG_ERROR",
            GembotError::Channel { .. } => "CHANNEL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, GembotError>;
