/// Result alias that carries the custom [`TunerError`] type.
pub type Result<T> = std::result::Result<T, TunerError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum TunerError {
    /// The startup configuration is unusable. Raised before the poll loop
    /// starts and always fatal.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// An ADC channel outside `0..=7` was requested.
    #[error("ADC channel {0} is out of range (expected 0-7)")]
    InvalidChannel(u8),
    /// An external collaborator (indicator, player, announcer) refused a
    /// command. The action layer logs these and carries on.
    #[error("{what} failed: {reason}")]
    Collaborator { what: &'static str, reason: String },
    /// A bus or pin transfer failed (SPI, I2C or GPIO).
    #[error("{what}: {reason}")]
    Bus { what: &'static str, reason: String },
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed configuration file.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl TunerError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Shorthand for a [`TunerError::Config`] error.
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn collaborator(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Collaborator {
            what,
            reason: reason.into(),
        }
    }

    pub fn bus(what: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Bus {
            what,
            reason: reason.to_string(),
        }
    }

    /// Returns `true` for errors that must stop the process at startup.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<&str> for TunerError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for TunerError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
