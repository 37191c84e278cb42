use std::time::Duration;

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Session could not be opened, or dropped mid-operation
    #[error("Connection error: {0}")]
    Connection(String),

    /// Malformed or unexpected controller response
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unknown output {module}.{index}")]
    UnknownOutput { module: u8, index: u8 },

    #[error("Invalid level {0}: must be between 0 and 100")]
    InvalidLevel(u8),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl DomainError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Transport-level failures (as opposed to bad input from the caller)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Protocol(_) | Self::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DomainError::UnknownOutput {
                module: 3,
                index: 7
            }
            .to_string(),
            "Unknown output 3.7"
        );
        assert_eq!(
            DomainError::protocol("bad marker").to_string(),
            "Protocol error: bad marker"
        );
    }

    #[test]
    fn test_transport_classification() {
        assert!(DomainError::connection("refused").is_transport());
        assert!(DomainError::Timeout(Duration::from_secs(10)).is_transport());
        assert!(!DomainError::InvalidLevel(140).is_transport());
    }
}
