use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// State of a controller link's transport session.
///
/// `disconnect()` always returns a link to `Disconnected`, including one
/// whose connect attempt was abandoned half-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No session open
    #[default]
    Disconnected,
    /// Session being opened
    Connecting,
    /// Session open and usable
    Connected,
    /// Last open attempt or exchange failed; the session is gone
    Failed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Start opening a session. Only idle or failed links may do so.
    pub fn to_connecting(&self) -> Result<Self, DomainError> {
        match self {
            Self::Disconnected | Self::Failed => Ok(Self::Connecting),
            other => Err(DomainError::connection(format!(
                "cannot open a session while {:?}",
                other
            ))),
        }
    }

    pub fn to_connected(&self) -> Result<Self, DomainError> {
        match self {
            Self::Connecting => Ok(Self::Connected),
            other => Err(DomainError::connection(format!(
                "session opened while {:?}",
                other
            ))),
        }
    }

    pub fn to_disconnected(&self) -> Self {
        Self::Disconnected
    }

    pub fn to_failed(&self) -> Self {
        Self::Failed
    }
}
