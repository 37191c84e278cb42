use async_trait::async_trait;

use super::connection_state::ConnectionState;
use crate::error::DomainError;
use crate::topology::{DiscoveredModule, Module, Output};

/// Transport session to a Dobiss controller, speaking the vendor protocol.
///
/// The controller accepts a single session at a time. Implementations only
/// carry one session; callers decide how long it stays open and must never
/// share it between two logical operations.
#[async_trait]
pub trait ControllerLink: Send + Sync {
    /// Open the session. Fails with [`DomainError::Connection`] on refusal or timeout.
    async fn connect(&mut self) -> Result<(), DomainError>;

    /// Close the session. Idempotent; runs from drop guards, so it cannot block or fail.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn connection_state(&self) -> ConnectionState;

    /// Human-readable remote address, e.g. `192.168.1.118:10001`
    fn endpoint(&self) -> &str;

    /// Enumerate the modules installed on the bus
    async fn list_modules(&mut self) -> Result<Vec<DiscoveredModule>, DomainError>;

    /// Enumerate the outputs of one module
    async fn list_outputs(
        &mut self,
        module: &DiscoveredModule,
    ) -> Result<Vec<Output>, DomainError>;

    /// Read the current level (0-100) of every channel of a module
    async fn read_levels(&mut self, module: &Module) -> Result<Vec<u8>, DomainError>;

    /// Write one output level and wait for the controller's confirmation
    async fn write_level(
        &mut self,
        module: &Module,
        index: u8,
        level: u8,
    ) -> Result<(), DomainError>;
}
