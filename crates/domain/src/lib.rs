//! Domain layer - Pure model of a Dobiss installation
//!
//! This crate contains:
//! - Topology (modules, outputs, derived lights/fans/switches/covers)
//! - Cover pairing
//! - State snapshots
//! - The controller link interface (trait) and its connection state
//!
//! No I/O happens here; transports live in `infrastructure`.

pub mod driver;
pub mod error;
pub mod snapshot;
pub mod topology;

// Re-export commonly used types
pub use driver::{ConnectionState, ControllerLink};
pub use error::{DomainError, Result};
pub use snapshot::StateSnapshot;
pub use topology::{
    Cover, DiscoveredModule, Fan, Light, Module, ModuleType, Output, OutputId, OutputType,
    Switch, Topology,
};
