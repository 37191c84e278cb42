//! Infrastructure layer - Controller transports and configuration

pub mod config;
pub mod drivers;

pub use crate::config::{AgentConfig, ControllerConfig};
pub use drivers::{DriverFactory, LinkKind, MockController, TcpControllerLink, TcpLinkConfig};
