use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use domain::DomainError;
use serde::{Deserialize, Serialize};

use crate::drivers::{LinkKind, TcpLinkConfig};

pub const DEFAULT_PORT: u16 = 10001;
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ControllerConfig {
    #[serde(default)]
    pub driver: LinkKind,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}
fn default_poll_timeout() -> u64 {
    DEFAULT_POLL_TIMEOUT_SECS
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_io_timeout_ms() -> u64 {
    3000
}

impl ControllerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            driver: LinkKind::Tcp,
            host: host.into(),
            port: default_port(),
            scan_interval_secs: default_scan_interval(),
            poll_timeout_secs: default_poll_timeout(),
            connect_timeout_ms: default_connect_timeout_ms(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }

    /// One configuration per controller
    pub fn unique_id(&self) -> String {
        format!("dobiss-{}", self.host)
    }

    /// Display title of the controller entry
    pub fn title(&self) -> String {
        self.endpoint()
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn link_config(&self) -> TcpLinkConfig {
        TcpLinkConfig {
            host: self.host.clone(),
            port: self.port,
            connect_timeout_ms: self.connect_timeout_ms,
            io_timeout_ms: self.io_timeout_ms,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AgentConfig {
    pub controller: ControllerConfig,
}

impl AgentConfig {
    /// Load `<config_dir>/default` (entry data), then `<config_dir>/options`
    /// (options override data), then `DOBISS__*` environment variables.
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("controller.port", i64::from(DEFAULT_PORT))?
            .set_default("controller.scan_interval_secs", DEFAULT_SCAN_INTERVAL_SECS as i64)?
            .set_default("controller.poll_timeout_secs", DEFAULT_POLL_TIMEOUT_SECS as i64)?
            // Entry data; required so the agent never starts without a controller
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            // Options, changed after setup
            .add_source(File::with_name(&format!("{}/options", config_dir)).required(false))
            // Environment variables (e.g. DOBISS__CONTROLLER__HOST=10.0.0.1)
            .add_source(Environment::with_prefix("DOBISS").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let controller = &self.controller;
        if controller.driver == LinkKind::Tcp && controller.host.trim().is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "controller.host is required".to_string(),
            ));
        }
        if controller.port == 0 {
            return Err(DomainError::InvalidConfiguration(
                "controller.port must be positive".to_string(),
            ));
        }
        if controller.scan_interval_secs == 0 {
            return Err(DomainError::InvalidConfiguration(
                "controller.scan_interval_secs must be positive".to_string(),
            ));
        }
        if controller.poll_timeout_secs == 0 {
            return Err(DomainError::InvalidConfiguration(
                "controller.poll_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
