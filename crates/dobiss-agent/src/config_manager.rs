use std::sync::Arc;

use application::Coordinator;
use infrastructure::AgentConfig;
use tracing::{info, warn};

use crate::cli::Cli;

/// Applies option changes to a running coordinator.
///
/// Only the polling cadence can change at runtime; a different controller
/// address needs a restart. Command-line overrides stay on top of every
/// reloaded layer.
pub struct ConfigManager {
    config_dir: String,
    current: AgentConfig,
    overrides: Cli,
    coordinator: Arc<Coordinator>,
}

impl ConfigManager {
    pub fn new(
        config_dir: String,
        current: AgentConfig,
        overrides: Cli,
        coordinator: Arc<Coordinator>,
    ) -> Self {
        Self {
            config_dir,
            current,
            overrides,
            coordinator,
        }
    }

    pub fn current(&self) -> &AgentConfig {
        &self.current
    }

    /// Reload the config layers. Returns true when a change was applied.
    pub fn reload(&mut self) -> anyhow::Result<bool> {
        let mut next = AgentConfig::load(&self.config_dir)?;
        self.overrides.apply_overrides(&mut next);
        next.validate()?;

        let current = &self.current.controller;
        let next = next.controller;
        if next.host != current.host || next.port != current.port || next.driver != current.driver
        {
            warn!(
                from = %current.endpoint(),
                to = %next.endpoint(),
                "Controller address changed, restart the agent to apply"
            );
        }

        if next.scan_interval_secs == current.scan_interval_secs {
            return Ok(false);
        }

        self.coordinator.set_update_interval(next.scan_interval())?;
        info!(
            from = current.scan_interval_secs,
            to = next.scan_interval_secs,
            "🔧 Scan interval updated"
        );
        self.current.controller.scan_interval_secs = next.scan_interval_secs;
        Ok(true)
    }
}
