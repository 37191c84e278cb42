use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info};

use domain::driver::ControllerLink;
use domain::{
    Cover, DomainError, Fan, Light, Module, Output, OutputId, Result, StateSnapshot, Switch,
    Topology,
};
use infrastructure::{ControllerConfig, DriverFactory};

/// One open controller session.
///
/// Holds the link lock for the whole logical operation and disconnects on
/// drop, so the session is released on every exit path, including a caller
/// timeout that cancels the operation mid-exchange.
struct Session<'a> {
    link: MutexGuard<'a, Box<dyn ControllerLink>>,
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.link.disconnect();
    }
}

/// Driver for one Dobiss controller.
///
/// Owns the link and the cached topology/state. Every operation (import,
/// poll, command) opens a session, does its work and closes it again, since
/// the controller only allows one client at a time.
pub struct DobissSystem {
    link: Mutex<Box<dyn ControllerLink>>,
    endpoint: String,
    topology: watch::Sender<Arc<Topology>>,
    values: watch::Sender<Arc<StateSnapshot>>,
}

impl DobissSystem {
    pub fn new(link: Box<dyn ControllerLink>) -> Self {
        let endpoint = link.endpoint().to_string();
        let (topology, _) = watch::channel(Arc::new(Topology::default()));
        let (values, _) = watch::channel(Arc::new(StateSnapshot::default()));
        Self {
            link: Mutex::new(link),
            endpoint,
            topology,
            values,
        }
    }

    /// Build the driver for the link configured in `config`
    pub fn from_config(config: &ControllerConfig) -> Result<Self> {
        let link = DriverFactory::create_link(config.driver, config.link_config())?;
        Ok(Self::new(link))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn open_session(&self) -> Result<Session<'_>> {
        let mut session = Session {
            link: self.link.lock().await,
        };
        session.link.connect().await?;
        Ok(session)
    }

    /// Open and release one session
    pub async fn check_connection(&self) -> Result<()> {
        let session = self.open_session().await?;
        drop(session);
        debug!(endpoint = %self.endpoint, "Connection check succeeded");
        Ok(())
    }

    /// Discover all modules and their outputs, replacing the topology.
    ///
    /// The import is all-or-nothing: on any failure the previous topology
    /// stays published untouched.
    pub async fn import_full_installation(&self) -> Result<Arc<Topology>> {
        let mut session = self.open_session().await?;

        let discovered = session.link.list_modules().await?;
        let mut modules = Vec::with_capacity(discovered.len());
        let mut outputs: Vec<Output> = Vec::new();

        for module in &discovered {
            let module_outputs = session.link.list_outputs(module).await?;
            if module_outputs.is_empty() {
                debug!(module = module.address, "Module reports no outputs, skipping");
                continue;
            }

            let output_count = module_outputs
                .iter()
                .map(|o| usize::from(o.index) + 1)
                .max()
                .unwrap_or_default();
            modules.push(Module::new(module.address, module.module_type, output_count));
            outputs.extend(module_outputs);
        }

        let topology = Arc::new(Topology::new(modules, outputs)?);

        // Publish before releasing the session so no poll sees the old topology
        // with a snapshot filtered for the new one.
        self.topology.send_replace(topology.clone());
        let retained = self.values.borrow().retain_matching(&topology);
        self.values.send_if_modified(|current| {
            if **current != retained {
                *current = Arc::new(retained);
                true
            } else {
                false
            }
        });
        drop(session);

        info!(
            endpoint = %self.endpoint,
            modules = topology.modules().len(),
            outputs = topology.outputs().len(),
            lights = topology.lights().len(),
            covers = topology.covers().len(),
            "Installation imported"
        );
        Ok(topology)
    }

    /// Read the levels of every known module and publish them as one snapshot.
    ///
    /// Any failure aborts the poll; the previous snapshot stays current.
    pub async fn request_all_status(&self) -> Result<Arc<StateSnapshot>> {
        let mut session = self.open_session().await?;
        // Read under the session lock: an import cannot swap it mid-poll
        let topology = self.topology();

        let mut levels = BTreeMap::new();
        for module in topology.modules() {
            let mut reading = session.link.read_levels(module).await?;
            if reading.len() < module.output_count {
                return Err(DomainError::protocol(format!(
                    "module {} reported {} levels, expected {}",
                    module.address,
                    reading.len(),
                    module.output_count
                )));
            }
            reading.truncate(module.output_count);
            if let Some(level) = reading.iter().find(|level| **level > 100) {
                return Err(DomainError::protocol(format!(
                    "module {} reported level {}",
                    module.address, level
                )));
            }
            levels.insert(module.address, reading);
        }

        let snapshot = Arc::new(StateSnapshot::new(levels, Utc::now()));
        self.values.send_replace(snapshot.clone());
        drop(session);

        debug!(endpoint = %self.endpoint, modules = topology.modules().len(), "Status polled");
        Ok(snapshot)
    }

    /// Write one output level (0-100).
    ///
    /// Outputs on relay modules are switched fully on for any positive
    /// level. The cache is not refreshed; poll to observe the effect.
    pub async fn set_level(&self, module: u8, index: u8, level: u8) -> Result<()> {
        if level > 100 {
            return Err(DomainError::InvalidLevel(level));
        }

        let topology = self.topology();
        let unknown = DomainError::UnknownOutput { module, index };
        if topology.output(OutputId::new(module, index)).is_none() {
            return Err(unknown);
        }
        let target = topology.module(module).cloned().ok_or(unknown)?;
        let level = if target.module_type.is_relay() && level > 0 {
            100
        } else {
            level
        };

        let mut session = self.open_session().await?;
        session.link.write_level(&target, index, level).await?;
        drop(session);

        debug!(output = %OutputId::new(module, index), level, "Level written");
        Ok(())
    }

    pub async fn set_on(&self, module: u8, index: u8) -> Result<()> {
        self.set_level(module, index, 100).await
    }

    pub async fn set_off(&self, module: u8, index: u8) -> Result<()> {
        self.set_level(module, index, 0).await
    }

    /// Last imported topology (empty before the first import)
    pub fn topology(&self) -> Arc<Topology> {
        self.topology.borrow().clone()
    }

    /// Last complete snapshot (empty before the first poll)
    pub fn values(&self) -> Arc<StateSnapshot> {
        self.values.borrow().clone()
    }

    pub fn subscribe_topology(&self) -> watch::Receiver<Arc<Topology>> {
        self.topology.subscribe()
    }

    pub fn subscribe_values(&self) -> watch::Receiver<Arc<StateSnapshot>> {
        self.values.subscribe()
    }

    pub fn modules(&self) -> Vec<Module> {
        self.topology().modules().to_vec()
    }

    pub fn outputs(&self) -> Vec<Output> {
        self.topology().outputs().to_vec()
    }

    pub fn lights(&self) -> Vec<Light> {
        self.topology().lights().to_vec()
    }

    pub fn fans(&self) -> Vec<Fan> {
        self.topology().fans().to_vec()
    }

    pub fn switches(&self) -> Vec<Switch> {
        self.topology().switches().to_vec()
    }

    pub fn covers(&self) -> Vec<Cover> {
        self.topology().covers().to_vec()
    }
}
