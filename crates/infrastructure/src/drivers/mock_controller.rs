use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use domain::driver::{ConnectionState, ControllerLink};
use domain::{DiscoveredModule, DomainError, Module, ModuleType, Output, OutputType};

/// One observable interaction with the mock controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOp {
    Connect,
    Disconnect,
    ListModules,
    ListOutputs(u8),
    ReadLevels(u8),
    WriteLevel { module: u8, index: u8, level: u8 },
}

/// Failures the mock can be told to produce. Faults stay active until cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Refuse new sessions
    Connect,
    /// Drop the session while listing modules
    ListModules,
    /// Answer the output listing of a module with garbage
    ListOutputs(u8),
    /// Drop the session while reading a module's levels
    ReadLevels(u8),
    /// Answer a module's status with fewer channels than it has
    ShortStatus(u8),
    /// Pad a module's status with unused 0xFF channels
    LongStatus(u8),
    /// Never confirm writes
    WriteLevel,
}

#[derive(Default)]
struct MockState {
    modules: BTreeMap<u8, (ModuleType, Vec<Output>)>,
    levels: BTreeMap<u8, Vec<u8>>,
    ops: Vec<LinkOp>,
    faults: Vec<Fault>,
    read_delay: Option<Duration>,
    session_open: bool,
}

impl MockState {
    fn has_fault(&self, fault: &Fault) -> bool {
        self.faults.contains(fault)
    }
}

/// In-memory controller. Clones share the same controller, so a clone can
/// act as a competing client: like the real hardware, only one session may
/// be open at a time.
#[derive(Clone, Default)]
pub struct MockController {
    state: Arc<Mutex<MockState>>,
    link_state: ConnectionState,
}

impl MockController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small installation used by the simulator driver
    pub fn demo() -> Self {
        let controller = Self::new();
        controller.add_module(
            1,
            ModuleType::Relay,
            vec![
                (OutputType::Relay, 0, "Hall"),
                (OutputType::Relay, 0, "Porch"),
                (OutputType::Fan, 0, "Bathroom fan"),
                (OutputType::Plug, 0, "Garage socket"),
                (OutputType::Up, 1, "Living up"),
                (OutputType::Down, 1, "Living down"),
                (OutputType::Up, 2, "Kitchen Up"),
                (OutputType::Down, 3, "Kitchen Down"),
            ],
        );
        controller.add_module(
            2,
            ModuleType::Dimmer,
            vec![
                (OutputType::Dimmer, 0, "Dining"),
                (OutputType::Dimmer, 0, "Bedroom"),
            ],
        );
        controller.add_module(3, ModuleType::Relay, vec![]);
        controller
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install (or replace) a module; outputs are numbered in order
    pub fn add_module(
        &self,
        address: u8,
        module_type: ModuleType,
        outputs: Vec<(OutputType, u8, &str)>,
    ) {
        let outputs: Vec<Output> = outputs
            .into_iter()
            .enumerate()
            .map(|(index, (output_type, group, name))| {
                Output::new(address, index as u8, output_type, group, name)
            })
            .collect();
        let mut state = self.lock();
        state.levels.insert(address, vec![0; outputs.len()]);
        state.modules.insert(address, (module_type, outputs));
    }

    pub fn remove_module(&self, address: u8) {
        let mut state = self.lock();
        state.modules.remove(&address);
        state.levels.remove(&address);
    }

    /// Change a level behind the driver's back (e.g. a wall switch)
    pub fn set_level(&self, address: u8, index: u8, level: u8) {
        if let Some(levels) = self.lock().levels.get_mut(&address) {
            if let Some(slot) = levels.get_mut(usize::from(index)) {
                *slot = level;
            }
        }
    }

    pub fn level(&self, address: u8, index: u8) -> Option<u8> {
        self.lock()
            .levels
            .get(&address)
            .and_then(|levels| levels.get(usize::from(index)).copied())
    }

    pub fn inject(&self, fault: Fault) {
        self.lock().faults.push(fault);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Delay every status read, to widen race windows in tests
    pub fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = Some(delay);
    }

    pub fn ops(&self) -> Vec<LinkOp> {
        self.lock().ops.clone()
    }

    pub fn writes(&self) -> Vec<LinkOp> {
        self.ops()
            .into_iter()
            .filter(|op| matches!(op, LinkOp::WriteLevel { .. }))
            .collect()
    }

    pub fn clear_ops(&self) {
        self.lock().ops.clear();
    }

    /// True while any clone holds the controller's single session
    pub fn session_open(&self) -> bool {
        self.lock().session_open
    }

    fn begin(&self, op: LinkOp) -> Result<MutexGuard<'_, MockState>, DomainError> {
        if !self.link_state.is_connected() {
            return Err(DomainError::connection("not connected"));
        }
        let mut state = self.lock();
        state.ops.push(op);
        Ok(state)
    }
}

#[async_trait]
impl ControllerLink for MockController {
    async fn connect(&mut self) -> Result<(), DomainError> {
        if self.link_state.is_connected() {
            return Ok(());
        }
        self.link_state = self.link_state.to_connecting()?;

        let refused = {
            let mut state = self.lock();
            if state.has_fault(&Fault::Connect) {
                Some("connection refused")
            } else if state.session_open {
                Some("controller busy with another client")
            } else {
                state.session_open = true;
                state.ops.push(LinkOp::Connect);
                None
            }
        };
        if let Some(reason) = refused {
            self.link_state = self.link_state.to_failed();
            return Err(DomainError::connection(reason));
        }

        self.link_state = self.link_state.to_connected()?;
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.link_state.is_connected() {
            let mut state = self.lock();
            state.session_open = false;
            state.ops.push(LinkOp::Disconnect);
        }
        self.link_state = self.link_state.to_disconnected();
    }

    fn is_connected(&self) -> bool {
        self.link_state.is_connected()
    }

    fn connection_state(&self) -> ConnectionState {
        self.link_state
    }

    fn endpoint(&self) -> &str {
        "simulator:10001"
    }

    async fn list_modules(&mut self) -> Result<Vec<DiscoveredModule>, DomainError> {
        let state = self.begin(LinkOp::ListModules)?;
        if state.has_fault(&Fault::ListModules) {
            return Err(DomainError::connection("connection reset by controller"));
        }
        Ok(state
            .modules
            .iter()
            .map(|(address, (module_type, _))| DiscoveredModule {
                address: *address,
                module_type: *module_type,
            })
            .collect())
    }

    async fn list_outputs(
        &mut self,
        module: &DiscoveredModule,
    ) -> Result<Vec<Output>, DomainError> {
        let state = self.begin(LinkOp::ListOutputs(module.address))?;
        if state.has_fault(&Fault::ListOutputs(module.address)) {
            return Err(DomainError::protocol("unknown output type 42"));
        }
        Ok(state
            .modules
            .get(&module.address)
            .map(|(_, outputs)| outputs.clone())
            .unwrap_or_default())
    }

    async fn read_levels(&mut self, module: &Module) -> Result<Vec<u8>, DomainError> {
        let delay = {
            let state = self.begin(LinkOp::ReadLevels(module.address))?;
            state.read_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.lock();
        if state.has_fault(&Fault::ReadLevels(module.address)) {
            return Err(DomainError::connection("connection reset by controller"));
        }
        let mut levels = state
            .levels
            .get(&module.address)
            .cloned()
            .ok_or_else(|| DomainError::protocol(format!("no module {}", module.address)))?;
        if state.has_fault(&Fault::ShortStatus(module.address)) {
            levels.pop();
        }
        if state.has_fault(&Fault::LongStatus(module.address)) {
            levels.extend([0xFF, 0xFF]);
        }
        Ok(levels)
    }

    async fn write_level(
        &mut self,
        module: &Module,
        index: u8,
        level: u8,
    ) -> Result<(), DomainError> {
        let mut state = self.begin(LinkOp::WriteLevel {
            module: module.address,
            index,
            level,
        })?;
        if state.has_fault(&Fault::WriteLevel) {
            return Err(DomainError::protocol("action not confirmed"));
        }
        if let Some(slot) = state
            .levels
            .get_mut(&module.address)
            .and_then(|levels| levels.get_mut(usize::from(index)))
        {
            *slot = level;
        }
        Ok(())
    }
}
