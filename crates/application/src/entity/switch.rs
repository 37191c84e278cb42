use std::sync::Arc;

use domain::{OutputId, Result, Switch};

use super::DeviceInfo;
use crate::coordinator::Coordinator;

/// Switchable socket
pub struct SwitchEntity {
    coordinator: Arc<Coordinator>,
    switch: Switch,
    device: DeviceInfo,
}

impl SwitchEntity {
    pub fn new(coordinator: Arc<Coordinator>, switch: Switch, device: DeviceInfo) -> Self {
        Self {
            coordinator,
            switch,
            device,
        }
    }

    pub fn unique_id(&self) -> String {
        self.switch.id().to_string()
    }

    pub fn name(&self) -> &str {
        self.switch.name()
    }

    pub fn id(&self) -> OutputId {
        self.switch.id()
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn is_on(&self) -> bool {
        self.coordinator.system().values().is_on(self.id())
    }

    pub async fn turn_on(&self) -> Result<()> {
        let id = self.id();
        self.coordinator.system().set_on(id.module, id.index).await?;
        self.coordinator.request_refresh();
        Ok(())
    }

    pub async fn turn_off(&self) -> Result<()> {
        let id = self.id();
        self.coordinator.system().set_off(id.module, id.index).await?;
        self.coordinator.request_refresh();
        Ok(())
    }
}
