use std::sync::Arc;

use domain::{Fan, OutputId, Result};

use super::DeviceInfo;
use crate::coordinator::Coordinator;

pub struct FanEntity {
    coordinator: Arc<Coordinator>,
    fan: Fan,
    device: DeviceInfo,
}

impl FanEntity {
    pub fn new(coordinator: Arc<Coordinator>, fan: Fan, device: DeviceInfo) -> Self {
        Self {
            coordinator,
            fan,
            device,
        }
    }

    pub fn unique_id(&self) -> String {
        self.fan.id().to_string()
    }

    pub fn name(&self) -> &str {
        self.fan.name()
    }

    pub fn id(&self) -> OutputId {
        self.fan.id()
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
