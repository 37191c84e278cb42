use std::sync::Arc;

use domain::{Light, OutputId, Result};

use super::DeviceInfo;
use crate::coordinator::Coordinator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    OnOff,
    Brightness,
}

/// Convert a 0-255 brightness to a 0-100 level; a positive brightness never rounds to off.
pub fn brightness_to_level(brightness: u8) -> u8 {
    let level = (u16::from(brightness) * 100 / 255) as u8;
    if brightness > 0 { level.max(1) } else { 0 }
}

pub fn level_to_brightness(level: u8) -> u8 {
    (u16::from(level.min(100)) * 255 / 100) as u8
}

pub struct LightEntity {
    coordinator: Arc<Coordinator>,
    light: Light,
    device: DeviceInfo,
}

impl LightEntity {
    pub fn new(coordinator: Arc<Coordinator>, light: Light, device: DeviceInfo) -> Self {
        Self {
            coordinator,
            light,
            device,
        }
    }

    pub fn unique_id(&self) -> String {
        self.light.id().to_string()
    }

    pub fn name(&self) -> &str {
        self.light.name()
    }

    pub fn id(&self) -> OutputId {
        self.light.id()
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn color_mode(&self) -> ColorMode {
        if self.light.dimmable {
            ColorMode::Brightness
        } else {
            ColorMode::OnOff
        }
    }

    pub fn is_on(&self) -> bool {
        self.coordinator.system().values().is_on(self.id())
    }

    pub fn brightness(&self) -> u8 {
        let level = self
            .coordinator
            .system()
            .values()
            .level(self.id())
            .unwrap_or_default();
        level_to_brightness(level)
    }

    /// Switch on, at `brightness` (0-255) when the light is dimmable
    pub async fn turn_on(&self, brightness: Option<u8>) -> Result<()> {
        let level = match (self.color_mode(), brightness) {
            (ColorMode::Brightness, Some(brightness)) => brightness_to_level(brightness),
            _ => 100,
        };
        let id = self.id();
        self.coordinator
            .system()
            .set_level(id.module, id.index, level)
            .await?;
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
