use std::sync::Arc;

use domain::{Cover, Output, Result};
use tracing::warn;

use super::DeviceInfo;
use crate::coordinator::Coordinator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverFeature {
    Open,
    Close,
    Stop,
}

/// Motorized cover driven through its Up and Down legs.
///
/// The controller gives no position feedback: `is_closed` is always unknown
/// and motion is inferred from whichever leg is energized.
pub struct CoverEntity {
    coordinator: Arc<Coordinator>,
    cover: Cover,
    device: DeviceInfo,
}

impl CoverEntity {
    pub fn new(coordinator: Arc<Coordinator>, cover: Cover, device: DeviceInfo) -> Self {
        Self {
            coordinator,
            cover,
            device,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.cover.unique_id
    }

    pub fn name(&self) -> &str {
        &self.cover.name
    }

    pub fn cover(&self) -> &Cover {
        &self.cover
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn supported_features(&self) -> &'static [CoverFeature] {
        &[CoverFeature::Open, CoverFeature::Close, CoverFeature::Stop]
    }

    pub fn is_closed(&self) -> Option<bool> {
        None
    }

    pub fn is_opening(&self) -> bool {
        self.leg_energized(self.cover.up.as_ref())
    }

    pub fn is_closing(&self) -> bool {
        self.leg_energized(self.cover.down.as_ref())
    }

    fn leg_energized(&self, leg: Option<&Output>) -> bool {
        leg.is_some_and(|leg| self.coordinator.system().values().level(leg.id()) == Some(100))
    }

    /// Release Down, then drive Up
    pub async fn open(&self) -> Result<()> {
        let Some(up) = &self.cover.up else {
            warn!(cover = %self.cover.unique_id, "Cover has no up leg, ignoring open");
            return Ok(());
        };
        if let Some(down) = &self.cover.down {
            self.switch_leg(down, false).await?;
        }
        self.switch_leg(up, true).await?;
        self.coordinator.request_refresh();
        Ok(())
    }

    /// Release Up, then drive Down
    pub async fn close(&self) -> Result<()> {
        let Some(down) = &self.cover.down else {
            warn!(cover = %self.cover.unique_id, "Cover has no down leg, ignoring close");
            return Ok(());
        };
        if let Some(up) = &self.cover.up {
            self.switch_leg(up, false).await?;
        }
        self.switch_leg(down, true).await?;
        self.coordinator.request_refresh();
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        if let Some(up) = &self.cover.up {
            self.switch_leg(up, false).await?;
        }
        if let Some(down) = &self.cover.down {
            self.switch_leg(down, false).await?;
        }
        self.coordinator.request_refresh();
        Ok(())
    }

    async fn switch_leg(&self, leg: &Output, on: bool) -> Result<()> {
        let system = self.coordinator.system();
        if on {
            system.set_on(leg.module_address, leg.index).await
        } else {
            system.set_off(leg.module_address, leg.index).await
        }
    }
}
