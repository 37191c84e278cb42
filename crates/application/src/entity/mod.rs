//! Presentation entities built from the imported topology.
//!
//! Entities hold the coordinator explicitly; they read state from the cached
//! snapshot and ask for a refresh after every command.

mod cover;
mod fan;
mod light;
mod switch;

pub use cover::{CoverEntity, CoverFeature};
pub use fan::FanEntity;
pub use light::{ColorMode, LightEntity};
pub use switch::SwitchEntity;

use std::sync::Arc;

use serde::Serialize;

use crate::coordinator::Coordinator;

pub const MANUFACTURER: &str = "Dobiss";

/// Device every entity of one controller belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
}

impl DeviceInfo {
    /// Build from a `host:port` endpoint
    pub fn from_endpoint(endpoint: &str) -> Self {
        let host = endpoint
            .rsplit_once(':')
            .map_or(endpoint, |(host, _)| host);
        Self {
            identifier: endpoint.to_string(),
            name: format!("Dobiss Controller {}", host),
            manufacturer: MANUFACTURER.to_string(),
        }
    }
}

/// All entities of one controller
#[derive(Default)]
pub struct Entities {
    pub lights: Vec<LightEntity>,
    pub fans: Vec<FanEntity>,
    pub switches: Vec<SwitchEntity>,
    pub covers: Vec<CoverEntity>,
}

impl Entities {
    pub fn len(&self) -> usize {
        self.lights.len() + self.fans.len() + self.switches.len() + self.covers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build entities for the currently published topology
pub fn build_entities(coordinator: &Arc<Coordinator>) -> Entities {
    let topology = coordinator.system().topology();
    let device = DeviceInfo::from_endpoint(coordinator.system().endpoint());

    Entities {
        lights: topology
            .lights()
            .iter()
            .map(|light| LightEntity::new(coordinator.clone(), light.clone(), device.clone()))
            .collect(),
        fans: topology
            .fans()
            .iter()
            .map(|fan| FanEntity::new(coordinator.clone(), fan.clone(), device.clone()))
            .collect(),
        switches: topology
            .switches()
            .iter()
            .map(|switch| SwitchEntity::new(coordinator.clone(), switch.clone(), device.clone()))
            .collect(),
        covers: topology
            .covers()
            .iter()
            .map(|cover| CoverEntity::new(coordinator.clone(), cover.clone(), device.clone()))
            .collect(),
    }
}
