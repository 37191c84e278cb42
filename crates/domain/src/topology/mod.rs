mod cover;
mod descriptor;
mod module;
mod output;

pub use cover::{Cover, normalized_name, pair_covers, strip_direction_suffix};
pub use descriptor::{Fan, Light, Switch};
pub use module::{DiscoveredModule, Module, ModuleType};
pub use output::{Output, OutputId, OutputType};

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{DomainError, Result};

/// Installed hardware as discovered by an import.
///
/// Immutable once built; a re-import replaces the whole value. Derived
/// descriptors (lights, fans, switches, covers) are computed in [`Topology::new`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Topology {
    modules: Vec<Module>,
    outputs: Vec<Output>,
    lights: Vec<Light>,
    fans: Vec<Fan>,
    switches: Vec<Switch>,
    covers: Vec<Cover>,
}

impl Topology {
    /// Validate the raw tables and derive the descriptor lists.
    ///
    /// Fails with [`DomainError::Protocol`] when the controller reported an
    /// inconsistent installation (duplicate addresses or outputs, outputs
    /// outside their module).
    pub fn new(mut modules: Vec<Module>, mut outputs: Vec<Output>) -> Result<Self> {
        modules.sort_by_key(|m| m.address);
        if let Some(pair) = modules.windows(2).find(|w| w[0].address == w[1].address) {
            return Err(DomainError::protocol(format!(
                "module address {} reported twice",
                pair[0].address
            )));
        }

        let mut seen = HashSet::new();
        for output in &outputs {
            let module = modules
                .iter()
                .find(|m| m.address == output.module_address)
                .ok_or_else(|| {
                    DomainError::protocol(format!(
                        "output {} belongs to unknown module",
                        output.id()
                    ))
                })?;

            if usize::from(output.index) >= module.output_count {
                return Err(DomainError::protocol(format!(
                    "output {} outside module with {} outputs",
                    output.id(),
                    module.output_count
                )));
            }

            if !seen.insert(output.id()) {
                return Err(DomainError::protocol(format!(
                    "output {} reported twice",
                    output.id()
                )));
            }
        }
        outputs.sort_by_key(|o| o.id());

        let lights = outputs
            .iter()
            .filter(|o| o.output_type.is_light())
            .map(|o| Light {
                output: o.clone(),
                dimmable: modules
                    .iter()
                    .find(|m| m.address == o.module_address)
                    .is_some_and(|m| m.module_type.is_dimmable()),
            })
            .collect();

        let fans = outputs
            .iter()
            .filter(|o| o.output_type == OutputType::Fan)
            .map(|o| Fan { output: o.clone() })
            .collect();

        let switches = outputs
            .iter()
            .filter(|o| o.output_type == OutputType::Plug)
            .map(|o| Switch { output: o.clone() })
            .collect();

        let covers = pair_covers(&outputs);

        Ok(Self {
            modules,
            outputs,
            lights,
            fans,
            switches,
            covers,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules sorted by address
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, address: u8) -> Option<&Module> {
        self.modules.iter().find(|m| m.address == address)
    }

    /// Outputs sorted by (module, index)
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.iter().find(|o| o.id() == id)
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn fans(&self) -> &[Fan] {
        &self.fans
    }

    pub fn switches(&self) -> &[Switch] {
        &self.switches
    }

    pub fn covers(&self) -> &[Cover] {
        &self.covers
    }

    pub fn cover(&self, unique_id: &str) -> Option<&Cover> {
        self.covers.iter().find(|c| c.unique_id == unique_id)
    }
}
