use serde::{Deserialize, Serialize};

/// Kind of bus module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleType {
    /// On/off relay bank
    Relay,
    /// Phase dimmer bank
    Dimmer,
    /// 0-10V analog output bank
    Volt,
}

impl ModuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relay => "Relay",
            Self::Dimmer => "Dimmer",
            Self::Volt => "Volt",
        }
    }

    /// Relay outputs only know on (100) and off (0)
    pub fn is_relay(&self) -> bool {
        matches!(self, Self::Relay)
    }

    pub fn is_dimmable(&self) -> bool {
        matches!(self, Self::Dimmer | Self::Volt)
    }
}

/// Module as reported by the module listing, before its outputs are known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredModule {
    pub address: u8,
    pub module_type: ModuleType,
}

/// A physical bus unit exposing a fixed set of outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub address: u8,
    pub module_type: ModuleType,
    pub output_count: usize,
}

impl Module {
    pub fn new(address: u8, module_type: ModuleType, output_count: usize) -> Self {
        Self {
            address,
            module_type,
            output_count,
        }
    }
}
