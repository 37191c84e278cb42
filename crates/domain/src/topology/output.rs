use serde::{Deserialize, Serialize};

/// Function of a single output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputType {
    /// Switched light
    Relay,
    /// Dimmed light
    Dimmer,
    Fan,
    /// Socket
    Plug,
    /// Upward leg of a motorized cover
    Up,
    /// Downward leg of a motorized cover
    Down,
}

impl OutputType {
    pub fn is_light(&self) -> bool {
        matches!(self, Self::Relay | Self::Dimmer)
    }

    pub fn is_cover_leg(&self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }
}

/// Identity of an output: (module address, 0-based index within the module)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputId {
    pub module: u8,
    pub index: u8,
}

impl OutputId {
    pub fn new(module: u8, index: u8) -> Self {
        Self { module, index }
    }
}

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.module, self.index)
    }
}

/// One controllable point within a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub module_address: u8,
    pub index: u8,
    pub output_type: OutputType,
    /// Protocol-assigned key linking related outputs (cover legs, multi-gang switches)
    pub group_index: u8,
    pub name: String,
}

impl Output {
    pub fn new(
        module_address: u8,
        index: u8,
        output_type: OutputType,
        group_index: u8,
        name: impl Into<String>,
    ) -> Self {
        Self {
            module_address,
            index,
            output_type,
            group_index,
            name: name.into(),
        }
    }

    pub fn id(&self) -> OutputId {
        OutputId::new(self.module_address, self.index)
    }
}
