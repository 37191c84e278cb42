use serde::{Deserialize, Serialize};

use super::output::{Output, OutputId};

/// Light backed by one relay or dimmer output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Light {
    pub output: Output,
    /// True when the owning module can drive intermediate levels
    pub dimmable: bool,
}

impl Light {
    pub fn id(&self) -> OutputId {
        self.output.id()
    }

    pub fn name(&self) -> &str {
        &self.output.name
    }
}

/// Fan backed by one output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fan {
    pub output: Output,
}

impl Fan {
    pub fn id(&self) -> OutputId {
        self.output.id()
    }

    pub fn name(&self) -> &str {
        &self.output.name
    }
}

/// Switched socket backed by one output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Switch {
    pub output: Output,
}

impl Switch {
    pub fn id(&self) -> OutputId {
        self.output.id()
    }

    pub fn name(&self) -> &str {
        &self.output.name
    }
}
