use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::topology::{OutputId, Topology};

/// One complete, internally consistent reading of all output levels.
///
/// Maps module address to the levels (0-100) of its outputs, in index order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    levels: BTreeMap<u8, Vec<u8>>,
    taken_at: Option<DateTime<Utc>>,
}

impl StateSnapshot {
    pub fn new(levels: BTreeMap<u8, Vec<u8>>, taken_at: DateTime<Utc>) -> Self {
        Self {
            levels,
            taken_at: Some(taken_at),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &BTreeMap<u8, Vec<u8>> {
        &self.levels
    }

    pub fn module_levels(&self, address: u8) -> Option<&[u8]> {
        self.levels.get(&address).map(Vec::as_slice)
    }

    pub fn level(&self, id: OutputId) -> Option<u8> {
        self.module_levels(id.module)?
            .get(usize::from(id.index))
            .copied()
    }

    /// Missing rows read as off
    pub fn is_on(&self, id: OutputId) -> bool {
        self.level(id).is_some_and(|level| level > 0)
    }

    /// None until the first successful poll
    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.taken_at
    }

    /// Keep only rows still consistent with `topology` (same module, same output count).
    pub fn retain_matching(&self, topology: &Topology) -> Self {
        let levels = self
            .levels
            .iter()
            .filter(|(address, levels)| {
                topology
                    .module(**address)
                    .is_some_and(|m| m.output_count == levels.len())
            })
            .map(|(address, levels)| (*address, levels.clone()))
            .collect();

        Self {
            levels,
            taken_at: self.taken_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Module, ModuleType};

    fn snapshot() -> StateSnapshot {
        let mut levels = BTreeMap::new();
        levels.insert(1, vec![0, 100, 0]);
        levels.insert(2, vec![45]);
        StateSnapshot::new(levels, Utc::now())
    }

    #[test]
    fn test_level_lookup() {
        let snap = snapshot();
        assert_eq!(snap.level(OutputId::new(1, 1)), Some(100));
        assert_eq!(snap.level(OutputId::new(2, 0)), Some(45));
        assert_eq!(snap.level(OutputId::new(1, 5)), None);
        assert_eq!(snap.level(OutputId::new(9, 0)), None);
    }

    #[test]
    fn test_is_on() {
        let snap = snapshot();
        assert!(snap.is_on(OutputId::new(1, 1)));
        assert!(!snap.is_on(OutputId::new(1, 0)));
        assert!(!snap.is_on(OutputId::new(7, 3)));
    }

    #[test]
    fn test_default_is_empty() {
        let snap = StateSnapshot::default();
        assert!(snap.is_empty());
        assert!(snap.taken_at().is_none());
    }

    #[test]
    fn test_retain_matching_drops_stale_rows() {
        let topology = Topology::new(
            vec![
                Module::new(1, ModuleType::Relay, 3),
                Module::new(2, ModuleType::Dimmer, 2),
            ],
            vec![],
        )
        .unwrap();

        let kept = snapshot().retain_matching(&topology);
        assert_eq!(kept.module_levels(1), Some(&[0, 100, 0][..]));
        assert!(kept.module_levels(2).is_none());
    }
}
