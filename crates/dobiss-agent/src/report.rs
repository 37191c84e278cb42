use domain::{OutputId, StateSnapshot, Topology};

/// One output whose level differs between two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelChange {
    pub id: OutputId,
    pub name: String,
    pub from: Option<u8>,
    pub to: u8,
}

pub fn level_changes(
    topology: &Topology,
    previous: &StateSnapshot,
    current: &StateSnapshot,
) -> Vec<LevelChange> {
    topology
        .outputs()
        .iter()
        .filter_map(|output| {
            let id = output.id();
            let to = current.level(id)?;
            let from = previous.level(id);
            (from != Some(to)).then(|| LevelChange {
                id,
                name: output.name.clone(),
                from,
                to,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{Module, ModuleType, Output, OutputType};
    use std::collections::BTreeMap;

    fn snapshot(rows: &[(u8, &[u8])]) -> StateSnapshot {
        let levels: BTreeMap<u8, Vec<u8>> = rows.iter().map(|(m, l)| (*m, l.to_vec())).collect();
        StateSnapshot::new(levels, Utc::now())
    }

    fn topology() -> Topology {
        Topology::new(
            vec![Module::new(1, ModuleType::Relay, 2)],
            vec![
                Output::new(1, 0, OutputType::Relay, 0, "Hall"),
                Output::new(1, 1, OutputType::Relay, 0, "Porch"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_first_snapshot_reports_everything() {
        let changes = level_changes(
            &topology(),
            &StateSnapshot::default(),
            &snapshot(&[(1, &[0, 100])]),
        );
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].from, None);
    }

    #[test]
    fn test_only_changed_outputs() {
        let changes = level_changes(
            &topology(),
            &snapshot(&[(1, &[0, 100])]),
            &snapshot(&[(1, &[100, 100])]),
        );
        assert_eq!(
            changes,
            vec![LevelChange {
                id: OutputId::new(1, 0),
                name: "Hall".to_string(),
                from: Some(0),
                to: 100,
            }]
        );
    }
}
