//! Pairing of one-directional Up/Down outputs into bidirectional covers.
//!
//! Pairing runs in three passes:
//! 1. outputs sharing `(module_address, group_index)` pair up, by equal
//!    normalized name first and then by ascending index;
//! 2. leftovers pair on normalized name, inside one module first and then
//!    across modules;
//! 3. whatever is still alone becomes a single-direction cover.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::output::{Output, OutputType};

/// Motorized cover made of up to two legs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cover {
    pub unique_id: String,
    pub name: String,
    pub module_address: u8,
    pub up: Option<Output>,
    pub down: Option<Output>,
}

impl Cover {
    pub fn paired(up: Output, down: Output) -> Self {
        Self::build(up.module_address, Some(up), Some(down))
    }

    pub fn up_only(up: Output) -> Self {
        Self::build(up.module_address, Some(up), None)
    }

    pub fn down_only(down: Output) -> Self {
        Self::build(down.module_address, None, Some(down))
    }

    fn build(module_address: u8, up: Option<Output>, down: Option<Output>) -> Self {
        let mut parts = vec![module_address.to_string()];
        if let Some(up) = &up {
            parts.push(format!("U{}", up.index));
        }
        if let Some(down) = &down {
            if down.module_address != module_address {
                parts.push(down.module_address.to_string());
            }
            parts.push(format!("D{}", down.index));
        }

        let source_name = up
            .as_ref()
            .or(down.as_ref())
            .map(|o| o.name.as_str())
            .unwrap_or_default();
        let base = strip_direction_suffix(source_name);
        let name = if base.is_empty() {
            "Cover".to_string()
        } else {
            base.to_string()
        };

        Self {
            unique_id: parts.join("."),
            name,
            module_address,
            up,
            down,
        }
    }

    pub fn is_paired(&self) -> bool {
        self.up.is_some() && self.down.is_some()
    }
}

/// Strip a trailing "up"/"down" word (case-insensitive), keeping the original casing.
///
/// The suffix must be its own word: "Living up" and "Desk_down" lose it,
/// "Backup" keeps it.
pub fn strip_direction_suffix(name: &str) -> &str {
    let trimmed = name.trim();
    for suffix in ["down", "up"] {
        let Some(split) = trimmed.len().checked_sub(suffix.len()) else {
            continue;
        };
        if !trimmed.is_char_boundary(split) || !trimmed[split..].eq_ignore_ascii_case(suffix) {
            continue;
        }
        let base = &trimmed[..split];
        if base.is_empty() || base.ends_with(|c: char| !c.is_alphanumeric()) {
            return base.trim_end_matches(|c: char| c.is_whitespace() || c == '-' || c == '_');
        }
    }
    trimmed
}

/// Lower-cased base name used as pairing key
pub fn normalized_name(name: &str) -> String {
    strip_direction_suffix(name).to_lowercase()
}

/// Combine Up/Down outputs into covers. Other output types are ignored.
pub fn pair_covers(outputs: &[Output]) -> Vec<Cover> {
    let mut groups: BTreeMap<(u8, u8), (Vec<&Output>, Vec<&Output>)> = BTreeMap::new();
    for output in outputs {
        let key = (output.module_address, output.group_index);
        match output.output_type {
            OutputType::Up => groups.entry(key).or_default().0.push(output),
            OutputType::Down => groups.entry(key).or_default().1.push(output),
            _ => {}
        }
    }

    let mut covers = Vec::new();
    let mut leftover_ups = Vec::new();
    let mut leftover_downs = Vec::new();

    for (_, (mut ups, mut downs)) in groups {
        ups.sort_by_key(|o| o.index);
        downs.sort_by_key(|o| o.index);

        let mut pairs = Vec::new();
        let mut ups: Vec<Option<&Output>> = ups.into_iter().map(Some).collect();
        let mut downs: Vec<Option<&Output>> = downs.into_iter().map(Some).collect();

        match_names(&mut ups, &mut downs, &mut pairs, true);

        // Positional order for whatever the names did not settle
        let mut rest_ups = ups.into_iter().flatten();
        let mut rest_downs = downs.into_iter().flatten();
        loop {
            match (rest_ups.next(), rest_downs.next()) {
                (Some(up), Some(down)) => pairs.push((up, down)),
                (Some(up), None) => {
                    leftover_ups.push(up);
                    leftover_ups.extend(rest_ups.by_ref());
                    break;
                }
                (None, Some(down)) => {
                    leftover_downs.push(down);
                    leftover_downs.extend(rest_downs.by_ref());
                    break;
                }
                (None, None) => break,
            }
        }

        pairs.sort_by_key(|(up, _)| up.index);
        covers.extend(
            pairs
                .into_iter()
                .map(|(up, down)| Cover::paired(up.clone(), down.clone())),
        );
    }

    leftover_ups.sort_by_key(|o| o.id());
    leftover_downs.sort_by_key(|o| o.id());
    let mut ups: Vec<Option<&Output>> = leftover_ups.into_iter().map(Some).collect();
    let mut downs: Vec<Option<&Output>> = leftover_downs.into_iter().map(Some).collect();

    let mut pairs = Vec::new();
    match_names(&mut ups, &mut downs, &mut pairs, true);
    match_names(&mut ups, &mut downs, &mut pairs, false);
    covers.extend(
        pairs
            .into_iter()
            .map(|(up, down)| Cover::paired(up.clone(), down.clone())),
    );

    covers.extend(ups.into_iter().flatten().cloned().map(Cover::up_only));
    covers.extend(downs.into_iter().flatten().cloned().map(Cover::down_only));
    covers
}

/// Pair slots whose normalized names are equal, consuming both sides.
fn match_names<'a>(
    ups: &mut [Option<&'a Output>],
    downs: &mut [Option<&'a Output>],
    pairs: &mut Vec<(&'a Output, &'a Output)>,
    same_module: bool,
) {
    for up_slot in ups.iter_mut() {
        let Some(up) = *up_slot else { continue };
        let base = normalized_name(&up.name);
        if base.is_empty() {
            continue;
        }

        let hit = downs.iter().position(|slot| {
            slot.is_some_and(|down| {
                (!same_module || down.module_address == up.module_address)
                    && normalized_name(&down.name) == base
            })
        });

        if let Some(down) = hit.and_then(|pos| downs[pos].take()) {
            *up_slot = None;
            pairs.push((up, down));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up(module: u8, index: u8, group: u8, name: &str) -> Output {
        Output::new(module, index, OutputType::Up, group, name)
    }

    fn down(module: u8, index: u8, group: u8, name: &str) -> Output {
        Output::new(module, index, OutputType::Down, group, name)
    }

    #[test]
    fn test_strip_direction_suffix() {
        assert_eq!(strip_direction_suffix("Living up"), "Living");
        assert_eq!(strip_direction_suffix("Kitchen Down "), "Kitchen");
        assert_eq!(strip_direction_suffix("Desk_DOWN"), "Desk");
        assert_eq!(strip_direction_suffix("Backup"), "Backup");
        assert_eq!(strip_direction_suffix("Up"), "");
        assert_eq!(strip_direction_suffix("Garage"), "Garage");
    }

    #[test]
    fn test_pair_by_group() {
        let outputs = vec![up(1, 0, 5, "Living up"), down(1, 1, 5, "Living down")];
        let covers = pair_covers(&outputs);

        assert_eq!(covers.len(), 1);
        let cover = &covers[0];
        assert!(cover.is_paired());
        assert_eq!(cover.unique_id, "1.U0.D1");
        assert_eq!(cover.name, "Living");
        assert_eq!(cover.up.as_ref().map(|o| o.index), Some(0));
        assert_eq!(cover.down.as_ref().map(|o| o.index), Some(1));
    }

    #[test]
    fn test_group_match_wins_over_names() {
        let outputs = vec![up(1, 0, 2, "Attic up"), down(1, 1, 2, "Porch down")];
        let covers = pair_covers(&outputs);

        assert_eq!(covers.len(), 1);
        assert!(covers[0].is_paired());
        assert_eq!(covers[0].name, "Attic");
    }

    #[test]
    fn test_shared_group_prefers_names_then_position() {
        let outputs = vec![
            up(2, 0, 7, "Bedroom up"),
            up(2, 1, 7, "Study up"),
            up(2, 2, 7, "Spare"),
            down(2, 3, 7, "Study down"),
            down(2, 4, 7, "Bedroom down"),
            down(2, 5, 7, "Other"),
        ];
        let covers = pair_covers(&outputs);

        assert_eq!(covers.len(), 3);
        let ids: Vec<&str> = covers.iter().map(|c| c.unique_id.as_str()).collect();
        assert_eq!(ids, vec!["2.U0.D4", "2.U1.D3", "2.U2.D5"]);
    }

    #[test]
    fn test_name_fallback_with_different_groups() {
        let outputs = vec![up(3, 4, 1, "Kitchen Up"), down(3, 9, 2, "Kitchen Down")];
        let covers = pair_covers(&outputs);

        assert_eq!(covers.len(), 1);
        assert!(covers[0].is_paired());
        assert_eq!(covers[0].unique_id, "3.U4.D9");
        assert_eq!(covers[0].name, "Kitchen");
    }

    #[test]
    fn test_name_fallback_prefers_same_module() {
        let outputs = vec![
            up(1, 0, 1, "Office up"),
            down(2, 0, 2, "Office down"),
            down(1, 3, 3, "Office down"),
        ];
        let covers = pair_covers(&outputs);

        assert_eq!(covers.len(), 2);
        assert_eq!(covers[0].unique_id, "1.U0.D3");
        assert_eq!(covers[1].unique_id, "2.D0");
        assert!(covers[1].up.is_none());
    }

    #[test]
    fn test_name_fallback_across_modules() {
        let outputs = vec![up(1, 0, 1, "Veranda up"), down(2, 6, 2, "Veranda down")];
        let covers = pair_covers(&outputs);

        assert_eq!(covers.len(), 1);
        assert_eq!(covers[0].unique_id, "1.U0.2.D6");
        assert_eq!(covers[0].module_address, 1);
    }

    #[test]
    fn test_matches_are_consumed() {
        let outputs = vec![
            up(1, 0, 1, "Hall up"),
            up(1, 1, 2, "Hall up"),
            down(1, 2, 3, "Hall down"),
        ];
        let covers = pair_covers(&outputs);

        assert_eq!(covers.len(), 2);
        assert_eq!(covers.iter().filter(|c| c.is_paired()).count(), 1);
        assert_eq!(covers[1].unique_id, "1.U1");
    }

    #[test]
    fn test_unpaired_up_becomes_single_direction() {
        let outputs = vec![up(4, 2, 9, "Skylight up")];
        let covers = pair_covers(&outputs);

        assert_eq!(covers.len(), 1);
        assert_eq!(covers[0].unique_id, "4.U2");
        assert_eq!(covers[0].name, "Skylight");
        assert!(covers[0].down.is_none());
    }

    #[test]
    fn test_empty_names_never_match() {
        let outputs = vec![up(1, 0, 1, "up"), down(1, 1, 2, "down")];
        let covers = pair_covers(&outputs);

        assert_eq!(covers.len(), 2);
        assert_eq!(covers[0].name, "Cover");
    }

    #[test]
    fn test_non_cover_outputs_ignored() {
        let outputs = vec![
            Output::new(1, 0, OutputType::Relay, 5, "Lamp up"),
            Output::new(1, 1, OutputType::Fan, 5, "Fan down"),
        ];
        assert!(pair_covers(&outputs).is_empty());
    }
}
