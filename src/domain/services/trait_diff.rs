//! Structural diff of two trait-value sets
//!
//! Pure and deterministic: equal inputs always produce identical output,
//! ordered by ascending trait id. Rows whose trait definition no longer
//! exists are skipped rather than reported.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::entities::TraitDefinition;
use crate::domain::value_objects::{TraitId, TraitValue, TraitValueRecord};

/// How one trait moved between the previous and proposed sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitDiffStatus {
    Added,
    Removed,
    Changed,
    Unchanged,
}

/// Comparison result for a single trait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitDiff {
    pub trait_id: TraitId,
    pub status: TraitDiffStatus,
    pub previous_values: Vec<TraitValue>,
    pub proposed_values: Vec<TraitValue>,
    /// Values the proposal introduces. Populated for changed
    /// multi-value traits only.
    pub added_values: Vec<TraitValue>,
    /// Values the proposal drops. Populated for changed
    /// multi-value traits only.
    pub removed_values: Vec<TraitValue>,
}

/// Compare two value sets trait by trait. Values are compared as sets, so
/// reordering a multi-value trait is not a change, and enum values compare
/// by option id, so renaming an option does not surface as a change.
pub fn diff_trait_values(
    definitions: &BTreeMap<TraitId, TraitDefinition>,
    previous: &[TraitValueRecord],
    proposed: &[TraitValueRecord],
) -> Vec<TraitDiff> {
    let previous_by_trait = group_by_trait(definitions, previous);
    let proposed_by_trait = group_by_trait(definitions, proposed);

    let trait_ids: BTreeSet<TraitId> = previous_by_trait
        .keys()
        .chain(proposed_by_trait.keys())
        .copied()
        .collect();

    let mut diffs = Vec::with_capacity(trait_ids.len());
    for trait_id in trait_ids {
        let diff = match (
            previous_by_trait.get(&trait_id),
            proposed_by_trait.get(&trait_id),
        ) {
            (None, Some(after)) => TraitDiff {
                trait_id,
                status: TraitDiffStatus::Added,
                previous_values: Vec::new(),
                proposed_values: after.clone(),
                added_values: Vec::new(),
                removed_values: Vec::new(),
            },
            (Some(before), None) => TraitDiff {
                trait_id,
                status: TraitDiffStatus::Removed,
                previous_values: before.clone(),
                proposed_values: Vec::new(),
                added_values: Vec::new(),
                removed_values: Vec::new(),
            },
            (Some(before), Some(after)) => {
                let before_set: BTreeSet<&TraitValue> = before.iter().collect();
                let after_set: BTreeSet<&TraitValue> = after.iter().collect();
                if before_set == after_set {
                    TraitDiff {
                        trait_id,
                        status: TraitDiffStatus::Unchanged,
                        previous_values: before.clone(),
                        proposed_values: after.clone(),
                        added_values: Vec::new(),
                        removed_values: Vec::new(),
                    }
                } else {
                    let multi_value = definitions
                        .get(&trait_id)
                        .is_some_and(|d| d.allows_multiple_values);
                    let (added_values, removed_values) = if multi_value {
                        (set_delta(after, &before_set), set_delta(before, &after_set))
                    } else {
                        (Vec::new(), Vec::new())
                    };
                    TraitDiff {
                        trait_id,
                        status: TraitDiffStatus::Changed,
                        previous_values: before.clone(),
                        proposed_values: after.clone(),
                        added_values,
                        removed_values,
                    }
                }
            }
            (None, None) => continue,
        };
        diffs.push(diff);
    }

    diffs
}

/// Values of `from` absent from `exclude`, in `from`'s order, deduplicated.
fn set_delta(from: &[TraitValue], exclude: &BTreeSet<&TraitValue>) -> Vec<TraitValue> {
    let mut seen: BTreeSet<&TraitValue> = BTreeSet::new();
    from.iter()
        .filter(|value| !exclude.contains(value) && seen.insert(value))
        .cloned()
        .collect()
}

/// Group records by trait, keeping record order within each trait and
/// dropping rows whose trait is no longer defined.
fn group_by_trait(
    definitions: &BTreeMap<TraitId, TraitDefinition>,
    records: &[TraitValueRecord],
) -> BTreeMap<TraitId, Vec<TraitValue>> {
    let mut grouped: BTreeMap<TraitId, Vec<TraitValue>> = BTreeMap::new();
    for record in records {
        if !definitions.contains_key(&record.trait_id) {
            continue;
        }
        grouped
            .entry(record.trait_id)
            .or_default()
            .push(record.value.clone());
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{EnumValueId, SpeciesId, TraitValueType};

    fn definition_map(definitions: &[TraitDefinition]) -> BTreeMap<TraitId, TraitDefinition> {
        definitions.iter().map(|d| (d.id, d.clone())).collect()
    }

    fn record(trait_id: TraitId, value: TraitValue) -> TraitValueRecord {
        TraitValueRecord::new(trait_id, value)
    }

    #[test]
    fn single_value_replacement_is_changed_without_sub_diff() {
        let species_id = SpeciesId::new();
        let scale_color = TraitDefinition::new(species_id, "Scale Color", TraitValueType::Enum);
        let definitions = definition_map(&[scale_color.clone()]);

        let red = EnumValueId::new();
        let blue = EnumValueId::new();
        let diffs = diff_trait_values(
            &definitions,
            &[record(scale_color.id, TraitValue::Enum(red))],
            &[record(scale_color.id, TraitValue::Enum(blue))],
        );

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].status, TraitDiffStatus::Changed);
        assert_eq!(diffs[0].previous_values, vec![TraitValue::Enum(red)]);
        assert_eq!(diffs[0].proposed_values, vec![TraitValue::Enum(blue)]);
        assert!(diffs[0].added_values.is_empty());
        assert!(diffs[0].removed_values.is_empty());
    }

    #[test]
    fn traits_on_one_side_only_are_added_or_removed() {
        let species_id = SpeciesId::new();
        let name = TraitDefinition::new(species_id, "Nickname", TraitValueType::String);
        let age = TraitDefinition::new(species_id, "Age", TraitValueType::Integer);
        let definitions = definition_map(&[name.clone(), age.clone()]);

        let diffs = diff_trait_values(
            &definitions,
            &[record(age.id, TraitValue::Integer(5))],
            &[record(name.id, TraitValue::String("Ember".to_string()))],
        );

        assert_eq!(diffs.len(), 2);
        let added = diffs.iter().find(|d| d.trait_id == name.id).unwrap();
        let removed = diffs.iter().find(|d| d.trait_id == age.id).unwrap();
        assert_eq!(added.status, TraitDiffStatus::Added);
        assert!(added.previous_values.is_empty());
        assert_eq!(removed.status, TraitDiffStatus::Removed);
        assert!(removed.proposed_values.is_empty());
    }

    #[test]
    fn reordered_multi_values_are_unchanged() {
        let species_id = SpeciesId::new();
        let accessories = TraitDefinition::new(species_id, "Accessories", TraitValueType::Enum)
            .with_multiple_values();
        let definitions = definition_map(&[accessories.clone()]);

        let collar = EnumValueId::new();
        let bell = EnumValueId::new();
        let diffs = diff_trait_values(
            &definitions,
            &[
                record(accessories.id, TraitValue::Enum(collar)),
                record(accessories.id, TraitValue::Enum(bell)),
            ],
            &[
                record(accessories.id, TraitValue::Enum(bell)),
                record(accessories.id, TraitValue::Enum(collar)),
            ],
        );

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].status, TraitDiffStatus::Unchanged);
    }

    #[test]
    fn changed_multi_value_trait_reports_value_level_delta() {
        let species_id = SpeciesId::new();
        let accessories = TraitDefinition::new(species_id, "Accessories", TraitValueType::Enum)
            .with_multiple_values();
        let definitions = definition_map(&[accessories.clone()]);

        let collar = EnumValueId::new();
        let bell = EnumValueId::new();
        let ribbon = EnumValueId::new();
        let diffs = diff_trait_values(
            &definitions,
            &[
                record(accessories.id, TraitValue::Enum(collar)),
                record(accessories.id, TraitValue::Enum(bell)),
            ],
            &[
                record(accessories.id, TraitValue::Enum(bell)),
                record(accessories.id, TraitValue::Enum(ribbon)),
            ],
        );

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].status, TraitDiffStatus::Changed);
        assert_eq!(diffs[0].added_values, vec![TraitValue::Enum(ribbon)]);
        assert_eq!(diffs[0].removed_values, vec![TraitValue::Enum(collar)]);
    }

    #[test]
    fn rows_for_deleted_traits_are_skipped() {
        let species_id = SpeciesId::new();
        let age = TraitDefinition::new(species_id, "Age", TraitValueType::Integer);
        let definitions = definition_map(&[age.clone()]);

        let deleted_trait = TraitId::new();
        let diffs = diff_trait_values(
            &definitions,
            &[
                record(age.id, TraitValue::Integer(3)),
                record(deleted_trait, TraitValue::Integer(99)),
            ],
            &[
                record(age.id, TraitValue::Integer(3)),
                record(deleted_trait, TraitValue::Integer(100)),
            ],
        );

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].trait_id, age.id);
        assert_eq!(diffs[0].status, TraitDiffStatus::Unchanged);
    }

    #[test]
    fn set_diffed_with_itself_is_all_unchanged() {
        let species_id = SpeciesId::new();
        let color = TraitDefinition::new(species_id, "Scale Color", TraitValueType::Enum);
        let age = TraitDefinition::new(species_id, "Age", TraitValueType::Integer);
        let markings = TraitDefinition::new(species_id, "Markings", TraitValueType::String)
            .with_multiple_values();
        let definitions = definition_map(&[color.clone(), age.clone(), markings.clone()]);

        let values = vec![
            record(color.id, TraitValue::Enum(EnumValueId::new())),
            record(age.id, TraitValue::Integer(5)),
            record(markings.id, TraitValue::String("Stripes".to_string())),
            record(markings.id, TraitValue::String("Spots".to_string())),
        ];
        let diffs = diff_trait_values(&definitions, &values, &values);

        assert_eq!(diffs.len(), 3);
        assert!(diffs
            .iter()
            .all(|d| d.status == TraitDiffStatus::Unchanged));
    }

    #[test]
    fn added_and_removed_swap_when_sides_swap() {
        let species_id = SpeciesId::new();
        let name = TraitDefinition::new(species_id, "Nickname", TraitValueType::String);
        let age = TraitDefinition::new(species_id, "Age", TraitValueType::Integer);
        let definitions = definition_map(&[name.clone(), age.clone()]);

        let previous = vec![record(age.id, TraitValue::Integer(5))];
        let proposed = vec![record(name.id, TraitValue::String("Ember".to_string()))];

        let forward = diff_trait_values(&definitions, &previous, &proposed);
        let backward = diff_trait_values(&definitions, &proposed, &previous);

        let status_of = |diffs: &[TraitDiff], id: TraitId| {
            diffs.iter().find(|d| d.trait_id == id).unwrap().status
        };
        assert_eq!(status_of(&forward, name.id), TraitDiffStatus::Added);
        assert_eq!(status_of(&backward, name.id), TraitDiffStatus::Removed);
        assert_eq!(status_of(&forward, age.id), TraitDiffStatus::Removed);
        assert_eq!(status_of(&backward, age.id), TraitDiffStatus::Added);
    }

    #[test]
    fn output_is_ordered_by_trait_id() {
        let species_id = SpeciesId::new();
        let mut definitions_list = Vec::new();
        for name in ["A", "B", "C", "D"] {
            definitions_list.push(TraitDefinition::new(species_id, name, TraitValueType::Integer));
        }
        let definitions = definition_map(&definitions_list);

        let records: Vec<TraitValueRecord> = definitions_list
            .iter()
            .rev()
            .map(|d| record(d.id, TraitValue::Integer(1)))
            .collect();
        let diffs = diff_trait_values(&definitions, &records, &[]);

        let ids: Vec<TraitId> = diffs.iter().map(|d| d.trait_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
