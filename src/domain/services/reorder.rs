//! Dense reorder planning for variant trait lists

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::entities::TraitListEntry;
use crate::domain::errors::EngineError;
use crate::domain::value_objects::{SpeciesVariantId, TraitId, TraitListEntryId};

/// Plan a full reordering of a variant's entries. The input must name every
/// active entry's trait exactly once; the plan assigns dense positions
/// 0..N-1 in input order. Nothing is mutated here, so a rejected plan
/// leaves the stored ordering untouched.
pub fn plan_dense_reorder(
    variant_id: SpeciesVariantId,
    entries: &[TraitListEntry],
    ordered_trait_ids: &[TraitId],
) -> Result<Vec<(TraitListEntryId, i64)>, EngineError> {
    let by_trait: BTreeMap<TraitId, TraitListEntryId> =
        entries.iter().map(|e| (e.trait_id, e.id)).collect();

    let mut named: BTreeSet<TraitId> = BTreeSet::new();
    let mut plan = Vec::with_capacity(ordered_trait_ids.len());
    for (position, trait_id) in ordered_trait_ids.iter().enumerate() {
        let entry_id =
            by_trait
                .get(trait_id)
                .copied()
                .ok_or(EngineError::UnknownTraitInVariant {
                    variant_id,
                    trait_id: *trait_id,
                })?;
        named.insert(*trait_id);
        plan.push((entry_id, position as i64));
    }

    // repeated or omitted traits both surface as a count mismatch
    if named.len() != ordered_trait_ids.len() || named.len() != by_trait.len() {
        return Err(EngineError::IncompleteReorder {
            variant_id,
            expected: by_trait.len(),
            provided: named.len(),
        });
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::TraitValueType;

    fn entries_for(variant_id: SpeciesVariantId, count: usize) -> Vec<TraitListEntry> {
        (0..count)
            .map(|i| {
                TraitListEntry::new(variant_id, TraitId::new(), i as i64, TraitValueType::String)
            })
            .collect()
    }

    #[test]
    fn plan_assigns_dense_positions_in_input_order() {
        let variant_id = SpeciesVariantId::new();
        let entries = entries_for(variant_id, 3);
        let reversed: Vec<TraitId> = entries.iter().rev().map(|e| e.trait_id).collect();

        let plan = plan_dense_reorder(variant_id, &entries, &reversed).unwrap();

        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0], (entries[2].id, 0));
        assert_eq!(plan[1], (entries[1].id, 1));
        assert_eq!(plan[2], (entries[0].id, 2));
    }

    #[test]
    fn unknown_trait_is_rejected() {
        let variant_id = SpeciesVariantId::new();
        let entries = entries_for(variant_id, 2);
        let stranger = TraitId::new();
        let input = vec![entries[0].trait_id, stranger];

        let err = plan_dense_reorder(variant_id, &entries, &input).unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnknownTraitInVariant { trait_id, .. } if trait_id == stranger
        ));
    }

    #[test]
    fn omitting_an_entry_is_rejected() {
        let variant_id = SpeciesVariantId::new();
        let entries = entries_for(variant_id, 3);
        let input = vec![entries[0].trait_id, entries[2].trait_id];

        let err = plan_dense_reorder(variant_id, &entries, &input).unwrap_err();
        assert!(matches!(
            err,
            EngineError::IncompleteReorder {
                expected: 3,
                provided: 2,
                ..
            }
        ));
    }

    #[test]
    fn repeating_an_entry_is_rejected() {
        let variant_id = SpeciesVariantId::new();
        let entries = entries_for(variant_id, 2);
        let input = vec![entries[0].trait_id, entries[0].trait_id];

        let err = plan_dense_reorder(variant_id, &entries, &input).unwrap_err();
        assert!(matches!(err, EngineError::IncompleteReorder { .. }));
    }

    #[test]
    fn unknown_trait_wins_over_incompleteness() {
        let variant_id = SpeciesVariantId::new();
        let entries = entries_for(variant_id, 3);
        let input = vec![TraitId::new()];

        let err = plan_dense_reorder(variant_id, &entries, &input).unwrap_err();
        assert!(matches!(err, EngineError::UnknownTraitInVariant { .. }));
    }

    #[test]
    fn empty_list_reorders_vacuously() {
        let variant_id = SpeciesVariantId::new();
        let plan = plan_dense_reorder(variant_id, &[], &[]).unwrap();
        assert!(plan.is_empty());
    }
}
