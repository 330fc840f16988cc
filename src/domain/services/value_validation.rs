//! Validation of trait values against the catalog
//!
//! Storage backends run these checks inside their atomic sections, so an
//! invalid set never lands whether it arrives by direct replacement or
//! by approving a review.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::entities::{EnumValue, TraitDefinition};
use crate::domain::errors::EngineError;
use crate::domain::value_objects::{EnumValueId, TraitId, TraitValue, TraitValueRecord};

/// Validate one value against its trait definition. Enum payloads must
/// reference an option of that same trait.
pub fn validate_value(
    definition: &TraitDefinition,
    enum_values: &BTreeMap<EnumValueId, EnumValue>,
    value: &TraitValue,
) -> Result<(), EngineError> {
    if !value.matches(definition.value_type) {
        return Err(EngineError::TypeMismatch {
            trait_id: definition.id,
            expected: definition.value_type,
            actual: value.value_type(),
        });
    }

    if let TraitValue::Enum(enum_value_id) = value {
        let enum_value = enum_values
            .get(enum_value_id)
            .ok_or(EngineError::EnumValueNotFound(*enum_value_id))?;
        if enum_value.trait_id != definition.id {
            return Err(EngineError::EnumValueNotInTrait {
                trait_id: definition.id,
                enum_value_id: *enum_value_id,
            });
        }
    }

    Ok(())
}

/// Validate a whole replacement value set: every trait must exist, every
/// value must fit its trait's shape, repeated identical rows are rejected,
/// and only multi-value traits may carry more than one row.
pub fn validate_value_set(
    definitions: &BTreeMap<TraitId, TraitDefinition>,
    enum_values: &BTreeMap<EnumValueId, EnumValue>,
    values: &[TraitValueRecord],
) -> Result<(), EngineError> {
    let mut seen: BTreeSet<&TraitValueRecord> = BTreeSet::new();
    let mut counts: BTreeMap<TraitId, usize> = BTreeMap::new();

    for record in values {
        let definition = definitions
            .get(&record.trait_id)
            .ok_or(EngineError::TraitNotFound(record.trait_id))?;
        validate_value(definition, enum_values, &record.value)?;

        if !seen.insert(record) {
            return Err(EngineError::DuplicateValue(record.trait_id));
        }

        let count = counts.entry(record.trait_id).or_insert(0);
        *count += 1;
        if *count > 1 && !definition.allows_multiple_values {
            return Err(EngineError::MultiplicityViolation(record.trait_id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{SpeciesId, TraitValueType};

    struct Catalog {
        definitions: BTreeMap<TraitId, TraitDefinition>,
        enum_values: BTreeMap<EnumValueId, EnumValue>,
    }

    fn catalog() -> (Catalog, TraitDefinition, TraitDefinition, EnumValue) {
        let species_id = SpeciesId::new();
        let age = TraitDefinition::new(species_id, "Age", TraitValueType::Integer);
        let markings = TraitDefinition::new(species_id, "Markings", TraitValueType::Enum)
            .with_multiple_values();
        let stripes = EnumValue::new(markings.id, "Stripes", 1.0);

        let catalog = Catalog {
            definitions: [age.clone(), markings.clone()]
                .into_iter()
                .map(|d| (d.id, d))
                .collect(),
            enum_values: [(stripes.id, stripes.clone())].into_iter().collect(),
        };
        (catalog, age, markings, stripes)
    }

    #[test]
    fn accepts_well_formed_set() {
        let (catalog, age, markings, stripes) = catalog();
        let values = vec![
            TraitValueRecord::new(age.id, TraitValue::Integer(5)),
            TraitValueRecord::new(markings.id, TraitValue::Enum(stripes.id)),
        ];

        validate_value_set(&catalog.definitions, &catalog.enum_values, &values).unwrap();
    }

    #[test]
    fn rejects_unknown_trait() {
        let (catalog, ..) = catalog();
        let unknown = TraitId::new();
        let values = vec![TraitValueRecord::new(unknown, TraitValue::Integer(1))];

        let err =
            validate_value_set(&catalog.definitions, &catalog.enum_values, &values).unwrap_err();
        assert!(matches!(err, EngineError::TraitNotFound(id) if id == unknown));
    }

    #[test]
    fn rejects_wrong_value_shape() {
        let (catalog, age, ..) = catalog();
        let values = vec![TraitValueRecord::new(
            age.id,
            TraitValue::String("five".to_string()),
        )];

        let err =
            validate_value_set(&catalog.definitions, &catalog.enum_values, &values).unwrap_err();
        assert!(matches!(
            err,
            EngineError::TypeMismatch {
                expected: TraitValueType::Integer,
                actual: TraitValueType::String,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_enum_reference() {
        let (catalog, _, markings, _) = catalog();
        let missing = EnumValueId::new();
        let values = vec![TraitValueRecord::new(markings.id, TraitValue::Enum(missing))];

        let err =
            validate_value_set(&catalog.definitions, &catalog.enum_values, &values).unwrap_err();
        assert!(matches!(err, EngineError::EnumValueNotFound(id) if id == missing));
    }

    #[test]
    fn rejects_enum_value_of_another_trait() {
        let (mut catalog, _, markings, _) = catalog();
        let other_trait = TraitId::new();
        let foreign = EnumValue::new(other_trait, "Foreign", 1.0);
        catalog.enum_values.insert(foreign.id, foreign.clone());
        let values = vec![TraitValueRecord::new(
            markings.id,
            TraitValue::Enum(foreign.id),
        )];

        let err =
            validate_value_set(&catalog.definitions, &catalog.enum_values, &values).unwrap_err();
        assert!(matches!(
            err,
            EngineError::EnumValueNotInTrait { enum_value_id, .. } if enum_value_id == foreign.id
        ));
    }

    #[test]
    fn rejects_second_value_on_single_value_trait() {
        let (catalog, age, ..) = catalog();
        let values = vec![
            TraitValueRecord::new(age.id, TraitValue::Integer(4)),
            TraitValueRecord::new(age.id, TraitValue::Integer(5)),
        ];

        let err =
            validate_value_set(&catalog.definitions, &catalog.enum_values, &values).unwrap_err();
        assert!(matches!(err, EngineError::MultiplicityViolation(id) if id == age.id));
    }

    #[test]
    fn rejects_repeated_identical_rows() {
        let (catalog, _, markings, stripes) = catalog();
        let values = vec![
            TraitValueRecord::new(markings.id, TraitValue::Enum(stripes.id)),
            TraitValueRecord::new(markings.id, TraitValue::Enum(stripes.id)),
        ];

        let err =
            validate_value_set(&catalog.definitions, &catalog.enum_values, &values).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateValue(id) if id == markings.id));
    }

    #[test]
    fn multi_value_trait_accepts_distinct_values() {
        let (mut catalog, _, markings, stripes) = catalog();
        let spots = EnumValue::new(markings.id, "Spots", 2.0);
        catalog.enum_values.insert(spots.id, spots.clone());
        let values = vec![
            TraitValueRecord::new(markings.id, TraitValue::Enum(stripes.id)),
            TraitValueRecord::new(markings.id, TraitValue::Enum(spots.id)),
        ];

        validate_value_set(&catalog.definitions, &catalog.enum_values, &values).unwrap();
    }
}
