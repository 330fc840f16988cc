//! Variant configuration entities - which traits a variant uses and how

use crate::domain::value_objects::{
    EnumValueId, SpeciesVariantId, TraitId, TraitListEntryId, TraitValue, TraitValueType,
};

/// Inclusion of one trait in a variant's sheet, with per-variant ordering
/// and default metadata. At most one entry exists per (variant, trait) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitListEntry {
    pub id: TraitListEntryId,
    pub species_variant_id: SpeciesVariantId,
    pub trait_id: TraitId,
    /// Caller-chosen position, stored as given; dense 0..N-1 only after
    /// a bulk reorder
    pub order: i64,
    pub required: bool,
    /// Captured from the trait when the entry is created
    pub value_type: TraitValueType,
    pub default_value: Option<TraitValue>,
}

impl TraitListEntry {
    pub fn new(
        species_variant_id: SpeciesVariantId,
        trait_id: TraitId,
        order: i64,
        value_type: TraitValueType,
    ) -> Self {
        Self {
            id: TraitListEntryId::new(),
            species_variant_id,
            trait_id,
            order,
            required: false,
            value_type,
            default_value: None,
        }
    }

    pub fn with_required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default_value(mut self, value: TraitValue) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Enables one enum option for one variant. Presence of the pair is the
/// enablement; there is no disabled row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnumValueSetting {
    pub enum_value_id: EnumValueId,
    pub species_variant_id: SpeciesVariantId,
}

impl EnumValueSetting {
    pub fn new(enum_value_id: EnumValueId, species_variant_id: SpeciesVariantId) -> Self {
        Self {
            enum_value_id,
            species_variant_id,
        }
    }
}
