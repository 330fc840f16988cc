//! Trait catalog entities - typed trait definitions and their enum options

use chrono::{DateTime, Utc};

use crate::domain::value_objects::{EnumValueId, SpeciesId, TraitId, TraitValueType};

/// A trait defined for a species, e.g. "Scale Color" or "Age".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitDefinition {
    pub id: TraitId,
    pub species_id: SpeciesId,
    pub name: String,
    /// Fixed at definition time. Stored values and variant settings
    /// depend on it, so it never changes afterwards.
    pub value_type: TraitValueType,
    /// Whether a character may carry several values for this trait
    pub allows_multiple_values: bool,
}

impl TraitDefinition {
    pub fn new(
        species_id: SpeciesId,
        name: impl Into<String>,
        value_type: TraitValueType,
    ) -> Self {
        Self {
            id: TraitId::new(),
            species_id,
            name: name.into(),
            value_type,
            allows_multiple_values: false,
        }
    }

    pub fn with_multiple_values(mut self) -> Self {
        self.allows_multiple_values = true;
        self
    }
}

/// One selectable option of an enum-typed trait
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub id: EnumValueId,
    pub trait_id: TraitId,
    pub name: String,
    /// Sort position within the trait's option list. Fractional values
    /// slot between neighbors without renumbering the rest.
    pub order: f64,
    pub created_at: DateTime<Utc>,
}

impl EnumValue {
    pub fn new(trait_id: TraitId, name: impl Into<String>, order: f64) -> Self {
        Self {
            id: EnumValueId::new(),
            trait_id,
            name: name.into(),
            order,
            created_at: Utc::now(),
        }
    }

    /// Catalog ordering: `order` ascending, then creation time, then id,
    /// so equal-order options still list deterministically.
    pub fn catalog_cmp(&self, other: &EnumValue) -> std::cmp::Ordering {
        self.order
            .total_cmp(&other.order)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}
