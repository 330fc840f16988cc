//! Species and variant entities - the taxonomy that owns trait catalogs

use crate::domain::value_objects::{SpeciesId, SpeciesVariantId};

/// A species in the masterlist. Traits are defined per species.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Species {
    pub id: SpeciesId,
    pub name: String,
}

impl Species {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SpeciesId::new(),
            name: name.into(),
        }
    }
}

/// A variant (subtype) of a species. Each variant picks which of its
/// species' traits apply and in what order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesVariant {
    pub id: SpeciesVariantId,
    pub species_id: SpeciesId,
    pub name: String,
}

impl SpeciesVariant {
    pub fn new(species_id: SpeciesId, name: impl Into<String>) -> Self {
        Self {
            id: SpeciesVariantId::new(),
            species_id,
            name: name.into(),
        }
    }
}
