//! Character entity - the subject trait values attach to

use crate::domain::value_objects::{CharacterId, SpeciesVariantId};

/// A character on the masterlist. The variant it belongs to decides which
/// traits its sheet shows; the values themselves live in the value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub species_variant_id: SpeciesVariantId,
}

impl Character {
    pub fn new(name: impl Into<String>, species_variant_id: SpeciesVariantId) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            species_variant_id,
        }
    }
}
