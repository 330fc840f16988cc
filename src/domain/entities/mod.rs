//! Domain entities - Core business objects with identity

mod character;
mod species;
mod trait_definition;
mod trait_list_entry;
mod trait_review;

pub use character::Character;
pub use species::{Species, SpeciesVariant};
pub use trait_definition::{EnumValue, TraitDefinition};
pub use trait_list_entry::{EnumValueSetting, TraitListEntry};
pub use trait_review::{ReviewSource, ReviewStatus, TraitReview};
