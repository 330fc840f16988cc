//! Value objects - Immutable objects defined by their attributes

mod ids;
mod trait_value;

pub use ids::*;
pub use trait_value::{TraitValue, TraitValueRecord, TraitValueType};
