//! Domain services - Pure business logic operations

mod reorder;
mod trait_diff;
mod value_validation;

pub use reorder::plan_dense_reorder;
pub use trait_diff::{diff_trait_values, TraitDiff, TraitDiffStatus};
pub use value_validation::{validate_value, validate_value_set};
