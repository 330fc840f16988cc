//! Typed trait values - the tagged payloads attached to character traits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{EnumValueId, TraitId};

/// The shape of value a trait accepts. Fixed when the trait is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitValueType {
    String,
    Integer,
    Timestamp,
    Enum,
}

impl TraitValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraitValueType::String => "string",
            TraitValueType::Integer => "integer",
            TraitValueType::Timestamp => "timestamp",
            TraitValueType::Enum => "enum",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(TraitValueType::String),
            "integer" => Some(TraitValueType::Integer),
            "timestamp" => Some(TraitValueType::Timestamp),
            "enum" => Some(TraitValueType::Enum),
            _ => None,
        }
    }
}

impl std::fmt::Display for TraitValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single trait value. Enum payloads carry the option's id, never its
/// display name, so renaming an option does not touch stored values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TraitValue {
    String(String),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Enum(EnumValueId),
}

impl TraitValue {
    pub fn value_type(&self) -> TraitValueType {
        match self {
            TraitValue::String(_) => TraitValueType::String,
            TraitValue::Integer(_) => TraitValueType::Integer,
            TraitValue::Timestamp(_) => TraitValueType::Timestamp,
            TraitValue::Enum(_) => TraitValueType::Enum,
        }
    }

    pub fn matches(&self, value_type: TraitValueType) -> bool {
        self.value_type() == value_type
    }

    pub fn as_enum_value(&self) -> Option<EnumValueId> {
        match self {
            TraitValue::Enum(id) => Some(*id),
            _ => None,
        }
    }
}

/// One row of a character's trait-value set: a trait paired with one value.
/// Multi-value traits appear as several records sharing a trait id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraitValueRecord {
    pub trait_id: TraitId,
    pub value: TraitValue,
}

impl TraitValueRecord {
    pub fn new(trait_id: TraitId, value: TraitValue) -> Self {
        Self { trait_id, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_reports_payload_shape() {
        assert_eq!(
            TraitValue::String("Ember".to_string()).value_type(),
            TraitValueType::String
        );
        assert_eq!(TraitValue::Integer(5).value_type(), TraitValueType::Integer);
        assert_eq!(
            TraitValue::Enum(EnumValueId::new()).value_type(),
            TraitValueType::Enum
        );
    }

    #[test]
    fn matches_rejects_other_shapes() {
        let value = TraitValue::Integer(42);
        assert!(value.matches(TraitValueType::Integer));
        assert!(!value.matches(TraitValueType::String));
        assert!(!value.matches(TraitValueType::Enum));
    }

    #[test]
    fn value_type_parse_accepts_known_names() {
        assert_eq!(TraitValueType::parse("enum"), Some(TraitValueType::Enum));
        assert_eq!(TraitValueType::parse("color"), None);
    }
}
