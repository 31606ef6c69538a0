//! Leaf value validation.
//!
//! A leaf's type constraint is resolved at setup time against a closed,
//! enumerated table of tags, or supplied as a named custom predicate. There
//! is no per-assignment name lookup: an unknown tag fails when the
//! constraint is declared, not when a value arrives.

use crate::error::TreeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

/// The closed table of built-in type tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Number,
    Integer,
    String,
    Boolean,
    Array,
    Object,
    Null,
}

impl TypeTag {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }

    /// Whether `value` satisfies this tag.
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Null => value.is_null(),
        }
    }
}

impl FromStr for TypeTag {
    type Err = TreeError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "number" => Ok(Self::Number),
            "integer" => Ok(Self::Integer),
            "string" => Ok(Self::String),
            "boolean" => Ok(Self::Boolean),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            "null" => Ok(Self::Null),
            other => Err(TreeError::UnknownType {
                tag: other.to_string(),
            }),
        }
    }
}

/// A leaf's resolved type constraint: a built-in tag or a named custom
/// predicate.
#[derive(Clone)]
pub enum TypeSpec {
    Named(TypeTag),
    Custom {
        name: String,
        test: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    },
}

impl TypeSpec {
    /// Register a custom predicate under a display name.
    pub fn custom(
        name: impl Into<String>,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        TypeSpec::Custom {
            name: name.into(),
            test: Arc::new(test),
        }
    }

    /// Resolve a tag name against the built-in table.
    pub fn named(tag: &str) -> Result<Self, TreeError> {
        Ok(TypeSpec::Named(tag.parse()?))
    }

    pub fn name(&self) -> &str {
        match self {
            TypeSpec::Named(tag) => tag.name(),
            TypeSpec::Custom { name, .. } => name,
        }
    }

    pub fn check(&self, value: &Value) -> bool {
        match self {
            TypeSpec::Named(tag) => tag.check(value),
            TypeSpec::Custom { test, .. } => test(value),
        }
    }
}

impl From<TypeTag> for TypeSpec {
    fn from(tag: TypeTag) -> Self {
        TypeSpec::Named(tag)
    }
}

impl std::fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeSpec({})", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_accept_matching_values() {
        assert!(TypeTag::Number.check(&json!(1.5)));
        assert!(TypeTag::Integer.check(&json!(3)));
        assert!(!TypeTag::Integer.check(&json!(1.5)));
        assert!(TypeTag::String.check(&json!("Bob")));
        assert!(TypeTag::Boolean.check(&json!(false)));
        assert!(TypeTag::Array.check(&json!([1, 2])));
        assert!(TypeTag::Object.check(&json!({"a": 1})));
        assert!(TypeTag::Null.check(&Value::Null));
    }

    #[test]
    fn tags_reject_mismatched_values() {
        assert!(!TypeTag::Number.check(&json!("Flanders")));
        assert!(!TypeTag::String.check(&json!(7)));
    }

    #[test]
    fn tag_names_resolve_at_setup_time() {
        assert_eq!("number".parse::<TypeTag>().unwrap(), TypeTag::Number);
        assert_eq!(
            "fn".parse::<TypeTag>().unwrap_err(),
            TreeError::UnknownType {
                tag: "fn".to_string()
            }
        );
    }

    #[test]
    fn custom_predicates_carry_their_name() {
        let positive = TypeSpec::custom("positive number", |v| {
            v.as_f64().map(|n| n > 0.0).unwrap_or(false)
        });
        assert_eq!(positive.name(), "positive number");
        assert!(positive.check(&json!(2)));
        assert!(!positive.check(&json!(-2)));
        assert!(!positive.check(&json!("two")));
    }
}
