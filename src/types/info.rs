//! Type descriptors.
//!
//! # Responsibilities
//! - Define the closed set of type variants
//! - Self-describe as `{ "type": identifier, ... }` JSON
//! - Report which transport channels a value may travel over
//!
//! # Design Decisions
//! - A single enum instead of a class hierarchy; every behavior is a `match`
//! - The identifier doubles as the serde tag, so `json()` and `from_json()`
//!   are exact inverses
//! - Identifiers are not unique per shape (every array is "array")

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::error::{TypeError, TypeResult};

/// Describes the shape of a parameter, body or return value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TypeInfo {
    /// A string, optionally pinned to one literal.
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    /// A number, optionally pinned to one literal.
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
    },
    /// A number within `[min, max]`.
    NumberRange { min: f64, max: f64 },
    /// A boolean, optionally pinned to one literal.
    Boolean {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<bool>,
    },
    Null,
    /// The absence of a value.
    Undefined,
    /// Anything, including absence.
    Any,
    AnyString,
    AnyNumber,
    AnyBoolean,
    /// An object with declared properties. Unlisted properties are ignored.
    Object {
        #[serde(default)]
        properties: BTreeMap<String, Property>,
    },
    /// A homogeneous array with optional length bounds.
    Array {
        element: Box<TypeInfo>,
        #[serde(rename = "minItems", default, skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
        #[serde(rename = "maxItems", default, skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
    },
    /// Any one of the variants.
    Or { variants: Vec<TypeInfo> },
    /// An ISO-8601 (RFC 3339) timestamp carried as a string.
    Date,
}

/// A declared object property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub type_info: TypeInfo,
    #[serde(default)]
    pub required: bool,
}

impl Property {
    pub fn required(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            required: true,
        }
    }

    pub fn optional(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            required: false,
        }
    }
}

/// Transport channel a value can be sent through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Param,
    Body,
    Query,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Param, Channel::Body, Channel::Query];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Param => "param",
            Channel::Body => "body",
            Channel::Query => "query",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "param" | "params" => Ok(Channel::Param),
            "body" => Ok(Channel::Body),
            "query" => Ok(Channel::Query),
            other => Err(TypeError::MalformedDescription(format!(
                "unknown channel '{}'",
                other
            ))),
        }
    }
}

impl TypeInfo {
    /// Any string.
    pub fn string() -> Self {
        TypeInfo::String { value: None }
    }

    /// Exactly the given string.
    pub fn exact_string(value: impl Into<String>) -> Self {
        TypeInfo::String {
            value: Some(value.into()),
        }
    }

    pub fn number() -> Self {
        TypeInfo::Number { value: None }
    }

    pub fn exact_number(value: f64) -> Self {
        TypeInfo::Number { value: Some(value) }
    }

    pub fn number_range(min: f64, max: f64) -> Self {
        TypeInfo::NumberRange { min, max }
    }

    pub fn boolean() -> Self {
        TypeInfo::Boolean { value: None }
    }

    pub fn exact_boolean(value: bool) -> Self {
        TypeInfo::Boolean { value: Some(value) }
    }

    pub fn null() -> Self {
        TypeInfo::Null
    }

    pub fn undefined() -> Self {
        TypeInfo::Undefined
    }

    pub fn any() -> Self {
        TypeInfo::Any
    }

    pub fn any_string() -> Self {
        TypeInfo::AnyString
    }

    pub fn any_number() -> Self {
        TypeInfo::AnyNumber
    }

    pub fn any_boolean() -> Self {
        TypeInfo::AnyBoolean
    }

    pub fn date() -> Self {
        TypeInfo::Date
    }

    /// Object type from `(name, property)` pairs.
    pub fn object<K, I>(properties: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Property)>,
    {
        TypeInfo::Object {
            properties: properties
                .into_iter()
                .map(|(name, property)| (name.into(), property))
                .collect(),
        }
    }

    /// Unbounded array of `element`.
    pub fn array(element: TypeInfo) -> Self {
        TypeInfo::Array {
            element: Box::new(element),
            min_items: None,
            max_items: None,
        }
    }

    /// Array of `element` with optional length bounds.
    pub fn bounded_array(
        element: TypeInfo,
        min_items: Option<usize>,
        max_items: Option<usize>,
    ) -> Self {
        TypeInfo::Array {
            element: Box::new(element),
            min_items,
            max_items,
        }
    }

    pub fn or(variants: impl IntoIterator<Item = TypeInfo>) -> Self {
        TypeInfo::Or {
            variants: variants.into_iter().collect(),
        }
    }

    /// Tag used by the conversion register and in `json()`.
    pub fn identifier(&self) -> &'static str {
        match self {
            TypeInfo::String { .. } => "string",
            TypeInfo::Number { .. } => "number",
            TypeInfo::NumberRange { .. } => "numberRange",
            TypeInfo::Boolean { .. } => "boolean",
            TypeInfo::Null => "null",
            TypeInfo::Undefined => "undefined",
            TypeInfo::Any => "any",
            TypeInfo::AnyString => "anyString",
            TypeInfo::AnyNumber => "anyNumber",
            TypeInfo::AnyBoolean => "anyBoolean",
            TypeInfo::Object { .. } => "object",
            TypeInfo::Array { .. } => "array",
            TypeInfo::Or { .. } => "or",
            TypeInfo::Date => "date",
        }
    }

    /// Whether an absent value (e.g. a missing object property) satisfies this type.
    pub fn accepts_missing(&self) -> bool {
        match self {
            TypeInfo::Undefined | TypeInfo::Any => true,
            TypeInfo::Or { variants } => variants.iter().any(TypeInfo::accepts_missing),
            _ => false,
        }
    }

    /// Channels a value of this type may legally travel over.
    ///
    /// Strings, loose booleans, null, undefined and dates have a cheap string
    /// form and may go anywhere. Numbers, pinned booleans, `Any` and
    /// composites are body-only.
    pub fn sendable_via(&self) -> BTreeSet<Channel> {
        match self {
            TypeInfo::String { .. }
            | TypeInfo::AnyString
            | TypeInfo::Boolean { value: None }
            | TypeInfo::AnyBoolean
            | TypeInfo::Null
            | TypeInfo::Undefined
            | TypeInfo::Date => Channel::ALL.into_iter().collect(),
            TypeInfo::Number { .. }
            | TypeInfo::NumberRange { .. }
            | TypeInfo::AnyNumber
            | TypeInfo::Boolean { value: Some(_) }
            | TypeInfo::Any
            | TypeInfo::Object { .. }
            | TypeInfo::Array { .. } => BTreeSet::from([Channel::Body]),
            TypeInfo::Or { variants } => variants
                .iter()
                .flat_map(|variant| variant.sendable_via())
                .collect(),
        }
    }

    pub fn is_sendable_via(&self, channel: Channel) -> bool {
        self.sendable_via().contains(&channel)
    }

    /// Nested descriptors, in declaration order.
    pub fn children(&self) -> Vec<&TypeInfo> {
        match self {
            TypeInfo::Object { properties } => {
                properties.values().map(|property| &property.type_info).collect()
            }
            TypeInfo::Array { element, .. } => vec![element.as_ref()],
            TypeInfo::Or { variants } => variants.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Self-description as `{ "type": identifier, ... }`.
    pub fn json(&self) -> TypeResult<Value> {
        serde_json::to_value(self).map_err(|e| TypeError::MalformedDescription(e.to_string()))
    }

    /// Rebuild a descriptor from its `json()` form.
    pub fn from_json(description: &Value) -> TypeResult<Self> {
        serde_json::from_value(description.clone())
            .map_err(|e| TypeError::MalformedDescription(e.to_string()))
    }
}
