//! Structural validation.
//!
//! `check_error` is the single source of truth; `check` is its success case.
//! Diagnostics are plain strings, never errors: callers decide whether a
//! mismatch becomes a 400.

use chrono::DateTime;
use serde_json::Value;

use super::info::TypeInfo;

impl TypeInfo {
    /// Membership test.
    pub fn check(&self, value: &Value) -> bool {
        self.check_error(value).is_none()
    }

    /// Human-readable reason `value` does not belong to this type, or `None`.
    pub fn check_error(&self, value: &Value) -> Option<String> {
        match self {
            TypeInfo::Any => None,
            TypeInfo::String { value: expected } => match (value, expected) {
                (Value::String(actual), Some(expected)) if actual != expected => {
                    Some(format!("Not the string {}, but {}", expected, actual))
                }
                (Value::String(_), _) => None,
                _ => Some(mismatch("a string", value)),
            },
            TypeInfo::AnyString => match value {
                Value::String(_) => None,
                _ => Some(mismatch("a string", value)),
            },
            TypeInfo::Number { value: expected } => match (value.as_f64(), expected) {
                (Some(actual), Some(expected)) if actual != *expected => {
                    Some(format!("Not the number {}, but {}", expected, actual))
                }
                (Some(_), _) => None,
                (None, _) => Some(mismatch("a number", value)),
            },
            TypeInfo::AnyNumber => match value {
                Value::Number(_) => None,
                _ => Some(mismatch("a number", value)),
            },
            TypeInfo::NumberRange { min, max } => match value.as_f64() {
                Some(actual) if actual < *min || actual > *max => Some(format!(
                    "Not a number between {} and {}, but {}",
                    min, max, actual
                )),
                Some(_) => None,
                None => Some(mismatch("a number", value)),
            },
            TypeInfo::Boolean { value: expected } => match (value, expected) {
                (Value::Bool(actual), Some(expected)) if actual != expected => {
                    Some(format!("Not the boolean {}, but {}", expected, actual))
                }
                (Value::Bool(_), _) => None,
                _ => Some(mismatch("a boolean", value)),
            },
            TypeInfo::AnyBoolean => match value {
                Value::Bool(_) => None,
                _ => Some(mismatch("a boolean", value)),
            },
            TypeInfo::Null => match value {
                Value::Null => None,
                _ => Some(mismatch("null", value)),
            },
            TypeInfo::Undefined => Some(mismatch("undefined", value)),
            TypeInfo::Date => match value {
                Value::String(s) => match DateTime::parse_from_rfc3339(s) {
                    Ok(_) => None,
                    Err(_) => Some(format!("Not an ISO-8601 date: {}", s)),
                },
                _ => Some(mismatch("a date", value)),
            },
            TypeInfo::Object { properties } => {
                let object = match value {
                    Value::Object(object) => object,
                    _ => return Some(mismatch("an object", value)),
                };
                for (name, property) in properties {
                    match object.get(name) {
                        Some(member) => {
                            if let Some(reason) = property.type_info.check_error(member) {
                                return Some(format!("{}: {}", name, reason));
                            }
                        }
                        None if property.required && !property.type_info.accepts_missing() => {
                            return Some(format!("{}: Missing required property", name));
                        }
                        None => {}
                    }
                }
                None
            }
            TypeInfo::Array {
                element,
                min_items,
                max_items,
            } => {
                let items = match value {
                    Value::Array(items) => items,
                    _ => return Some(mismatch("an array", value)),
                };
                if let Some(min) = min_items {
                    if items.len() < *min {
                        return Some(format!("Array is too short, needs to be at least {}", min));
                    }
                }
                if let Some(max) = max_items {
                    if items.len() > *max {
                        return Some(format!("Array is too long, needs to be at most {}", max));
                    }
                }
                items.iter().enumerate().find_map(|(index, item)| {
                    element
                        .check_error(item)
                        .map(|reason| format!("{}: {}", index, reason))
                })
            }
            TypeInfo::Or { variants } => {
                let mut reasons = Vec::with_capacity(variants.len());
                for variant in variants {
                    match variant.check_error(value) {
                        None => return None,
                        Some(reason) => reasons.push(reason),
                    }
                }
                Some(format!("No variant matched ({})", reasons.join("; ")))
            }
        }
    }
}

/// Runtime kind of a JSON value, with its article.
pub fn runtime_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("Not {}, but {}", expected, runtime_kind(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Property;
    use serde_json::json;

    fn user() -> TypeInfo {
        TypeInfo::object([("name", Property::required(TypeInfo::string()))])
    }

    #[test]
    fn test_object_required_property() {
        assert!(user().check(&json!({ "name": "x" })));
        assert!(user().check(&json!({ "name": "x", "extra": 1 })));
        assert!(!user().check(&json!({})));

        let reason = user().check_error(&json!({})).unwrap();
        assert!(reason.contains("name"));
    }

    #[test]
    fn test_object_optional_property_is_checked_when_present() {
        let ty = TypeInfo::object([("age", Property::optional(TypeInfo::number()))]);
        assert!(ty.check(&json!({})));
        assert_eq!(
            ty.check_error(&json!({ "age": "old" })).unwrap(),
            "age: Not a number, but a string"
        );
    }

    #[test]
    fn test_array_bounds() {
        let ty = TypeInfo::bounded_array(TypeInfo::string(), Some(2), Some(4));
        assert_eq!(
            ty.check_error(&json!(["a"])).unwrap(),
            "Array is too short, needs to be at least 2"
        );
        assert_eq!(
            ty.check_error(&json!(["a", "b", "c", "d", "e"])).unwrap(),
            "Array is too long, needs to be at most 4"
        );
        assert!(ty.check(&json!(["a", "b"])));
    }

    #[test]
    fn test_array_element_messages_are_indexed() {
        let ty = TypeInfo::array(TypeInfo::string());
        assert_eq!(
            ty.check_error(&json!([1])).unwrap(),
            "0: Not a string, but a number"
        );
        assert_eq!(
            ty.check_error(&json!({})).unwrap(),
            "Not an array, but an object"
        );
    }

    #[test]
    fn test_exact_values() {
        assert!(TypeInfo::exact_string("x").check(&json!("x")));
        assert_eq!(
            TypeInfo::exact_string("x").check_error(&json!("y")).unwrap(),
            "Not the string x, but y"
        );
        assert!(TypeInfo::exact_number(5.0).check(&json!(5)));
        assert!(!TypeInfo::exact_number(5.0).check(&json!(6)));
        assert!(!TypeInfo::exact_boolean(true).check(&json!(false)));
    }

    #[test]
    fn test_number_range_is_inclusive() {
        let ty = TypeInfo::number_range(1.0, 3.0);
        assert!(ty.check(&json!(1)));
        assert!(ty.check(&json!(3.0)));
        assert!(!ty.check(&json!(3.5)));
    }

    #[test]
    fn test_or_is_disjunction() {
        let ty = TypeInfo::or([TypeInfo::exact_string("a"), TypeInfo::exact_number(1.0)]);
        assert!(ty.check(&json!("a")));
        assert!(ty.check(&json!(1)));
        assert!(ty.check_error(&json!(true)).unwrap().starts_with("No variant matched"));
    }

    #[test]
    fn test_null_undefined_any() {
        assert!(TypeInfo::null().check(&Value::Null));
        assert!(!TypeInfo::null().check(&json!(0)));
        assert!(!TypeInfo::undefined().check(&Value::Null));
        assert!(TypeInfo::any().check(&json!({ "a": [1, 2] })));
    }

    #[test]
    fn test_date() {
        assert!(TypeInfo::date().check(&json!("2024-03-01T12:00:00Z")));
        assert!(!TypeInfo::date().check(&json!("yesterday")));
        assert_eq!(
            TypeInfo::date().check_error(&json!(3)).unwrap(),
            "Not a date, but a number"
        );
    }
}
