//! String and JSON conversions.
//!
//! # Design Decisions
//! - Exports validate first: only members of the type can be exported
//! - Scalars use their natural text form; composites and `Or` use JSON text,
//!   which keeps `import_from_string(export_to_string(v)) == v`
//! - Dates round-trip verbatim; `date_value` produces the canonical form
//! - `Any` has no string form and `Undefined` has no value at all

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Number, Value};

use super::error::{TypeError, TypeResult};
use super::info::TypeInfo;

impl TypeInfo {
    /// Encode `value` into its transport-safe string form.
    pub fn export_to_string(&self, value: &Value) -> TypeResult<String> {
        match self {
            TypeInfo::Any => return Err(self.unsupported("string export")),
            TypeInfo::Undefined => return Err(self.unsupported("string export")),
            _ => {}
        }
        self.ensure_member(value)?;

        match (self, value) {
            (_, Value::String(s)) if !self.uses_json_text() => Ok(s.clone()),
            (_, Value::Number(n)) if !self.uses_json_text() => Ok(n.to_string()),
            (_, Value::Bool(b)) if !self.uses_json_text() => Ok(b.to_string()),
            (_, Value::Null) if !self.uses_json_text() => Ok("null".to_string()),
            _ => serde_json::to_string(value)
                .map_err(|e| TypeError::invalid(self.identifier(), e.to_string())),
        }
    }

    /// Decode a value from its string form.
    pub fn import_from_string(&self, input: &str) -> TypeResult<Value> {
        let identifier = self.identifier();
        let value = match self {
            TypeInfo::Any | TypeInfo::Undefined => {
                return Err(self.unsupported("string import"));
            }
            TypeInfo::String { .. } | TypeInfo::AnyString | TypeInfo::Date => {
                Value::String(input.to_string())
            }
            TypeInfo::Number { .. } | TypeInfo::NumberRange { .. } | TypeInfo::AnyNumber => {
                parse_number(input).ok_or_else(|| TypeError::decode(identifier, input, "not a number"))?
            }
            TypeInfo::Boolean { .. } | TypeInfo::AnyBoolean => match input.trim() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Err(TypeError::decode(identifier, input, "not a boolean")),
            },
            TypeInfo::Null => match input.trim() {
                "null" => Value::Null,
                _ => return Err(TypeError::decode(identifier, input, "not null")),
            },
            TypeInfo::Object { .. } | TypeInfo::Array { .. } => {
                serde_json::from_str(input).map_err(|e| TypeError::decode(identifier, input, e))?
            }
            TypeInfo::Or { variants } => return import_first_variant(self, variants, input),
        };

        match self.check_error(&value) {
            None => Ok(value),
            Some(reason) => Err(TypeError::decode(identifier, input, reason)),
        }
    }

    /// Encode `value` as JSON. `Any` passes through unchanged.
    pub fn export_to_json(&self, value: &Value) -> TypeResult<Value> {
        if let TypeInfo::Undefined = self {
            return Err(self.unsupported("JSON export"));
        }
        self.ensure_member(value)?;
        Ok(value.clone())
    }

    /// Decode a value from JSON.
    ///
    /// Dates additionally accept epoch milliseconds and normalize them to
    /// RFC 3339.
    pub fn import_from_json(&self, json: &Value) -> TypeResult<Value> {
        let value = match (self, json) {
            (TypeInfo::Undefined, _) => return Err(self.unsupported("JSON import")),
            (TypeInfo::Date, Value::Number(millis)) => {
                let millis = millis
                    .as_i64()
                    .ok_or_else(|| TypeError::decode("date", millis.to_string(), "not an integer"))?;
                let at = Utc
                    .timestamp_millis_opt(millis)
                    .single()
                    .ok_or_else(|| TypeError::decode("date", millis.to_string(), "out of range"))?;
                date_value(&at)
            }
            _ => json.clone(),
        };

        match self.check_error(&value) {
            None => Ok(value),
            Some(reason) => Err(TypeError::decode(self.identifier(), json.to_string(), reason)),
        }
    }

    fn uses_json_text(&self) -> bool {
        matches!(
            self,
            TypeInfo::Object { .. } | TypeInfo::Array { .. } | TypeInfo::Or { .. }
        )
    }

    fn ensure_member(&self, value: &Value) -> TypeResult<()> {
        match self.check_error(value) {
            None => Ok(()),
            Some(reason) => Err(TypeError::invalid(self.identifier(), reason)),
        }
    }

    fn unsupported(&self, operation: &'static str) -> TypeError {
        TypeError::Unsupported {
            identifier: self.identifier(),
            operation,
        }
    }
}

/// Canonical JSON form of a timestamp (RFC 3339, milliseconds, `Z`).
pub fn date_value<Tz: TimeZone>(at: &DateTime<Tz>) -> Value {
    Value::String(at.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parse a date value produced by `date_value` or any RFC 3339 string.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|at| at.with_timezone(&Utc))
}

fn parse_number(input: &str) -> Option<Value> {
    let trimmed = input.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    if let Ok(n) = trimmed.parse::<u64>() {
        return Some(Value::Number(n.into()));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// `Or` exports JSON text; plain query strings fall back to the variants in order.
///
/// Input that parses as JSON is taken as JSON, so a query value `"x"` with
/// literal quotes imports as the string `x`.
fn import_first_variant(ty: &TypeInfo, variants: &[TypeInfo], input: &str) -> TypeResult<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(input) {
        if ty.check(&value) {
            return Ok(value);
        }
    }
    variants
        .iter()
        .find_map(|variant| variant.import_from_string(input).ok())
        .ok_or_else(|| TypeError::decode("or", input, "no variant accepted the input"))
}
