//! Type system error definitions.

use thiserror::Error;

/// Errors raised by conversions and the conversion register.
///
/// Validation failures are not errors: `check_error` reports them as plain
/// diagnostic strings. These variants cover conversions that cannot be
/// performed at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// The type does not support the requested conversion.
    #[error("Type '{identifier}' does not support {operation}")]
    Unsupported {
        identifier: &'static str,
        operation: &'static str,
    },

    /// No codec is registered under the identifier.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A string or JSON payload could not be decoded.
    #[error("Cannot decode '{input}' as {identifier}: {reason}")]
    Decode {
        identifier: &'static str,
        input: String,
        reason: String,
    },

    /// The value handed to an export does not belong to the type.
    #[error("Invalid value for {identifier}: {reason}")]
    InvalidValue {
        identifier: &'static str,
        reason: String,
    },

    /// A codec for the identifier already exists and the register is strict.
    #[error("Identifier '{0}' is already registered")]
    DuplicateIdentifier(String),

    /// A type description could not be turned back into a type.
    #[error("Malformed type description: {0}")]
    MalformedDescription(String),
}

/// Result type for type system operations.
pub type TypeResult<T> = Result<T, TypeError>;

impl TypeError {
    pub(crate) fn decode(
        identifier: &'static str,
        input: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Decode {
            identifier,
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid(identifier: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            identifier,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TypeError::Unsupported {
            identifier: "any",
            operation: "string export",
        };
        assert_eq!(err.to_string(), "Type 'any' does not support string export");

        let err = TypeError::UnknownType("matrix".into());
        assert_eq!(err.to_string(), "Unknown type: matrix");
    }
}
