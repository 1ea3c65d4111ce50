//! Conversion register.
//!
//! # Responsibilities
//! - Map a type identifier to its string export/import pair
//! - Let generic decoders work from a `{ "type": ... }` tag alone
//!
//! # Design Decisions
//! - An explicit service object, constructed once and passed around; there
//!   is no hidden global, so tests never leak codecs into each other
//! - Copy-on-write table behind `ArcSwap`: readers never block, writers
//!   serialize on a mutex and publish a fresh map
//! - Last writer wins unless the register is strict; every overwrite is
//!   logged so order-dependent decoding is visible

use arc_swap::ArcSwap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::error::{TypeError, TypeResult};
use super::info::TypeInfo;

/// Export function stored in the register.
pub type ExportFn = Arc<dyn Fn(&Value) -> TypeResult<String> + Send + Sync>;

/// Import function stored in the register.
pub type ImportFn = Arc<dyn Fn(&str) -> TypeResult<Value> + Send + Sync>;

/// String codec for one identifier.
#[derive(Clone)]
pub struct Codec {
    export: ExportFn,
    import: ImportFn,
    /// Descriptor the codec was derived from; `None` for custom codecs.
    origin: Option<Arc<TypeInfo>>,
}

impl Codec {
    /// Codec backed by a descriptor's own conversions.
    pub fn from_type(type_info: TypeInfo) -> Self {
        let origin = Arc::new(type_info);
        let exporter = origin.clone();
        let importer = origin.clone();
        Self {
            export: Arc::new(move |value: &Value| exporter.export_to_string(value)),
            import: Arc::new(move |input: &str| importer.import_from_string(input)),
            origin: Some(origin),
        }
    }

    /// Codec from arbitrary functions.
    pub fn custom<E, I>(export: E, import: I) -> Self
    where
        E: Fn(&Value) -> TypeResult<String> + Send + Sync + 'static,
        I: Fn(&str) -> TypeResult<Value> + Send + Sync + 'static,
    {
        Self {
            export: Arc::new(export),
            import: Arc::new(import),
            origin: None,
        }
    }

    pub fn export_to_string(&self, value: &Value) -> TypeResult<String> {
        (self.export)(value)
    }

    pub fn import_from_string(&self, input: &str) -> TypeResult<Value> {
        (self.import)(input)
    }

    pub fn origin(&self) -> Option<&TypeInfo> {
        self.origin.as_deref()
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Identifier → codec table.
pub struct ConversionRegister {
    codecs: ArcSwap<HashMap<String, Codec>>,
    writer: Mutex<()>,
    strict: bool,
}

impl ConversionRegister {
    /// Empty, last-writer-wins register.
    pub fn new() -> Self {
        Self {
            codecs: ArcSwap::from_pointee(HashMap::new()),
            writer: Mutex::new(()),
            strict: false,
        }
    }

    /// Empty register that refuses to replace a codec with a different one.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::new()
        }
    }

    /// Register seeded with one default instance of every variant.
    pub fn with_defaults(strict: bool) -> TypeResult<Self> {
        let register = if strict { Self::strict() } else { Self::new() };
        for type_info in default_types() {
            register.register(&type_info)?;
        }
        Ok(register)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Register a descriptor and every descriptor nested inside it.
    ///
    /// Nested descriptors are registered first, so the outermost instance
    /// owns its identifier afterwards.
    pub fn register(&self, type_info: &TypeInfo) -> TypeResult<()> {
        for child in type_info.children() {
            self.register(child)?;
        }
        self.insert(type_info.identifier(), Codec::from_type(type_info.clone()))
    }

    /// Install a custom codec, replacing the default decode logic for `identifier`.
    pub fn register_codec(&self, identifier: impl Into<String>, codec: Codec) -> TypeResult<()> {
        self.insert(&identifier.into(), codec)
    }

    fn insert(&self, identifier: &str, codec: Codec) -> TypeResult<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.codecs.load_full();

        if let Some(existing) = current.get(identifier) {
            let same_origin = match (existing.origin(), codec.origin()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
            if same_origin {
                return Ok(());
            }
            if self.strict {
                tracing::warn!(identifier, "Refusing to overwrite registered codec");
                return Err(TypeError::DuplicateIdentifier(identifier.to_string()));
            }
            tracing::debug!(identifier, "Overwriting registered codec");
        }

        let mut next = HashMap::clone(&current);
        next.insert(identifier.to_string(), codec);
        self.codecs.store(Arc::new(next));
        Ok(())
    }

    /// Codec registered under `identifier`.
    pub fn lookup(&self, identifier: &str) -> TypeResult<Codec> {
        self.codecs
            .load()
            .get(identifier)
            .cloned()
            .ok_or_else(|| TypeError::UnknownType(identifier.to_string()))
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.codecs.load().contains_key(identifier)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut identifiers: Vec<String> = self.codecs.load().keys().cloned().collect();
        identifiers.sort();
        identifiers
    }

    pub fn export_to_string(&self, identifier: &str, value: &Value) -> TypeResult<String> {
        self.lookup(identifier)?.export_to_string(value)
    }

    pub fn import_from_string(&self, identifier: &str, input: &str) -> TypeResult<Value> {
        self.lookup(identifier)?.import_from_string(input)
    }

    /// Decode `input` using only a serialized `{ "type": identifier, ... }` tag.
    pub fn import_tagged(&self, description: &Value, input: &str) -> TypeResult<Value> {
        self.import_from_string(tag_of(description)?, input)
    }

    /// Encode `value` using only a serialized `{ "type": identifier, ... }` tag.
    pub fn export_tagged(&self, description: &Value, value: &Value) -> TypeResult<String> {
        self.export_to_string(tag_of(description)?, value)
    }
}

impl Default for ConversionRegister {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConversionRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRegister")
            .field("identifiers", &self.identifiers())
            .field("strict", &self.strict)
            .finish()
    }
}

fn tag_of(description: &Value) -> TypeResult<&str> {
    description
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| TypeError::MalformedDescription("missing 'type' tag".to_string()))
}

fn default_types() -> Vec<TypeInfo> {
    vec![
        TypeInfo::string(),
        TypeInfo::number(),
        TypeInfo::number_range(f64::MIN, f64::MAX),
        TypeInfo::boolean(),
        TypeInfo::null(),
        TypeInfo::undefined(),
        TypeInfo::any(),
        TypeInfo::any_string(),
        TypeInfo::any_number(),
        TypeInfo::any_boolean(),
        TypeInfo::object(Vec::<(String, _)>::new()),
        TypeInfo::array(TypeInfo::any()),
        TypeInfo::or(Vec::new()),
        TypeInfo::date(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_unknown_identifier() {
        let register = ConversionRegister::new();
        let err = register.lookup("matrix").unwrap_err();
        assert_eq!(err, TypeError::UnknownType("matrix".into()));
    }

    #[test]
    fn test_register_includes_nested_types() {
        let register = ConversionRegister::new();
        register
            .register(&TypeInfo::array(TypeInfo::or([TypeInfo::date(), TypeInfo::null()])))
            .unwrap();
        assert_eq!(register.identifiers(), vec!["array", "date", "null", "or"]);
    }

    #[test]
    fn test_last_writer_wins() {
        let register = ConversionRegister::new();
        register
            .register(&TypeInfo::array(TypeInfo::number()))
            .unwrap();
        assert_eq!(register.import_from_string("array", "[1]").unwrap(), json!([1]));

        register
            .register(&TypeInfo::array(TypeInfo::string()))
            .unwrap();
        let codec = register.lookup("array").unwrap();
        assert_eq!(codec.origin(), Some(&TypeInfo::array(TypeInfo::string())));
        assert!(register.import_from_string("array", "[1]").is_err());
        assert_eq!(
            register.import_from_string("array", r#"["a"]"#).unwrap(),
            json!(["a"])
        );
    }

    #[test]
    fn test_strict_register_refuses_overwrite() {
        let register = ConversionRegister::strict();
        register.register(&TypeInfo::exact_string("a")).unwrap();
        // Identical descriptors are not a conflict.
        register.register(&TypeInfo::exact_string("a")).unwrap();

        let err = register.register(&TypeInfo::exact_string("b")).unwrap_err();
        assert_eq!(err, TypeError::DuplicateIdentifier("string".into()));
        assert_eq!(register.import_from_string("string", "a").unwrap(), json!("a"));
    }

    #[test]
    fn test_custom_codec_swaps_decoding() {
        let register = ConversionRegister::with_defaults(false).unwrap();
        register
            .register_codec(
                "boolean",
                Codec::custom(
                    |value| Ok(if value.as_bool() == Some(true) { "1" } else { "0" }.to_string()),
                    |input| Ok(Value::Bool(input == "1")),
                ),
            )
            .unwrap();
        assert_eq!(register.export_to_string("boolean", &json!(true)).unwrap(), "1");
        assert_eq!(register.import_from_string("boolean", "0").unwrap(), json!(false));
    }

    #[test]
    fn test_tagged_decode() {
        let register = ConversionRegister::with_defaults(false).unwrap();
        let description = TypeInfo::number().json().unwrap();
        assert_eq!(register.import_tagged(&description, "12").unwrap(), json!(12));
        assert_eq!(register.export_tagged(&description, &json!(12)).unwrap(), "12");
        assert!(register.import_tagged(&json!({}), "12").is_err());
    }

    #[test]
    fn test_defaults_cover_every_variant() {
        let register = ConversionRegister::with_defaults(true).unwrap();
        assert_eq!(register.identifiers().len(), 14);
        assert!(register.contains("numberRange"));
        assert!(register.export_to_string("any", &json!(1)).is_err());
    }
}
