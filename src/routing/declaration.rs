//! Expected request and response shapes of a route.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::http::Request;
use crate::types::{Channel, TypeInfo};

/// Declared body, query, params and return types of a context.
///
/// Query and params values arrive as strings and are decoded through the
/// declared type before checking. A parameter whose type accepts a missing
/// value is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<TypeInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, TypeInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, TypeInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeInfo>,
}

impl Declaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, type_info: TypeInfo) -> Self {
        self.body = Some(type_info);
        self
    }

    pub fn query(mut self, name: impl Into<String>, type_info: TypeInfo) -> Self {
        self.query.insert(name.into(), type_info);
        self
    }

    pub fn param(mut self, name: impl Into<String>, type_info: TypeInfo) -> Self {
        self.params.insert(name.into(), type_info);
        self
    }

    pub fn returns(mut self, type_info: TypeInfo) -> Self {
        self.returns = Some(type_info);
        self
    }

    /// Every descriptor in the declaration.
    pub fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.body
            .iter()
            .chain(self.query.values())
            .chain(self.params.values())
            .chain(self.returns.iter())
    }

    /// Declared query and params entries whose types cannot travel over
    /// their channel.
    pub fn channel_violations(&self) -> Vec<String> {
        let query = self
            .query
            .iter()
            .filter(|(_, ty)| !ty.is_sendable_via(Channel::Query))
            .map(|(name, ty)| format!("query.{} ({}) is not sendable via query", name, ty.identifier()));
        let params = self
            .params
            .iter()
            .filter(|(_, ty)| !ty.is_sendable_via(Channel::Param))
            .map(|(name, ty)| format!("params.{} ({}) is not sendable via param", name, ty.identifier()));
        query.chain(params).collect()
    }

    /// First reason the request does not match the declaration.
    pub fn check_request(&self, request: &Request) -> Option<String> {
        if let Some(body) = &self.body {
            if let Some(reason) = body.check_error(&request.body) {
                return Some(format!("body: {}", reason));
            }
        }
        if let Err(reason) = self.decode_query(request) {
            return Some(reason);
        }
        self.decode_params(request).err()
    }

    /// Declared query values, decoded through their types.
    pub fn decode_query(&self, request: &Request) -> Result<Map<String, Value>, String> {
        decode_strings("query", &self.query, &request.query)
    }

    /// Declared params values, decoded through their types.
    pub fn decode_params(&self, request: &Request) -> Result<Map<String, Value>, String> {
        decode_strings("params", &self.params, &request.params)
    }

    /// Reason `value` does not match the declared return type.
    pub fn check_returns(&self, value: &Value) -> Option<String> {
        self.returns
            .as_ref()
            .and_then(|ty| ty.check_error(value))
            .map(|reason| format!("returns: {}", reason))
    }
}

fn decode_strings(
    channel: &str,
    declared: &BTreeMap<String, TypeInfo>,
    raw: &BTreeMap<String, String>,
) -> Result<Map<String, Value>, String> {
    let mut decoded = Map::new();
    for (name, ty) in declared {
        match raw.get(name) {
            Some(input) => {
                let value = ty
                    .import_from_string(input)
                    .map_err(|e| format!("{}.{}: {}", channel, name, e))?;
                decoded.insert(name.clone(), value);
            }
            None if ty.accepts_missing() => {}
            None => return Err(format!("{}.{}: Missing required parameter", channel, name)),
        }
    }
    Ok(decoded)
}
