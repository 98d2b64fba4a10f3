//! Query parameters understood by the `.json` REST endpoint.

use std::collections::BTreeMap;

pub const ACCESS_TOKEN_PARAM: &str = "access_token";
pub const AUTH_PARAM: &str = "auth";
pub const SHALLOW_PARAM: &str = "shallow";
pub const FORMAT_PARAM: &str = "format";
pub const FORMAT_EXPORT: &str = "export";
pub const ORDER_BY_PARAM: &str = "orderBy";
pub const LIMIT_TO_FIRST_PARAM: &str = "limitToFirst";
pub const LIMIT_TO_LAST_PARAM: &str = "limitToLast";
pub const START_AT_PARAM: &str = "startAt";
pub const END_AT_PARAM: &str = "endAt";
pub const EQUAL_TO_PARAM: &str = "equalTo";

/// Query parameter map: name to values.
///
/// Keys are kept sorted so [`QueryParams::encode`] is canonical regardless of
/// the order parameters were set in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every value of `name` with `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), vec![value.into()]);
    }

    pub fn remove(&mut self, name: &str) {
        self.params.remove(name);
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// URL-encode as `k=v&k=v`, sorted by key.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, values) in &self.params {
            for value in values {
                serializer.append_pair(name, value);
            }
        }
        serializer.finish()
    }
}

/// JSON-encode a filter value: strings are quoted, numbers and booleans are
/// bare. `null` means "no filter".
pub(crate) fn json_param(value: &serde_json::Value) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(value.to_string())
    }
}
