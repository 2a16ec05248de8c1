//! Query-string tokenizing, percent coding, and URL parameter merging.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Serialize;

/// Keys starting with this character are page-level flags, not search fields.
pub const INTERNAL_PREFIX: char = '_';
/// The one internal key that is still materialized as a form clause.
pub const SEARCH_KEY: &str = "_search";
/// Flag appended to "feeling lucky" navigations.
pub const LUCKY_KEY: &str = "_imfeelinglucky";
/// Pagination offset parameter.
pub const OFFSET_KEY: &str = "_offset";

// Same unreserved set as `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryParameter {
    pub key: String,
    pub value: String,
}

impl QueryParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn is_internal(&self) -> bool {
        is_internal_key(&self.key)
    }

    /// Whether this parameter becomes a clause when the form is built from a URL.
    pub fn materializes(&self) -> bool {
        materializes(&self.key)
    }
}

pub fn is_internal_key(key: &str) -> bool {
    key.starts_with(INTERNAL_PREFIX)
}

pub fn materializes(key: &str) -> bool {
    !is_internal_key(key) || key == SEARCH_KEY
}

/// Splits a raw query string (without the leading `?`) into decoded
/// parameters, preserving order and duplicates. Each token is split on its
/// first `=`; a token without one yields an empty value.
pub fn parse_query(query: &str) -> Vec<QueryParameter> {
    query
        .split('&')
        .filter(|token| !token.is_empty())
        .map(|token| {
            let (key, value) = token.split_once('=').unwrap_or((token, ""));
            QueryParameter::new(decode_component(key), decode_component(value))
        })
        .collect()
}

/// Percent-decodes a component the way `decodeURIComponent` does (`+` stays `+`).
pub fn decode_component(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Form-style encoding: spaces become `+`.
pub fn encode_form_value(value: &str) -> String {
    utf8_percent_encode(value, FORM_VALUE)
        .to_string()
        .replace("%20", "+")
}

/// Serializes decoded parameters back into a query string, in order.
pub fn build_query(params: &[QueryParameter]) -> String {
    params
        .iter()
        .map(|param| {
            format!(
                "{}={}",
                encode_component(&param.key),
                encode_component(&param.value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Insertion-ordered mapping of raw (still encoded) query keys to values.
///
/// Re-inserting an existing key replaces its value but keeps its original
/// position, so the last duplicate wins while order follows first sight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMap {
    entries: Vec<(String, Option<String>)>,
}

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a search string. A leading `?` is accepted, and both `?` and `&`
    /// act as separators.
    pub fn parse(search: &str) -> Self {
        let mut map = Self::new();
        for token in search.split(['?', '&']).filter(|token| !token.is_empty()) {
            match token.split_once('=') {
                Some((key, value)) => map.insert(key, Some(value.to_string())),
                None => map.insert(token, None),
            }
        }
        map
    }

    pub fn insert(&mut self, key: &str, value: Option<String>) {
        match self.entries.iter_mut().find(|(existing, _)| existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_deref().unwrap_or(""))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn to_query_string(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| match value {
                Some(value) => format!("{key}={value}"),
                None => key.clone(),
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Overlays `overrides` onto the query string of `url` and returns the
/// rebuilt URL. Existing pairs are kept verbatim; override keys and values
/// are percent-encoded and always win. Any `#fragment` is preserved.
pub fn merge_url_parameters<I, K, V>(url: &str, overrides: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let (base, search) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));

    let mut params = QueryMap::parse(search);
    for (key, value) in overrides {
        params.insert(
            &encode_component(key.as_ref()),
            Some(encode_component(value.as_ref())),
        );
    }

    let mut merged = base.to_string();
    if !params.is_empty() {
        merged.push('?');
        merged.push_str(&params.to_query_string());
    }
    if let Some(fragment) = fragment {
        merged.push('#');
        merged.push_str(fragment);
    }
    merged
}
