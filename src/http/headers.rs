//! Header input normalization.
//!
//! Callers may hand headers over as a list of pairs, a plain mapping, or a
//! pre-built [`HeaderMap`]. All three go through [`normalize_headers`] and are
//! handled as one case-insensitive `HeaderMap` from then on.

use std::collections::{BTreeMap, HashMap};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidHeader {
    #[error("invalid header name {0:?}")]
    Name(String),
    #[error("invalid value for header {0:?}")]
    Value(String),
}

/// Header input in any of the accepted shapes.
#[derive(Debug, Clone)]
pub enum HeaderInit {
    Pairs(Vec<(String, String)>),
    Map(BTreeMap<String, String>),
    Headers(HeaderMap),
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for HeaderInit {
    fn from(pairs: Vec<(K, V)>) -> Self {
        HeaderInit::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for HeaderInit {
    fn from(pairs: [(K, V); N]) -> Self {
        HeaderInit::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<BTreeMap<String, String>> for HeaderInit {
    fn from(map: BTreeMap<String, String>) -> Self {
        HeaderInit::Map(map)
    }
}

impl From<HashMap<String, String>> for HeaderInit {
    fn from(map: HashMap<String, String>) -> Self {
        HeaderInit::Map(map.into_iter().collect())
    }
}

impl From<HeaderMap> for HeaderInit {
    fn from(headers: HeaderMap) -> Self {
        HeaderInit::Headers(headers)
    }
}

/// Convert any accepted header shape into a `HeaderMap`.
///
/// Repeated names in the pair form are appended, matching how a header
/// collection built from pairs behaves.
pub fn normalize_headers(init: HeaderInit) -> Result<HeaderMap, InvalidHeader> {
    match init {
        HeaderInit::Headers(headers) => Ok(headers),
        HeaderInit::Pairs(pairs) => {
            let mut headers = HeaderMap::with_capacity(pairs.len());
            for (name, value) in pairs {
                let (name, value) = parse_pair(&name, &value)?;
                headers.append(name, value);
            }
            Ok(headers)
        }
        HeaderInit::Map(map) => {
            let mut headers = HeaderMap::with_capacity(map.len());
            for (name, value) in map {
                let (name, value) = parse_pair(&name, &value)?;
                headers.insert(name, value);
            }
            Ok(headers)
        }
    }
}

fn parse_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), InvalidHeader> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| InvalidHeader::Name(name.to_string()))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|_| InvalidHeader::Value(name.to_string()))?;
    Ok((header_name, header_value))
}

/// Overlay `overrides` on top of `defaults`. A name present in `overrides`
/// replaces every default value for that name.
pub fn merge_headers(defaults: &HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    for name in overrides.keys() {
        merged.remove(name);
    }
    for (name, value) in overrides {
        merged.append(name.clone(), value.clone());
    }
    merged
}
