//! Kerchunk reference mapping model.
//!
//! A mapping is the JSON document `{"version": 1, "refs": {...}}` produced by
//! scanning GRIB2 files. Each ref is either an inline value (literal chunk
//! bytes or schema text) or a pointer into the source file.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{KerchunkError, Result};

/// Marker that identifies an already base64-encoded inline value.
pub const BASE64_MARKER: &str = "base64";

/// Prefix written in front of base64 payloads.
pub const BASE64_PREFIX: &str = "base64:";

fn default_version() -> u32 {
    1
}

/// The value stored under one key of a reference mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefValue {
    /// Literal chunk data or schema text.
    Inline(String),
    /// `[url, offset, length]` byte range inside a source file.
    Range(String, u64, u64),
    /// `[url]`, the whole source file.
    Url((String,)),
}

impl RefValue {
    pub fn range(url: impl Into<String>, offset: u64, length: u64) -> Self {
        Self::Range(url.into(), offset, length)
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }

    pub fn as_inline(&self) -> Option<&str> {
        match self {
            Self::Inline(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for RefValue {
    fn from(s: &str) -> Self {
        Self::Inline(s.to_string())
    }
}

impl From<String> for RefValue {
    fn from(s: String) -> Self {
        Self::Inline(s)
    }
}

/// How the rewriter treats a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Pointer into a source file, never rewritten.
    ByteRange,
    /// `.zarray`, `.zattrs`, `.zgroup` text.
    Schema,
    /// Inline chunk of a coordinate array.
    Coordinate,
    /// Any other inline chunk.
    Inline,
}

/// Whether the last path segment of `key` is a zarr metadata document.
pub fn is_schema_key(key: &str) -> bool {
    key.rsplit('/').next().is_some_and(|segment| segment.starts_with('.'))
}

/// Array name of a chunk or schema key (`"mwd/0.0.0"` → `"mwd"`).
pub fn array_name(key: &str) -> Option<&str> {
    key.split_once('/').map(|(name, _)| name)
}

/// Classify a key/value pair.
///
/// Keys that mention any of `coordinates` anywhere in their path are treated
/// as coordinate data.
pub fn classify(key: &str, value: &RefValue, coordinates: &[String]) -> KeyKind {
    if !value.is_inline() {
        KeyKind::ByteRange
    } else if is_schema_key(key) {
        KeyKind::Schema
    } else if coordinates.iter().any(|c| key.contains(c.as_str())) {
        KeyKind::Coordinate
    } else {
        KeyKind::Inline
    }
}

/// Whether an inline value already carries the base64 marker.
pub fn is_base64(value: &str) -> bool {
    value.starts_with(BASE64_MARKER)
}

/// Encode bytes as a `base64:`-prefixed inline value.
pub fn encode_inline(bytes: &[u8]) -> String {
    format!("{}{}", BASE64_PREFIX, STANDARD.encode(bytes))
}

/// Raw bytes of an inline value, decoding base64 payloads.
pub fn decode_inline(value: &str) -> Result<Vec<u8>> {
    match value.strip_prefix(BASE64_PREFIX) {
        Some(payload) => Ok(STANDARD.decode(payload)?),
        None => Ok(value.as_bytes().to_vec()),
    }
}

/// A kerchunk reference mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMapping {
    #[serde(default = "default_version")]
    pub version: u32,

    pub refs: BTreeMap<String, RefValue>,

    /// Other top-level fields (e.g. `templates`), kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ReferenceMapping {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceMapping {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            refs: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.refs.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&RefValue> {
        self.refs.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RefValue>) {
        self.refs.insert(key.into(), value.into());
    }

    /// The value under `key`, which must exist.
    pub fn require(&self, key: &str) -> Result<&RefValue> {
        self.refs.get(key).ok_or_else(|| KerchunkError::missing_key(key))
    }

    /// The inline value under `key`; byte-range references are rejected.
    pub fn require_inline(&self, key: &str) -> Result<&str> {
        self.require(key)?.as_inline().ok_or_else(|| {
            KerchunkError::malformed_buffer(format!(
                "{} is a byte-range reference, not inline data",
                key
            ))
        })
    }

    /// Copy keeping only `keys` (absent keys are skipped).
    pub fn select_keys<S: AsRef<str>>(&self, keys: &[S]) -> Self {
        let refs = keys
            .iter()
            .filter_map(|k| {
                let k = k.as_ref();
                self.refs.get(k).map(|v| (k.to_string(), v.clone()))
            })
            .collect();
        Self {
            version: self.version,
            refs,
            extra: self.extra.clone(),
        }
    }

    /// Names of arrays that have a `.zarray` schema.
    pub fn array_names(&self) -> Vec<&str> {
        self.refs
            .keys()
            .filter_map(|k| k.strip_suffix("/.zarray"))
            .collect()
    }
}
