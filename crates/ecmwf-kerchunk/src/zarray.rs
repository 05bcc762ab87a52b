//! Zarr v2 `.zarray` schema handling.
//!
//! Schemas in a reference mapping are JSON text. Patching the filter
//! declaration works on the text itself so that every other field keeps its
//! exact bytes and position; [`ZarrayMeta`] is the parsed, read-only view.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{KerchunkError, Result};

/// A declared filter, e.g. `{"dtype": "float64", "id": "grib", "var": "mwd"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub id: String,
    #[serde(flatten)]
    pub config: Map<String, Value>,
}

/// Parsed `.zarray` metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ZarrayMeta {
    #[serde(default)]
    pub chunks: Vec<u64>,
    #[serde(default)]
    pub dtype: String,
    #[serde(default)]
    pub shape: Vec<u64>,
    #[serde(default)]
    pub filters: Option<Vec<FilterSpec>>,
    #[serde(default)]
    pub compressor: Option<Value>,
    #[serde(default)]
    pub fill_value: Option<Value>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub zarr_format: Option<u32>,
}

impl ZarrayMeta {
    /// Parse a schema string stored under `key`.
    pub fn parse(key: &str, text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| KerchunkError::malformed_schema(key, e.to_string()))
    }

    /// Whether the dtype is a little-endian (or endian-neutral) 8-byte float.
    pub fn is_float64(&self) -> bool {
        matches!(self.dtype.as_str(), "<f8" | "|f8" | "f8" | "float64")
    }

    /// Ids of the declared filters, in declaration order.
    pub fn filter_ids(&self) -> Vec<&str> {
        self.filters
            .as_ref()
            .map(|f| f.iter().map(|spec| spec.id.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Byte spans of one top-level `"name": value` pair.
#[derive(Debug, Clone, PartialEq)]
struct FieldSpan {
    /// Name without the surrounding quotes.
    name: Range<usize>,
    /// Value with surrounding whitespace excluded.
    value: Range<usize>,
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Returns the index just past the closing quote of the string at `i`.
fn skip_string(bytes: &[u8], i: usize) -> std::result::Result<usize, String> {
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'"' => return Ok(j + 1),
            _ => j += 1,
        }
    }
    Err(format!("unterminated string starting at byte {}", i))
}

/// Returns the index of the `,` or `}` ending the value that starts at `i`.
fn scan_value(bytes: &[u8], mut i: usize) -> std::result::Result<usize, String> {
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i)?;
                continue;
            }
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                if depth == 0 {
                    if bytes[i] == b'}' {
                        return Ok(i);
                    }
                    return Err(format!("unbalanced ']' at byte {}", i));
                }
                depth -= 1;
            }
            b',' if depth == 0 => return Ok(i),
            _ => {}
        }
        i += 1;
    }
    Err("unterminated object".to_string())
}

fn top_level_fields(text: &str) -> std::result::Result<Vec<FieldSpan>, String> {
    let bytes = text.as_bytes();
    let mut i = skip_whitespace(bytes, 0);
    if bytes.get(i) != Some(&b'{') {
        return Err("schema is not a JSON object".to_string());
    }
    i += 1;

    let mut fields = Vec::new();
    loop {
        i = skip_whitespace(bytes, i);
        match bytes.get(i) {
            Some(b'}') if fields.is_empty() => {
                i += 1;
                break;
            }
            Some(b'"') => {}
            _ => return Err(format!("expected field name at byte {}", i)),
        }

        let name_end = skip_string(bytes, i)?;
        let name = i + 1..name_end - 1;

        i = skip_whitespace(bytes, name_end);
        if bytes.get(i) != Some(&b':') {
            return Err(format!("expected ':' at byte {}", i));
        }
        let value_start = skip_whitespace(bytes, i + 1);
        let terminator = scan_value(bytes, value_start)?;

        let mut value_end = terminator;
        while value_end > value_start && bytes[value_end - 1].is_ascii_whitespace() {
            value_end -= 1;
        }
        if value_end == value_start {
            return Err(format!("field at byte {} has no value", name.start));
        }
        fields.push(FieldSpan {
            name,
            value: value_start..value_end,
        });

        i = terminator + 1;
        if bytes[terminator] == b'}' {
            break;
        }
    }

    if skip_whitespace(bytes, i) != bytes.len() {
        return Err(format!("trailing characters after byte {}", i));
    }
    Ok(fields)
}

/// Replace the value of the first top-level field whose name contains
/// `filter` with `declaration`, leaving all other bytes untouched.
///
/// `key` is only used for error reporting.
pub fn patch_filters(key: &str, schema: &str, declaration: &str) -> Result<String> {
    let fields =
        top_level_fields(schema).map_err(|reason| KerchunkError::malformed_schema(key, reason))?;

    let field = fields
        .iter()
        .find(|f| schema[f.name.clone()].contains("filter"))
        .ok_or_else(|| KerchunkError::malformed_schema(key, "no filters field"))?;

    let mut patched = String::with_capacity(schema.len() + declaration.len());
    patched.push_str(&schema[..field.value.start]);
    patched.push_str(declaration);
    patched.push_str(&schema[field.value.end..]);
    Ok(patched)
}
