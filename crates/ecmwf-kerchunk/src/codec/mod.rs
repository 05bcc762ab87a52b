//! Chunk filters applied to raw chunk bytes.
//!
//! A filter is identified by the `id` that appears in the `filters` field of a
//! `.zarray` schema. Filters are resolved through a [`FilterRegistry`] owned by
//! the caller; nothing is registered process-wide.

pub mod range;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{KerchunkError, Result};
use crate::zarray::ZarrayMeta;

pub use range::{
    bytes_to_f64s, f64s_to_bytes, RangeCodec, RangeEncoding, RangeTriple, UniformityWarning,
    RANGE_FILTER_ID, TRIPLE_LEN,
};

/// A reversible transform over the bytes of one chunk.
pub trait ChunkFilter: Send + Sync + fmt::Debug {
    /// Identifier written into filter declarations.
    fn id(&self) -> &str;

    /// Encode raw chunk bytes.
    fn encode(&self, chunk: &[u8]) -> Result<Vec<u8>>;

    /// Decode bytes produced by [`ChunkFilter::encode`].
    fn decode(&self, chunk: &[u8]) -> Result<Vec<u8>>;

    /// The `filters` value declaring this filter alone.
    fn declaration(&self) -> String {
        filter_declaration(self.id())
    }
}

/// Render a single-filter declaration, e.g. `[{"id": "range"}]`.
pub fn filter_declaration(id: &str) -> String {
    format!(r#"[{{"id": "{}"}}]"#, id)
}

/// Filters available to the decode side, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Arc<dyn ChunkFilter>>,
}

impl FilterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing the range filter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(RangeCodec::default()));
        registry
    }

    /// Register a filter, replacing any filter with the same id.
    pub fn register(&mut self, filter: Arc<dyn ChunkFilter>) {
        self.filters.insert(filter.id().to_string(), filter);
    }

    /// Look up a filter by id.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn ChunkFilter>> {
        self.filters.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.filters.contains_key(id)
    }

    /// Decode a chunk through the filters declared in a `.zarray` schema.
    ///
    /// Filters are undone in reverse declaration order. A schema without
    /// filters returns the chunk unchanged.
    pub fn decode_chunk(&self, meta: &ZarrayMeta, chunk: &[u8]) -> Result<Vec<u8>> {
        let Some(specs) = &meta.filters else {
            return Ok(chunk.to_vec());
        };

        let mut data = chunk.to_vec();
        for spec in specs.iter().rev() {
            let filter = self
                .get(&spec.id)
                .ok_or_else(|| KerchunkError::UnsupportedFilter(spec.id.clone()))?;
            data = filter.decode(&data)?;
        }
        Ok(data)
    }
}
