//! Compaction of kerchunk reference mappings.
//!
//! One pass over the mapping:
//!
//! ```text
//! ReferenceMapping
//!      │
//!      ├─► <coord>/0        decode f64 axis ─► RangeCodec ─► base64:<24 bytes>
//!      ├─► <coord>/.zarray  filters field ─► [{"id": "range"}]
//!      ├─► other inline     wrap as base64:<utf-8 bytes> unless already marked
//!      ├─► schema / ranges  untouched
//!      │
//!      └─► optional allow-list selection
//! ```
//!
//! Coordinate keys are validated before anything is written, so a failed
//! rewrite leaves the mapping unchanged.

use tracing::{debug, warn};

use crate::codec::{bytes_to_f64s, ChunkFilter, RangeCodec, UniformityWarning};
use crate::config::{KeySelection, RewriteConfig};
use crate::error::{KerchunkError, Result};
use crate::refs::{
    classify, decode_inline, encode_inline, is_base64, KeyKind, RefValue, ReferenceMapping,
};
use crate::zarray::{patch_filters, ZarrayMeta};

/// Uniformity warning raised while compressing a specific key.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateWarning {
    pub key: String,
    pub warning: UniformityWarning,
}

/// Counts of what a rewrite pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Inline values newly wrapped in base64.
    pub wrapped: usize,
    /// Inline values that already carried the base64 marker.
    pub already_encoded: usize,
    /// Coordinate axes replaced by range triples.
    pub compressed: usize,
    /// Schema strings whose filters were patched.
    pub patched_schemas: usize,
    /// Byte-range references left untouched.
    pub byte_ranges: usize,
    /// Keys removed by the allow-list.
    pub dropped: usize,
}

/// Output of [`IndexRewriter::rewrite`].
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOutcome {
    pub mapping: ReferenceMapping,
    pub warnings: Vec<CoordinateWarning>,
    pub stats: RewriteStats,
}

/// Replacement values for one coordinate array.
struct CompressedCoordinate {
    chunk_key: String,
    chunk: String,
    schema_key: String,
    schema: String,
    warning: Option<UniformityWarning>,
}

/// Rewrites reference mappings into their compact form.
#[derive(Debug, Clone)]
pub struct IndexRewriter {
    config: RewriteConfig,
    codec: RangeCodec,
}

impl Default for IndexRewriter {
    fn default() -> Self {
        let config = RewriteConfig::default();
        Self {
            codec: RangeCodec::from_config(&config),
            config,
        }
    }
}

impl IndexRewriter {
    /// Create a rewriter, validating the configuration.
    pub fn new(config: RewriteConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            codec: RangeCodec::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Compress coordinates, wrap inline values and apply the key selection.
    pub fn rewrite(&self, mut mapping: ReferenceMapping) -> Result<RewriteOutcome> {
        let mut stats = RewriteStats::default();

        let warnings = self.compress_coordinates(&mut mapping, &mut stats)?;
        wrap_with_stats(&mut mapping, &self.config.coordinate_keys, &mut stats);

        let mapping = match &self.config.key_selection {
            KeySelection::Full => mapping,
            KeySelection::Minimal(keys) => {
                let selected = mapping.select_keys(keys);
                stats.dropped = mapping.len() - selected.len();
                selected
            }
        };

        debug!(
            keys = mapping.len(),
            wrapped = stats.wrapped,
            already_encoded = stats.already_encoded,
            compressed = stats.compressed,
            byte_ranges = stats.byte_ranges,
            dropped = stats.dropped,
            "Rewrote reference mapping"
        );

        Ok(RewriteOutcome {
            mapping,
            warnings,
            stats,
        })
    }

    fn compress_coordinates(
        &self,
        mapping: &mut ReferenceMapping,
        stats: &mut RewriteStats,
    ) -> Result<Vec<CoordinateWarning>> {
        for name in &self.config.coordinate_keys {
            mapping.require(&format!("{}/0", name))?;
            mapping.require(&format!("{}/.zarray", name))?;
        }

        let compressed = self
            .config
            .coordinate_keys
            .iter()
            .map(|name| self.compress_coordinate(mapping, name))
            .collect::<Result<Vec<_>>>()?;

        let mut warnings = Vec::new();
        for coord in compressed {
            if let Some(warning) = coord.warning {
                warn!(
                    key = %coord.chunk_key,
                    start = warning.start,
                    increment = warning.increment,
                    max_deviation = warning.max_deviation,
                    tolerance = warning.tolerance,
                    reconstructed_len = warning.reconstructed_len,
                    "Coordinate spacing is not uniform, range encoding may be lossy"
                );
                warnings.push(CoordinateWarning {
                    key: coord.chunk_key.clone(),
                    warning,
                });
            }
            mapping.insert(coord.chunk_key, coord.chunk);
            mapping.insert(coord.schema_key, coord.schema);
            stats.compressed += 1;
            stats.patched_schemas += 1;
        }

        Ok(warnings)
    }

    fn compress_coordinate(
        &self,
        mapping: &ReferenceMapping,
        name: &str,
    ) -> Result<CompressedCoordinate> {
        let chunk_key = format!("{}/0", name);
        let schema_key = format!("{}/.zarray", name);

        let raw = mapping.require_inline(&chunk_key)?;
        let schema = mapping.require_inline(&schema_key)?;

        let meta = ZarrayMeta::parse(&schema_key, schema)?;
        if !meta.is_float64() {
            return Err(KerchunkError::malformed_buffer(format!(
                "{} has dtype {:?}, expected <f8",
                chunk_key, meta.dtype
            )));
        }

        let values = bytes_to_f64s(&decode_inline(raw)?)?;
        if let [len] = meta.shape.as_slice() {
            if *len as usize != values.len() {
                return Err(KerchunkError::malformed_buffer(format!(
                    "{} holds {} values but its schema declares {}",
                    chunk_key,
                    values.len(),
                    len
                )));
            }
        }

        let encoding = self.codec.encode_values(&values)?;
        let patched = patch_filters(&schema_key, schema, &self.codec.declaration())?;

        Ok(CompressedCoordinate {
            chunk_key,
            chunk: encode_inline(&encoding.to_bytes()),
            schema_key,
            schema: patched,
            warning: encoding.warning,
        })
    }
}

fn wrap_with_stats(
    mapping: &mut ReferenceMapping,
    coordinates: &[String],
    stats: &mut RewriteStats,
) {
    for (key, value) in mapping.refs.iter_mut() {
        match classify(key, value, coordinates) {
            KeyKind::ByteRange => stats.byte_ranges += 1,
            KeyKind::Schema | KeyKind::Coordinate => {}
            KeyKind::Inline => {
                if let RefValue::Inline(raw) = value {
                    if is_base64(raw) {
                        stats.already_encoded += 1;
                    } else {
                        *raw = encode_inline(raw.as_bytes());
                        stats.wrapped += 1;
                    }
                }
            }
        }
    }
}

/// Base64-wrap every inline chunk that is not a schema or a latitude/longitude
/// entry and is not already marked. Returns the number of values wrapped.
pub fn wrap_inline_values(mapping: &mut ReferenceMapping) -> usize {
    let mut stats = RewriteStats::default();
    wrap_with_stats(
        mapping,
        &RewriteConfig::default().coordinate_keys,
        &mut stats,
    );
    stats.wrapped
}

/// Range-compress `latitude/0` and `longitude/0` and declare the range filter
/// on their schemas.
pub fn compress_coordinates(mapping: &mut ReferenceMapping) -> Result<Vec<CoordinateWarning>> {
    IndexRewriter::default().compress_coordinates(mapping, &mut RewriteStats::default())
}

/// Rewrite with the default configuration.
pub fn rewrite(mapping: ReferenceMapping) -> Result<ReferenceMapping> {
    Ok(IndexRewriter::default().rewrite(mapping)?.mapping)
}
