//! Compact kerchunk indices for ECMWF open-data GRIB2 files.
//!
//! Scanning a GRIB2 file produces a kerchunk reference mapping: schema text,
//! small inline arrays and byte ranges into the source file. This crate turns
//! that mapping into the compact form embedded in STAC items:
//!
//! - **Range compression**: evenly spaced latitude/longitude axes are stored
//!   as a 24-byte `(start, stop, increment)` triple and declared with the
//!   `range` filter
//! - **Inline normalisation**: remaining inline chunks are base64 encoded
//! - **Key selection**: optionally keep only the keys a product needs
//!
//! It also carries the product vocabulary (reference times, streams, types,
//! steps), the table of published combinations and the per-stream merge
//! rules used when combining scanned messages.
//!
//! # Architecture
//!
//! ```text
//! GRIB2 scan (external)
//!      │
//!      ▼
//! ReferenceMapping ──► IndexRewriter::rewrite
//!                           │
//!                           ├─► RangeCodec (latitude/0, longitude/0)
//!                           ├─► patch_filters (latitude/.zarray, longitude/.zarray)
//!                           └─► base64 wrapping (other inline chunks)
//!                                     │
//!                                     ▼
//!                           compact ReferenceMapping ──► STAC item (external)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ecmwf_kerchunk::{IndexRewriter, ReferenceMapping, RewriteConfig};
//!
//! let mapping = ReferenceMapping::from_json_str(&scanned)?;
//! let outcome = IndexRewriter::new(RewriteConfig::from_env())?.rewrite(mapping)?;
//! for w in &outcome.warnings {
//!     eprintln!("{}: {}", w.key, w.warning);
//! }
//! let json = outcome.mapping.to_json_string()?;
//! ```

pub mod codec;
pub mod combinations;
pub mod config;
pub mod error;
pub mod merge_rules;
pub mod refs;
pub mod rewriter;
pub mod zarray;

// Re-export commonly used types at crate root
pub use codec::{
    filter_declaration, ChunkFilter, FilterRegistry, RangeCodec, RangeEncoding, RangeTriple,
    UniformityWarning, RANGE_FILTER_ID,
};
pub use combinations::{get_combinations, group_by_asset, AssetKey, Combination, Step, StepUnit};
pub use config::{KeySelection, RewriteConfig, WAVE_INDEX_KEYS};
pub use error::{KerchunkError, Result};
pub use merge_rules::{merge_plan, MergePlan, MergeStage, MessageSelector};
pub use refs::{KeyKind, RefValue, ReferenceMapping};
pub use rewriter::{
    compress_coordinates, rewrite, wrap_inline_values, CoordinateWarning, IndexRewriter,
    RewriteOutcome, RewriteStats,
};
pub use zarray::{patch_filters, FilterSpec, ZarrayMeta};
