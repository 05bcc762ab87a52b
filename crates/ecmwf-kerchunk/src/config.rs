//! Configuration for the index rewriter.

use serde::{Deserialize, Serialize};

use crate::error::{KerchunkError, Result};

/// Maximum absolute deviation tolerated between consecutive differences.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Number of decimals the representative increment is snapped to.
pub const DEFAULT_INCREMENT_DECIMALS: u32 = 2;

/// Keys kept in a minimal wave-forecast index.
pub const WAVE_INDEX_KEYS: &[&str] = &[
    "time/0",
    "mp2/0.0.0",
    "mwd/0.0.0",
    "mwp/0.0.0",
    "swh/0.0.0",
    "pp1d/0.0.0",
    "valid_time/0",
    "step/0",
];

/// Which keys of the rewritten mapping are handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySelection {
    /// The whole rewritten mapping.
    Full,
    /// Only the listed keys (missing ones are skipped silently).
    Minimal(Vec<String>),
}

impl Default for KeySelection {
    fn default() -> Self {
        Self::Full
    }
}

impl KeySelection {
    /// The allow-list used for wave forecast items.
    pub fn wave_index() -> Self {
        Self::Minimal(WAVE_INDEX_KEYS.iter().map(|k| k.to_string()).collect())
    }
}

/// Configuration for [`IndexRewriter`](crate::IndexRewriter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Uniformity tolerance for coordinate spacing.
    pub tolerance: f64,

    /// Decimals the mean increment is snapped to (None keeps the raw mean).
    pub increment_decimals: Option<u32>,

    /// Keys to keep after rewriting.
    pub key_selection: KeySelection,

    /// Coordinate arrays compressed with the range filter.
    pub coordinate_keys: Vec<String>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            increment_decimals: Some(DEFAULT_INCREMENT_DECIMALS),
            key_selection: KeySelection::Full,
            coordinate_keys: vec!["latitude".to_string(), "longitude".to_string()],
        }
    }
}

impl RewriteConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("KERCHUNK_RANGE_TOLERANCE") {
            if let Ok(tolerance) = val.parse() {
                config.tolerance = tolerance;
            }
        }

        if let Ok(val) = std::env::var("KERCHUNK_RANGE_DECIMALS") {
            if val.eq_ignore_ascii_case("none") {
                config.increment_decimals = None;
            } else if let Ok(decimals) = val.parse() {
                config.increment_decimals = Some(decimals);
            }
        }

        if let Ok(val) = std::env::var("KERCHUNK_MINIMAL_INDEX") {
            if val.to_lowercase() == "true" || val == "1" {
                config.key_selection = KeySelection::wave_index();
            }
        }

        config
    }

    /// Use the minimal wave-forecast allow-list.
    pub fn minimal(mut self) -> Self {
        self.key_selection = KeySelection::wave_index();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(KerchunkError::InvalidConfig(format!(
                "tolerance must be a positive finite number, got {}",
                self.tolerance
            )));
        }

        if let Some(decimals) = self.increment_decimals {
            if decimals > 15 {
                return Err(KerchunkError::InvalidConfig(format!(
                    "increment_decimals must be 0-15, got {}",
                    decimals
                )));
            }
        }

        if self.coordinate_keys.is_empty() {
            return Err(KerchunkError::InvalidConfig(
                "coordinate_keys must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
