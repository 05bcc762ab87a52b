//! Range compression of evenly spaced coordinate axes.
//!
//! An axis such as `[90.0, 89.6, ..., -90.0]` is stored as three
//! little-endian f64 values `(start, stop, increment)` where `stop` is one
//! increment past the last sample. Decoding produces the half-open sequence
//! of every `start + i * increment` strictly before `stop`. The sample count
//! is `ceil((stop - start) / increment)` less a small guard, so a stop that
//! lands a rounding error past a sample boundary does not add a sample.
//!
//! # Example
//!
//! ```
//! use ecmwf_kerchunk::codec::{RangeCodec, RangeTriple};
//!
//! let codec = RangeCodec::default();
//! let encoding = codec.encode_values(&[0.0, 0.5, 1.0, 1.5]).unwrap();
//! assert_eq!(encoding.triple, RangeTriple::new(0.0, 2.0, 0.5));
//! assert!(encoding.warning.is_none());
//!
//! let values = codec.decode_values(&encoding.to_bytes()).unwrap();
//! assert_eq!(values, vec![0.0, 0.5, 1.0, 1.5]);
//! ```

use std::fmt;

use tracing::warn;

use super::ChunkFilter;
use crate::config::{RewriteConfig, DEFAULT_INCREMENT_DECIMALS, DEFAULT_TOLERANCE};
use crate::error::{KerchunkError, Result};

/// Filter id of the range codec.
pub const RANGE_FILTER_ID: &str = "range";

/// Size of an encoded range triple in bytes.
pub const TRIPLE_LEN: usize = 24;

const F64_LEN: usize = std::mem::size_of::<f64>();

/// Upper bound on the number of samples a triple may expand to.
const MAX_DECODED_LEN: f64 = 1.0e8;

/// Relative slack on the sample count when decoding.
const COUNT_GUARD: f64 = 1.0e-9;

/// Interpret little-endian bytes as f64 samples.
pub fn bytes_to_f64s(buf: &[u8]) -> Result<Vec<f64>> {
    if buf.len() % F64_LEN != 0 {
        return Err(KerchunkError::malformed_buffer(format!(
            "{} bytes is not a whole number of f64 values",
            buf.len()
        )));
    }

    Ok(buf
        .chunks_exact(F64_LEN)
        .map(|chunk| {
            let mut raw = [0u8; F64_LEN];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect())
}

/// Serialize f64 samples as little-endian bytes.
pub fn f64s_to_bytes(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// The compressed `(start, stop, increment)` form of an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeTriple {
    pub start: f64,
    /// One increment past the last sample.
    pub stop: f64,
    pub increment: f64,
}

impl RangeTriple {
    pub fn new(start: f64, stop: f64, increment: f64) -> Self {
        Self {
            start,
            stop,
            increment,
        }
    }

    /// Parse a 24-byte buffer.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() != TRIPLE_LEN {
            return Err(KerchunkError::malformed_buffer(format!(
                "range triple must be {} bytes, got {}",
                TRIPLE_LEN,
                buf.len()
            )));
        }

        let values = bytes_to_f64s(buf)?;
        Ok(Self::new(values[0], values[1], values[2]))
    }

    pub fn to_bytes(&self) -> [u8; TRIPLE_LEN] {
        let mut out = [0u8; TRIPLE_LEN];
        out[..8].copy_from_slice(&self.start.to_le_bytes());
        out[8..16].copy_from_slice(&self.stop.to_le_bytes());
        out[16..].copy_from_slice(&self.increment.to_le_bytes());
        out
    }

    /// Number of samples the triple expands to.
    pub fn len(&self) -> Result<usize> {
        if !(self.start.is_finite() && self.stop.is_finite() && self.increment.is_finite()) {
            return Err(KerchunkError::malformed_buffer(format!(
                "non-finite range triple {:?}",
                self
            )));
        }
        if self.increment == 0.0 {
            return Err(KerchunkError::malformed_buffer("range increment is zero"));
        }

        let ratio = (self.stop - self.start) / self.increment;
        // Rounding in start and stop is at most a few ulps of their magnitude
        let ulps = 4.0 * f64::EPSILON * self.start.abs().max(self.stop.abs())
            / self.increment.abs();
        let slack = COUNT_GUARD * ratio.abs().max(1.0) + ulps;
        let steps = (ratio - slack).ceil();
        if steps <= 0.0 {
            return Ok(0);
        }
        if !steps.is_finite() || steps > MAX_DECODED_LEN {
            return Err(KerchunkError::malformed_buffer(format!(
                "range triple expands to {} samples",
                steps
            )));
        }
        Ok(steps as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Expand into the sampled axis.
    pub fn values(&self) -> Result<Vec<f64>> {
        let n = self.len()?;
        Ok((0..n)
            .map(|i| self.start + i as f64 * self.increment)
            .collect())
    }
}

/// Non-fatal report that an axis is not uniformly spaced within tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformityWarning {
    pub start: f64,
    pub increment: f64,
    /// Largest |difference - increment| over consecutive samples.
    pub max_deviation: f64,
    pub tolerance: f64,
    /// Number of samples in the input.
    pub expected_len: usize,
    /// Number of samples the encoded triple expands to.
    pub reconstructed_len: usize,
}

impl fmt::Display for UniformityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "spacing deviates by {:e} from increment {} (tolerance {:e}); {} samples reconstruct as {}",
            self.max_deviation,
            self.increment,
            self.tolerance,
            self.expected_len,
            self.reconstructed_len
        )
    }
}

/// Result of encoding an axis.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeEncoding {
    pub triple: RangeTriple,
    pub warning: Option<UniformityWarning>,
}

impl RangeEncoding {
    pub fn to_bytes(&self) -> [u8; TRIPLE_LEN] {
        self.triple.to_bytes()
    }
}

/// Range codec for f64 axes.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCodec {
    tolerance: f64,
    increment_decimals: Option<u32>,
}

impl Default for RangeCodec {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            increment_decimals: Some(DEFAULT_INCREMENT_DECIMALS),
        }
    }
}

impl RangeCodec {
    pub fn new(tolerance: f64, increment_decimals: Option<u32>) -> Self {
        Self {
            tolerance,
            increment_decimals,
        }
    }

    pub fn from_config(config: &RewriteConfig) -> Self {
        Self::new(config.tolerance, config.increment_decimals)
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// `value` rounded to the configured decimals, if that moves it by no more
    /// than the tolerance and does not round it to zero.
    fn snap(&self, value: f64) -> Option<f64> {
        let decimals = self.increment_decimals?;
        let scale = 10f64.powi(decimals as i32);
        let snapped = (value * scale).round() / scale;
        (snapped != 0.0 && (snapped - value).abs() <= self.tolerance).then_some(snapped)
    }

    /// Encode an axis of at least two finite, evenly spaced samples.
    ///
    /// Spacing irregularities never fail the encode; they are reported in
    /// [`RangeEncoding::warning`].
    pub fn encode_values(&self, values: &[f64]) -> Result<RangeEncoding> {
        if values.len() < 2 {
            return Err(KerchunkError::invalid_sequence(format!(
                "need at least 2 samples, got {}",
                values.len()
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(KerchunkError::invalid_sequence(format!(
                "non-finite sample {}",
                bad
            )));
        }

        let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
        if mean == 0.0 {
            return Err(KerchunkError::invalid_sequence("samples have zero spacing"));
        }

        let snapped = self.snap(mean);
        let increment = snapped.unwrap_or(mean);
        let max_deviation = diffs
            .iter()
            .map(|d| (d - increment).abs())
            .fold(0.0, f64::max);

        let start = values[0];
        let last = values[values.len() - 1];
        // The stop is only tidied alongside a tidied increment
        let stop = match snapped {
            Some(_) => self.snap(last + increment).unwrap_or(last + increment),
            None => last + increment,
        };

        let triple = RangeTriple::new(start, stop, increment);
        let reconstructed_len = triple.len()?;

        let warning = if max_deviation > self.tolerance || reconstructed_len != values.len() {
            Some(UniformityWarning {
                start,
                increment,
                max_deviation,
                tolerance: self.tolerance,
                expected_len: values.len(),
                reconstructed_len,
            })
        } else {
            None
        };

        Ok(RangeEncoding { triple, warning })
    }

    /// Decode a 24-byte triple into the sampled axis.
    pub fn decode_values(&self, buf: &[u8]) -> Result<Vec<f64>> {
        RangeTriple::from_bytes(buf)?.values()
    }
}

impl ChunkFilter for RangeCodec {
    fn id(&self) -> &str {
        RANGE_FILTER_ID
    }

    fn encode(&self, chunk: &[u8]) -> Result<Vec<u8>> {
        let values = bytes_to_f64s(chunk)?;
        let encoding = self.encode_values(&values)?;
        if let Some(w) = &encoding.warning {
            warn!(
                start = w.start,
                increment = w.increment,
                max_deviation = w.max_deviation,
                tolerance = w.tolerance,
                "Range encoding may not be exact"
            );
        }
        Ok(encoding.to_bytes().to_vec())
    }

    fn decode(&self, chunk: &[u8]) -> Result<Vec<u8>> {
        Ok(f64s_to_bytes(&self.decode_values(chunk)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(start: f64, step: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn test_encode_descending_latitudes() {
        let lats = axis(90.0, -0.4, 451);
        let encoding = RangeCodec::default().encode_values(&lats).unwrap();

        assert_eq!(encoding.triple.start, 90.0);
        assert_eq!(encoding.triple.increment, -0.4);
        assert_eq!(encoding.triple.stop, -90.4);
        assert!(encoding.warning.is_none());
        assert_eq!(&encoding.to_bytes()[..8], &90.0f64.to_le_bytes());
    }

    #[test]
    fn test_longitude_stop_is_snapped() {
        // -180 + 0.4 * 899 is 179.60000000000002 in f64
        let lons = axis(-180.0, 0.4, 900);
        let triple = RangeCodec::default().encode_values(&lons).unwrap().triple;
        assert_eq!(triple, RangeTriple::new(-180.0, 180.0, 0.4));
        assert_eq!(triple.len().unwrap(), 900);
    }

    #[test]
    fn test_unsnappable_increment_keeps_mean() {
        let values = axis(0.0, 1.0 / 3.0, 10);
        let encoding = RangeCodec::default().encode_values(&values).unwrap();
        assert!((encoding.triple.increment - 1.0 / 3.0).abs() < 1e-15);
        assert!(encoding.warning.is_none());

        let decoded = RangeCodec::default().decode_values(&encoding.to_bytes()).unwrap();
        assert_eq!(decoded.len(), 10);
        for (a, b) in decoded.iter().zip(&values) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_snapping_disabled() {
        let codec = RangeCodec::new(1e-10, None);
        let values = axis(1.0, 0.25, 5);
        let triple = codec.encode_values(&values).unwrap().triple;
        assert_eq!(triple, RangeTriple::new(1.0, 2.25, 0.25));
    }

    #[test]
    fn test_irregular_spacing_warns_but_encodes() {
        let values = vec![0.0, 1.0, 2.5, 3.0];
        let encoding = RangeCodec::default().encode_values(&values).unwrap();

        let warning = encoding.warning.expect("expected a uniformity warning");
        assert_eq!(warning.increment, 1.0);
        assert!((warning.max_deviation - 0.5).abs() < 1e-12);
        assert_eq!(warning.expected_len, 4);
        assert_eq!(encoding.triple.start, 0.0);
        assert!(warning.to_string().contains("deviates"));
    }

    #[test]
    fn test_encode_rejects_short_and_degenerate_input() {
        let codec = RangeCodec::default();
        assert!(matches!(
            codec.encode_values(&[1.0]),
            Err(KerchunkError::InvalidSequence(_))
        ));
        assert!(matches!(
            codec.encode_values(&[]),
            Err(KerchunkError::InvalidSequence(_))
        ));
        assert!(matches!(
            codec.encode_values(&[2.0, 2.0, 2.0]),
            Err(KerchunkError::InvalidSequence(_))
        ));
        assert!(matches!(
            codec.encode_values(&[0.0, f64::NAN]),
            Err(KerchunkError::InvalidSequence(_))
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let codec = RangeCodec::default();
        for len in [0, 8, 23, 25, 48] {
            let err = codec.decode_values(&vec![0u8; len]).unwrap_err();
            assert!(matches!(err, KerchunkError::MalformedBuffer(_)), "len {}", len);
        }
    }

    #[test]
    fn test_decode_rejects_zero_increment() {
        let bytes = RangeTriple::new(1.0, 2.0, 0.0).to_bytes();
        assert!(matches!(
            RangeCodec::default().decode_values(&bytes),
            Err(KerchunkError::MalformedBuffer(_))
        ));
    }

    #[test]
    fn test_decode_is_half_open() {
        let codec = RangeCodec::default();
        let decode = |t: RangeTriple| codec.decode_values(&t.to_bytes()).unwrap();

        assert_eq!(decode(RangeTriple::new(0.0, 1.0, 0.3)).len(), 4);
        assert_eq!(decode(RangeTriple::new(0.0, 0.4, 1.0)), vec![0.0]);
        assert_eq!(decode(RangeTriple::new(0.0, 3.0, 1.0)), vec![0.0, 1.0, 2.0]);
        assert_eq!(decode(RangeTriple::new(0.0, 3.5, 1.0)), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(decode(RangeTriple::new(4.0, 0.5, -1.0)), vec![4.0, 3.0, 2.0, 1.0]);
        assert!(decode(RangeTriple::new(1.0, 1.0, 0.5)).is_empty());
    }

    #[test]
    fn test_stop_past_boundary_by_rounding_adds_no_sample() {
        // 360 / 0.4 is 900.0000000000001 in f64
        assert_eq!(RangeTriple::new(-180.0, 180.0, 0.4).len().unwrap(), 900);
        assert_eq!(RangeTriple::new(90.0, -90.4, -0.4).len().unwrap(), 451);
        assert_eq!(RangeTriple::new(0.1, 100.1, 0.1).len().unwrap(), 1000);
    }

    #[test]
    fn test_tiny_increment_keeps_length() {
        let codec = RangeCodec::default();
        for values in [vec![5.0, 5.00000000001], vec![90.0, 89.99999999998, 89.99999999996]] {
            let encoding = codec.encode_values(&values).unwrap();
            assert_ne!(encoding.triple.stop, encoding.triple.start);
            assert!(encoding.warning.is_none(), "{:?}", encoding.warning);

            let decoded = codec.decode_values(&encoding.to_bytes()).unwrap();
            assert_eq!(decoded.len(), values.len());
        }
    }

    #[test]
    fn test_decode_rejects_unbounded_count() {
        let triple = RangeTriple::new(0.0, 1.0, f64::MIN_POSITIVE / 4.0);
        assert!(matches!(triple.len(), Err(KerchunkError::MalformedBuffer(_))));
    }

    #[test]
    fn test_decode_wrong_direction_is_empty() {
        let bytes = RangeTriple::new(0.0, 10.0, -1.0).to_bytes();
        assert!(RangeCodec::default().decode_values(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_triple_byte_layout() {
        let triple = RangeTriple::new(-180.0, 180.0, 0.4);
        let bytes = triple.to_bytes();
        assert_eq!(bytes.len(), TRIPLE_LEN);
        assert_eq!(bytes_to_f64s(&bytes).unwrap(), vec![-180.0, 180.0, 0.4]);
        assert_eq!(RangeTriple::from_bytes(&bytes).unwrap(), triple);
    }

    #[test]
    fn test_chunk_filter_roundtrip() {
        let codec = RangeCodec::default();
        let values = axis(-10.0, 0.5, 41);
        let encoded = codec.encode(&f64s_to_bytes(&values)).unwrap();
        assert_eq!(encoded.len(), TRIPLE_LEN);

        let decoded = bytes_to_f64s(&codec.decode(&encoded).unwrap()).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_chunk_filter_rejects_partial_values() {
        let err = RangeCodec::default().encode(&[0u8; 12]).unwrap_err();
        assert!(matches!(err, KerchunkError::MalformedBuffer(_)));
    }
}
