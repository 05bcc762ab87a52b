//! Coordinate axis generators for range-compression tests.
//!
//! Axes are built as `start + step * i`, the way GRIB decoders produce
//! regular latitude/longitude grids, so that the floating point noise in
//! the samples matches what a real scan contains.

/// Creates an evenly spaced axis of `count` samples.
///
/// # Example
///
/// ```
/// use test_utils::regular_axis;
///
/// let axis = regular_axis(0.0, 0.25, 5);
/// assert_eq!(axis, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
/// ```
pub fn regular_axis(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

/// ECMWF open-data latitudes: 90.0 down to -90.0 every 0.4 degrees (451 values).
pub fn ecmwf_latitudes() -> Vec<f64> {
    regular_axis(90.0, -0.4, 451)
}

/// ECMWF open-data longitudes: -180.0 up to 179.6 every 0.4 degrees (900 values).
pub fn ecmwf_longitudes() -> Vec<f64> {
    regular_axis(-180.0, 0.4, 900)
}

/// A 0.25 degree global latitude axis (721 values, 90 to -90).
pub fn quarter_degree_latitudes() -> Vec<f64> {
    regular_axis(90.0, -0.25, 721)
}

/// An axis whose spacing drifts by `jitter` at every other sample.
///
/// Useful for exercising the non-uniform spacing warning.
pub fn jittered_axis(start: f64, step: f64, count: usize, jitter: f64) -> Vec<f64> {
    regular_axis(start, step, count)
        .into_iter()
        .enumerate()
        .map(|(i, v)| if i % 2 == 1 { v + jitter } else { v })
        .collect()
}

/// Little-endian bytes of an f64 axis, as stored in a chunk.
pub fn f64_le_bytes(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Little-endian bytes of an i64 array (time chunks).
pub fn i64_le_bytes(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}
