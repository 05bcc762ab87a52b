//! Shared test utilities for the ecmwf-kerchunk workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Coordinate axis generators
//! - Reference mapping fixtures modelled on real ECMWF scans
//! - Approximate equality assertions for floating point axes
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, fixtures, ecmwf_latitudes};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro asserting two axes have the same length and agree element-wise.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_axis_approx_eq;
///
/// assert_axis_approx_eq!(&[0.0, 0.5], &[0.0, 0.5000001], 1e-6);
/// ```
#[macro_export]
macro_rules! assert_axis_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: &[f64] = $left;
        let right: &[f64] = $right;
        if left.len() != right.len() {
            panic!(
                "assertion failed: axis lengths differ\n  left: `{}`,\n right: `{}`",
                left.len(),
                right.len()
            );
        }
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let diff = (l - r).abs();
            if diff > $epsilon {
                panic!(
                    "assertion failed: axes differ at index {}\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}`",
                    i, l, r, diff
                );
            }
        }
    }};
}
