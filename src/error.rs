//! Error types for the filtering core.
//!
//! Every core operation validates its arguments on entry and reports a
//! [`FilterError`] instead of writing a partial result.

use thiserror::Error;

/// Errors raised by grid, kernel and filter operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// A grid or kernel was requested with a zero dimension.
    #[error("dimensions must both be greater than 0, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// Two grids that must share a size do not.
    #[error("grid size mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Two kernels that must share a size do not.
    #[error("kernel size mismatch: {left:?} vs {right:?}")]
    KernelMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    /// A raw pixel buffer does not hold `width * height` values.
    #[error("pixel buffer holds {found} values, expected {expected}")]
    PixelCountMismatch { expected: usize, found: usize },

    /// A kernel without a unique center cell was handed to the scan engine,
    /// or an explicit Gaussian size was even.
    #[error("kernel size {width}x{height} must be odd in both directions")]
    InvalidKernelSize { width: usize, height: usize },

    /// Gaussian sigma must be strictly positive and finite.
    #[error("sigma must be positive, got {0}")]
    InvalidSigma(f64),

    /// Hysteresis needs `low < high`.
    #[error("low threshold {low} must be below high threshold {high}")]
    InvalidThresholds { low: i32, high: i32 },

    /// Noise density outside `[0, 1]`.
    #[error("density must lie in [0, 1], got {0}")]
    InvalidDensity(f64),

    /// The sample range is too wide to bucket.
    #[error("histogram range {min}..={max} exceeds {limit} buckets")]
    HistogramRange { min: i32, max: i32, limit: usize },
}

/// Result alias used across the filtering core.
pub type Result<T> = std::result::Result<T, FilterError>;
