//! Convolution kernels and the named kernel builders.
//!
//! This module provides the weight matrices shared by the filters:
//! - Box and identity kernels
//! - Sobel and Prewitt derivative masks
//! - Gaussian 1D/2D kernels and the Difference of Gaussians
//! - Linear combination of two kernels

use std::f64::consts::{FRAC_2_SQRT_PI, SQRT_2};

use ndarray::{Array2, ArrayView2};

use crate::error::{FilterError, Result};
use crate::grid::Span;

/// Ratio between the outer and inner sigma of a Difference of Gaussians.
pub const DOG_SIGMA_RATIO: f64 = 1.66;

const SOBEL_X: [[f64; 3]; 3] = [[1.0, 2.0, 1.0], [0.0, 0.0, 0.0], [-1.0, -2.0, -1.0]];
const SOBEL_Y: [[f64; 3]; 3] = [[1.0, 0.0, -1.0], [2.0, 0.0, -2.0], [1.0, 0.0, -1.0]];
const PREWITT_X: [[f64; 3]; 3] = [[1.0, 1.0, 1.0], [0.0, 0.0, 0.0], [-1.0, -1.0, -1.0]];
const PREWITT_Y: [[f64; 3]; 3] = [[1.0, 0.0, -1.0], [1.0, 0.0, -1.0], [1.0, 0.0, -1.0]];

/// Rectangular matrix of real weights, row-major, shape `(height, width)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    weights: Array2<f64>,
}

impl Kernel {
    /// All-zero kernel.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width < 1 || height < 1 {
            return Err(FilterError::InvalidDimensions { width, height });
        }
        Ok(Kernel {
            weights: Array2::zeros((height, width)),
        })
    }

    /// Kernel from row-major weights.
    pub fn from_weights(width: usize, height: usize, weights: Vec<f64>) -> Result<Self> {
        if width < 1 || height < 1 {
            return Err(FilterError::InvalidDimensions { width, height });
        }
        let expected = width * height;
        let found = weights.len();
        let weights = Array2::from_shape_vec((height, width), weights)
            .map_err(|_| FilterError::PixelCountMismatch { expected, found })?;
        Ok(Kernel { weights })
    }

    fn from_rows(rows: &[[f64; 3]; 3]) -> Self {
        Kernel {
            weights: Array2::from_shape_fn((3, 3), |(r, c)| rows[r][c]),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.weights.ncols()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.weights.nrows()
    }

    pub fn weights(&self) -> ArrayView2<'_, f64> {
        self.weights.view()
    }

    /// Half-extents `(width / 2, height / 2)`.
    pub fn span(&self) -> Span {
        Span::new(self.width() / 2, self.height() / 2)
    }

    /// True when both sides are odd, i.e. a unique center cell exists.
    pub fn has_center(&self) -> bool {
        self.width() % 2 == 1 && self.height() % 2 == 1
    }

    /// Row kernel becomes column kernel and vice versa.
    pub fn transpose(&self) -> Kernel {
        Kernel {
            weights: self.weights.t().to_owned(),
        }
    }

    pub fn sum(&self) -> f64 {
        self.weights.sum()
    }
}

/// Box kernel: every weight is `1 / (width * height)`.
pub fn box_kernel(width: usize, height: usize) -> Result<Kernel> {
    let mut kernel = Kernel::new(width, height)?;
    kernel.weights.fill(1.0 / (width * height) as f64);
    Ok(kernel)
}

/// Identity kernel: zero except the center weight, which is 1.
pub fn identity(width: usize, height: usize) -> Result<Kernel> {
    let mut kernel = Kernel::new(width, height)?;
    kernel.weights[[height / 2, width / 2]] = 1.0;
    Ok(kernel)
}

pub fn sobel_x() -> Kernel {
    Kernel::from_rows(&SOBEL_X)
}

pub fn sobel_y() -> Kernel {
    Kernel::from_rows(&SOBEL_Y)
}

pub fn prewitt_x() -> Kernel {
    Kernel::from_rows(&PREWITT_X)
}

pub fn prewitt_y() -> Kernel {
    Kernel::from_rows(&PREWITT_Y)
}

/// Default Gaussian size for `sigma`: the odd integer at or just below `6 * sigma`.
pub fn default_gaussian_size(sigma: f64) -> usize {
    let size = (6.0 * sigma) as usize;
    let size = if size % 2 == 1 { size } else { size.saturating_sub(1) };
    size.max(1)
}

fn check_sigma(sigma: f64) -> Result<()> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(FilterError::InvalidSigma(sigma));
    }
    Ok(())
}

/// `0` selects the default size; an explicit size must be odd.
fn resolve_size(sigma: f64, size: usize) -> Result<usize> {
    match size {
        0 => Ok(default_gaussian_size(sigma)),
        s if s % 2 == 0 => Err(FilterError::InvalidKernelSize {
            width: s,
            height: s,
        }),
        s => Ok(s),
    }
}

/// Samples of `exp(-x²/σ²) · (2/√π)/(√2·σ)` centered on the middle tap.
fn gaussian_profile(sigma: f64, size: usize) -> Vec<f64> {
    let gc = FRAC_2_SQRT_PI / (SQRT_2 * sigma);
    let sigma2 = sigma * sigma;
    let half = (size / 2) as f64;

    (0..size)
        .map(|i| {
            let x = i as f64 - half;
            gc * (-x * x / sigma2).exp()
        })
        .collect()
}

/// Generate a 1D Gaussian row kernel (`1` row, `width` columns).
///
/// # Arguments
/// * `sigma` - Standard deviation of the Gaussian
/// * `width` - Number of taps; `0` picks [`default_gaussian_size`]
///
/// Use [`Kernel::transpose`] for the column variant.
pub fn gaussian_1d(sigma: f64, width: usize) -> Result<Kernel> {
    check_sigma(sigma)?;
    let width = resolve_size(sigma, width)?;
    Kernel::from_weights(width, 1, gaussian_profile(sigma, width))
}

/// Generate a 2D Gaussian kernel as the outer product of two 1D profiles.
///
/// # Arguments
/// * `sigma` - Standard deviation of the Gaussian
/// * `dim` - Rows and columns; `0` picks [`default_gaussian_size`]
pub fn gaussian_2d(sigma: f64, dim: usize) -> Result<Kernel> {
    check_sigma(sigma)?;
    let dim = resolve_size(sigma, dim)?;
    let profile = gaussian_profile(sigma, dim);

    Ok(Kernel {
        weights: Array2::from_shape_fn((dim, dim), |(y, x)| profile[y] * profile[x]),
    })
}

/// Difference of Gaussians: `gaussian_2d(σ) - gaussian_2d(σ / 1.66)`.
///
/// Both Gaussians share the size resolved from the outer sigma.
pub fn difference_of_gaussians(sigma: f64, dim: usize) -> Result<Kernel> {
    check_sigma(sigma)?;
    let dim = resolve_size(sigma, dim)?;
    let outer = gaussian_2d(sigma, dim)?;
    let inner = gaussian_2d(sigma / DOG_SIGMA_RATIO, dim)?;
    linear_combine(&outer, &inner, 1.0, -1.0)
}

/// Element-wise `w1 * k1 + w2 * k2`.
pub fn linear_combine(k1: &Kernel, k2: &Kernel, w1: f64, w2: f64) -> Result<Kernel> {
    if k1.weights.dim() != k2.weights.dim() {
        return Err(FilterError::KernelMismatch {
            left: (k1.width(), k1.height()),
            right: (k2.width(), k2.height()),
        });
    }

    let weights = Array2::from_shape_fn(k1.weights.raw_dim(), |ix| {
        w1 * k1.weights[ix] + w2 * k2.weights[ix]
    });
    Ok(Kernel { weights })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_kernel_weights() {
        let k = box_kernel(3, 3).unwrap();
        assert!(k.weights().iter().all(|&w| (w - 1.0 / 9.0).abs() < 1e-12));
        assert!((k.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_identity_center() {
        let k = identity(3, 5).unwrap();
        assert_eq!(k.weights()[[2, 1]], 1.0);
        assert_eq!(k.sum(), 1.0);
    }

    #[test]
    fn test_derivative_masks() {
        let sx = sobel_x();
        assert_eq!(sx.weights()[[0, 1]], 2.0);
        assert_eq!(sx.weights()[[2, 1]], -2.0);
        let sy = sobel_y();
        assert_eq!(sy.weights()[[1, 0]], 2.0);
        assert_eq!(sy.weights()[[1, 2]], -2.0);
        assert_eq!(prewitt_x().sum(), 0.0);
        assert_eq!(prewitt_y().weights()[[2, 0]], 1.0);
    }

    #[test]
    fn test_default_gaussian_size() {
        assert_eq!(default_gaussian_size(1.0), 5);
        assert_eq!(default_gaussian_size(1.5), 9);
        assert_eq!(default_gaussian_size(2.0_f64.sqrt()), 7);
        assert_eq!(default_gaussian_size(0.1), 1);
    }

    #[test]
    fn test_gaussian_1d_closed_form() {
        let k = gaussian_1d(1.0, 0).unwrap();
        assert_eq!((k.width(), k.height()), (5, 1));

        let gc = FRAC_2_SQRT_PI / SQRT_2;
        let w = k.weights();
        assert!((w[[0, 2]] - gc).abs() < 1e-12);
        assert!((w[[0, 1]] - gc * (-1.0f64).exp()).abs() < 1e-12);
        assert_eq!(w[[0, 0]], w[[0, 4]]);
    }

    #[test]
    fn test_gaussian_rejects_bad_arguments() {
        assert_eq!(gaussian_1d(0.0, 0), Err(FilterError::InvalidSigma(0.0)));
        assert!(gaussian_2d(1.0, 4).is_err());
    }

    #[test]
    fn test_gaussian_2d_is_outer_product() {
        let row = gaussian_1d(1.2, 5).unwrap();
        let k = gaussian_2d(1.2, 5).unwrap();
        let r = row.weights();
        for y in 0..5 {
            for x in 0..5 {
                assert!((k.weights()[[y, x]] - r[[0, y]] * r[[0, x]]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_dog_is_difference() {
        let dog = difference_of_gaussians(2.0, 7).unwrap();
        let outer = gaussian_2d(2.0, 7).unwrap();
        let inner = gaussian_2d(2.0 / DOG_SIGMA_RATIO, 7).unwrap();
        let expected = outer.weights()[[3, 3]] - inner.weights()[[3, 3]];
        assert!((dog.weights()[[3, 3]] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_linear_combine_size_mismatch() {
        let a = box_kernel(3, 3).unwrap();
        let b = box_kernel(5, 5).unwrap();
        assert!(matches!(
            linear_combine(&a, &b, 1.0, 1.0),
            Err(FilterError::KernelMismatch { .. })
        ));
    }

    #[test]
    fn test_transpose_swaps_shape() {
        let row = gaussian_1d(1.0, 5).unwrap();
        let col = row.transpose();
        assert_eq!((col.width(), col.height()), (1, 5));
        assert_eq!(col.span(), Span::new(0, 2));
    }
}
