//! Gaussian smoothing, Difference of Gaussians and sharpening.
//!
//! [`gauss`] uses separable 2-pass convolution: a row pass with a `1 x w`
//! kernel, then a column pass with its transpose. [`gauss_2d`] convolves once
//! with the full outer-product kernel; both leave a zero band of `w / 2`
//! pixels around the image.

use super::core::{box_kernel, difference_of_gaussians, gaussian_1d, gaussian_2d, identity, linear_combine};
use super::scan::convolve;
use crate::error::Result;
use crate::grid::PixelGrid;

/// Apply separable Gaussian smoothing.
///
/// # Arguments
/// * `grid` - Input grid
/// * `sigma` - Standard deviation of the Gaussian
/// * `dim` - Kernel size; `0` picks the odd size just below `6 * sigma`
///
/// # Returns
/// Smoothed grid with same dimensions
pub fn gauss(grid: &PixelGrid, sigma: f64, dim: usize) -> Result<PixelGrid> {
    let row = gaussian_1d(sigma, dim)?;
    log::debug!("gauss sigma={} width={}", sigma, row.width());

    let horizontal = convolve(grid, &row)?;
    convolve(&horizontal, &row.transpose())
}

/// Apply Gaussian smoothing with the full 2D kernel.
pub fn gauss_2d(grid: &PixelGrid, sigma: f64, dim: usize) -> Result<PixelGrid> {
    convolve(grid, &gaussian_2d(sigma, dim)?)
}

/// Convolve with a Difference of Gaussians (band-pass).
pub fn dog(grid: &PixelGrid, sigma: f64, dim: usize) -> Result<PixelGrid> {
    convolve(grid, &difference_of_gaussians(sigma, dim)?)
}

/// Sharpen with `2 * identity(3, 3) - box(3, 3)`.
pub fn sharpen(grid: &PixelGrid) -> Result<PixelGrid> {
    let kernel = linear_combine(&identity(3, 3)?, &box_kernel(3, 3)?, 2.0, -1.0)?;
    convolve(grid, &kernel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(width: usize, height: usize, value: i32) -> PixelGrid {
        PixelGrid::from_vec(width, height, value, vec![value; width * height]).unwrap()
    }

    #[test]
    fn test_gauss_band_is_zero() {
        let out = gauss(&constant(9, 9, 100), 1.0, 0).unwrap();
        // Width 5 kernel: two pixel band
        assert_eq!(out.get(1, 4), Some(0));
        assert_eq!(out.get(4, 1), Some(0));
        assert!(out.get(4, 4).unwrap() > 0);
    }

    #[test]
    fn test_gauss_separable_matches_2d_on_interior() {
        let pixels = (0..121).map(|i| (i * 37 % 200) as i32).collect();
        let grid = PixelGrid::from_vec(11, 11, 200, pixels).unwrap();
        let a = gauss(&grid, 1.0, 5).unwrap();
        let b = gauss_2d(&grid, 1.0, 5).unwrap();

        // Flooring after the row pass can cost at most a couple of units
        for row in 2..9 {
            for col in 2..9 {
                let d = (a.get(row, col).unwrap() - b.get(row, col).unwrap()).abs();
                assert!(d <= 3, "({}, {}) differs by {}", row, col, d);
            }
        }
    }

    #[test]
    fn test_sharpen_keeps_flat_region() {
        let out = sharpen(&constant(5, 5, 90)).unwrap();
        assert_eq!(out.get(2, 2), Some(90));
    }

    #[test]
    fn test_sharpen_boosts_peak() {
        let mut grid = constant(3, 3, 10);
        grid.set(1, 1, 100);
        // 2*100 - (100 + 8*10)/9 = 180
        assert_eq!(sharpen(&grid).unwrap().get(1, 1), Some(180));
    }

    #[test]
    fn test_dog_rejects_bad_sigma() {
        assert!(dog(&constant(5, 5, 1), -1.0, 0).is_err());
    }
}
