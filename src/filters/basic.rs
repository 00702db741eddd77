//! Pixel-wise operations: absolute value, threshold, weighted sum, gradient
//! magnitude and phase, inversion, flip and tonal stretching.
//!
//! These operations look at one pixel (or one pixel pair) at a time and write
//! every pixel of the output, borders included.

use std::f64::consts::PI;

use ndarray::Zip;

use crate::error::Result;
use crate::grid::PixelGrid;

/// Binary foreground value.
pub const FOREGROUND: i32 = 255;

/// Phase scale: `atan2` radians map onto `[-127, 127]`.
pub const PHASE_SCALE: f64 = 127.0;

/// Build a grid from `src` by mapping every pixel; `max_val` becomes the
/// largest output value, floored at 0.
fn map_pixels<F>(src: &PixelGrid, f: F) -> PixelGrid
where
    F: Fn(i32) -> i32,
{
    let mut out = src.zeros_like();
    Zip::from(out.pixels_mut())
        .and(src.pixels())
        .for_each(|o, &p| *o = f(p));
    let max_val = out.observed_max().max(0);
    out.set_max_val(max_val);
    out
}

/// Same as [`map_pixels`] for a pair of equally sized grids.
fn zip_pixels<F>(a: &PixelGrid, b: &PixelGrid, f: F) -> Result<PixelGrid>
where
    F: Fn(i32, i32) -> i32,
{
    a.ensure_same_size(b)?;
    let mut out = a.zeros_like();
    Zip::from(out.pixels_mut())
        .and(a.pixels())
        .and(b.pixels())
        .for_each(|o, &p, &q| *o = f(p, q));
    let max_val = out.observed_max().max(0);
    out.set_max_val(max_val);
    Ok(out)
}

/// Absolute value of every pixel.
pub fn absolute(grid: &PixelGrid) -> PixelGrid {
    map_pixels(grid, i32::abs)
}

/// Binarize: pixels `>= value` become 255, the rest 0.
///
/// `value` is clamped to `[0, 255]`. The output always declares `max_val = 255`.
pub fn threshold(grid: &PixelGrid, value: i32) -> PixelGrid {
    let value = value.clamp(0, FOREGROUND);
    let mut out = map_pixels(grid, |p| if p >= value { FOREGROUND } else { 0 });
    out.set_max_val(FOREGROUND);
    out
}

/// Weighted sum `w1 * a + w2 * b`, truncated toward zero.
pub fn linear_add(a: &PixelGrid, b: &PixelGrid, w1: f64, w2: f64) -> Result<PixelGrid> {
    zip_pixels(a, b, |p, q| (w1 * p as f64 + w2 * q as f64) as i32)
}

/// True when both grids hold identical pixels.
pub fn compare(a: &PixelGrid, b: &PixelGrid) -> Result<bool> {
    a.ensure_same_size(b)?;
    Ok(a.pixels() == b.pixels())
}

/// Per-pixel Euclidean norm `round(sqrt(x² + y²))`.
pub fn magnitude(x: &PixelGrid, y: &PixelGrid) -> Result<PixelGrid> {
    zip_pixels(x, y, |gx, gy| (gx as f64).hypot(gy as f64).round() as i32)
}

/// Per-pixel direction `round(atan2(y, x) * 127 / π)`, in `[-127, 127]`.
pub fn phase(x: &PixelGrid, y: &PixelGrid) -> Result<PixelGrid> {
    zip_pixels(x, y, |gx, gy| {
        ((gy as f64).atan2(gx as f64) * PHASE_SCALE / PI).round() as i32
    })
}

/// `max_val - p` for every pixel; keeps the declared range.
pub fn invert(grid: &PixelGrid) -> PixelGrid {
    let max = grid.max_val();
    let mut out = map_pixels(grid, |p| max - p);
    out.set_max_val(max);
    out
}

/// Mirror around the vertical axis.
pub fn hflip(grid: &PixelGrid) -> PixelGrid {
    let mut out = grid.clone();
    out.pixels_mut().invert_axis(ndarray::Axis(1));
    out
}

/// Stretch the observed range linearly onto `[0, 255]`.
///
/// A flat grid has no range to stretch and maps to all zeros.
pub fn normalize(grid: &PixelGrid) -> PixelGrid {
    let min = grid.observed_min();
    let top = grid.observed_max();
    let mut out = if top == min {
        grid.zeros_like()
    } else {
        let range = (top - min) as i64;
        map_pixels(grid, |p| (FOREGROUND as i64 * (p - min) as i64 / range) as i32)
    };
    out.set_max_val(FOREGROUND);
    out
}

/// Histogram equalization: each pixel maps to `255 * cdf(p) / total`.
///
/// Fails when the sample range is too wide for a histogram.
pub fn equalize(grid: &PixelGrid) -> Result<PixelGrid> {
    let hist = grid.histogram()?;
    let cdf = hist.cdf();
    let total = hist.total() as u64;

    let mut out = map_pixels(grid, |p| {
        (FOREGROUND as u64 * cdf[hist.index_of(p)] as u64 / total) as i32
    });
    out.set_max_val(FOREGROUND);
    Ok(out)
}
