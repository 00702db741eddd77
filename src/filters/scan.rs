//! Neighborhood scan engine.
//!
//! Every neighborhood filter in the crate is a [`KernelFunction`] driven by
//! [`scan`]: the engine walks the interior pixels of a grid, hands each center
//! index to the kernel function and stores the returned value.
//!
//! ## Border policy
//!
//! Only centers whose full neighborhood lies inside the grid are visited, i.e.
//! rows `[span.y, height - span.y)` and columns `[span.x, width - span.x)`. The
//! border band is never written: [`scan`] returns it as zeros and
//! [`scan_into`] leaves whatever the caller seeded there.

use std::time::Instant;

use ndarray::ArrayView2;

use super::core::Kernel;
use crate::error::{FilterError, Result};
use crate::grid::{PixelGrid, Span};

/// Absorbs round-off in weighted sums before flooring, so a box kernel over a
/// constant region reproduces the constant.
const FLOOR_EPSILON: f64 = 1e-9;

/// Per-pixel rule evaluated by the scan engine.
///
/// Implementations must be pure: the result depends only on the arguments.
pub trait KernelFunction {
    /// Compute the output value for `center`.
    ///
    /// # Arguments
    /// * `primary` - Input grid
    /// * `secondary` - Optional second input of the same size
    /// * `weights` - Kernel weights, shape `(2*span.y+1, 2*span.x+1)`, if a kernel was given
    /// * `span` - Neighborhood half-extents
    /// * `center` - Linear index of the visited pixel
    fn evaluate(
        &self,
        primary: &PixelGrid,
        secondary: Option<&PixelGrid>,
        weights: Option<ArrayView2<'_, f64>>,
        span: Span,
        center: usize,
    ) -> i32;
}

impl<F> KernelFunction for F
where
    F: Fn(&PixelGrid, Option<&PixelGrid>, Option<ArrayView2<'_, f64>>, Span, usize) -> i32,
{
    fn evaluate(
        &self,
        primary: &PixelGrid,
        secondary: Option<&PixelGrid>,
        weights: Option<ArrayView2<'_, f64>>,
        span: Span,
        center: usize,
    ) -> i32 {
        self(primary, secondary, weights, span, center)
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Apply `kernel_fn` to every interior pixel of `primary`.
///
/// # Arguments
/// * `primary` - Input grid
/// * `secondary` - Optional second input, must match `primary` in size
/// * `kernel` - Optional weights; when present its half-extents replace `span`
/// * `span` - Neighborhood half-extents used without a kernel
/// * `kernel_fn` - Per-pixel rule
///
/// # Returns
/// A new grid of the primary's size; border band zero, `max_val` set to the
/// largest value written (never below 0).
pub fn scan<K>(
    primary: &PixelGrid,
    secondary: Option<&PixelGrid>,
    kernel: Option<&Kernel>,
    span: Span,
    kernel_fn: &K,
) -> Result<PixelGrid>
where
    K: KernelFunction + ?Sized,
{
    let mut output = primary.zeros_like();
    scan_into(primary, secondary, kernel, span, kernel_fn, &mut output)?;
    Ok(output)
}

/// Same as [`scan`] but writes into a caller-provided grid.
///
/// All validation happens before the first write; on error `output` is
/// untouched. Pixels outside the visited region keep their previous values.
pub fn scan_into<K>(
    primary: &PixelGrid,
    secondary: Option<&PixelGrid>,
    kernel: Option<&Kernel>,
    span: Span,
    kernel_fn: &K,
    output: &mut PixelGrid,
) -> Result<()>
where
    K: KernelFunction + ?Sized,
{
    if let Some(secondary) = secondary {
        primary.ensure_same_size(secondary)?;
    }
    primary.ensure_same_size(output)?;

    let span = match kernel {
        Some(k) if !k.has_center() => {
            return Err(FilterError::InvalidKernelSize {
                width: k.width(),
                height: k.height(),
            });
        }
        Some(k) => k.span(),
        None => span,
    };
    let weights = kernel.map(Kernel::weights);

    let start = Instant::now();
    let (width, height) = primary.dims();
    let rows = span.y..height.saturating_sub(span.y);
    let cols = span.x..width.saturating_sub(span.x);

    let mut max_val = 0;
    let mut visited = 0usize;
    for row in rows {
        for col in cols.clone() {
            let center = primary.index_of(row, col);
            let value = kernel_fn.evaluate(primary, secondary, weights.clone(), span, center);
            output.pixels_mut()[[row, col]] = value;
            max_val = max_val.max(value);
            visited += 1;
        }
    }
    output.set_max_val(max_val);

    log::debug!(
        "scan {}x{} span ({}, {}): {} pixels in {:?}",
        width,
        height,
        span.x,
        span.y,
        visited,
        start.elapsed()
    );
    Ok(())
}

// ============================================================================
// Convolution
// ============================================================================

/// Weighted sum of the neighborhood, floored.
///
/// Without weights every neighbor counts once.
#[derive(Debug, Clone, Copy, Default)]
pub struct Convolution;

impl KernelFunction for Convolution {
    fn evaluate(
        &self,
        primary: &PixelGrid,
        _secondary: Option<&PixelGrid>,
        weights: Option<ArrayView2<'_, f64>>,
        span: Span,
        center: usize,
    ) -> i32 {
        let window = primary.window(center, span);
        let acc: f64 = match weights {
            Some(w) => window
                .iter()
                .zip(w.iter())
                .map(|(&p, &k)| p as f64 * k)
                .sum(),
            None => window.iter().map(|&p| p as f64).sum(),
        };
        (acc + FLOOR_EPSILON).floor() as i32
    }
}

/// Convolve `grid` with `kernel`.
pub fn convolve(grid: &PixelGrid, kernel: &Kernel) -> Result<PixelGrid> {
    scan(grid, None, Some(kernel), kernel.span(), &Convolution)
}
