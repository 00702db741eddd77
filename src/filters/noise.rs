//! Noise filters: Add Noise, Median, Average, Nagao-Matsuyama.
//!
//! The generators add deterministic noise from a seeded generator; the
//! neighborhood filters remove it. The neighborhood filters are
//! [`KernelFunction`]s driven by the scan engine, so their border band is 0.

use ndarray::ArrayView2;

use super::core::box_kernel;
use super::scan::{convolve, scan, KernelFunction};
use crate::error::{FilterError, Result};
use crate::grid::{PixelGrid, Span};

// ============================================================================
// Simple RNG (deterministic for reproducible runs)
// ============================================================================

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 357;

/// Largest accepted uniform noise amplitude.
pub const MAX_NOISE_RANGE: i32 = 127;

/// Simple linear congruential generator for deterministic noise.
/// Uses MINSTD parameters.
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        SimpleRng {
            state: seed.wrapping_add(1), // Avoid zero
        }
    }

    /// Generate next random u32.
    pub fn next_u32(&mut self) -> u32 {
        // MINSTD LCG
        self.state = self.state.wrapping_mul(48271).wrapping_add(1) % 2147483647;
        self.state as u32
    }

    /// Generate uniform random f64 in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / 2147483647.0
    }
}

// ============================================================================
// Add Noise
// ============================================================================

/// Add uniform noise in `[-range, range)` to every pixel.
///
/// # Arguments
/// * `grid` - Input grid
/// * `range` - Noise amplitude; the sign is dropped and values above 127 clamp
/// * `seed` - Random seed for deterministic results
///
/// # Returns
/// Noisy grid declaring `max_val + range`
pub fn add_uniform_noise(grid: &PixelGrid, range: i32, seed: u64) -> PixelGrid {
    let clamped = range.saturating_abs().min(MAX_NOISE_RANGE);
    if clamped != range {
        log::warn!("uniform noise range {} clamped to {}", range, clamped);
    }

    let mut out = grid.clone();
    if clamped > 0 {
        let mut rng = SimpleRng::new(seed);
        let span = 2 * clamped as u32;
        for p in out.pixels_mut().iter_mut() {
            *p += (rng.next_u32() % span) as i32 - clamped;
        }
    }
    out.set_max_val(grid.max_val() + clamped);
    out
}

/// Replace a `density` fraction of pixels with black (0) or white (255).
///
/// # Arguments
/// * `grid` - Input grid
/// * `density` - Probability in `[0, 1]` that a pixel is hit
/// * `seed` - Random seed for deterministic results
pub fn add_salt_pepper_noise(grid: &PixelGrid, density: f64, seed: u64) -> Result<PixelGrid> {
    if !(0.0..=1.0).contains(&density) {
        return Err(FilterError::InvalidDensity(density));
    }

    let mut out = grid.clone();
    let mut rng = SimpleRng::new(seed);
    for p in out.pixels_mut().iter_mut() {
        if rng.next_f64() < density {
            *p = if rng.next_u32() & 1 == 1 { 0 } else { 255 };
        }
    }
    out.set_max_val(255);
    Ok(out)
}

// ============================================================================
// Median
// ============================================================================

/// Median of the `(2*span.x+1) x (2*span.y+1)` neighborhood.
#[derive(Debug, Clone, Copy, Default)]
pub struct Median;

impl KernelFunction for Median {
    fn evaluate(
        &self,
        primary: &PixelGrid,
        _secondary: Option<&PixelGrid>,
        _weights: Option<ArrayView2<'_, f64>>,
        span: Span,
        center: usize,
    ) -> i32 {
        let mut values: Vec<i32> = primary.window(center, span).iter().copied().collect();
        values.sort_unstable();
        values[values.len() / 2]
    }
}

/// 3x3 median filter.
pub fn median(grid: &PixelGrid) -> Result<PixelGrid> {
    median_with(grid, Span::square(1))
}

/// Median filter over an arbitrary neighborhood.
pub fn median_with(grid: &PixelGrid, span: Span) -> Result<PixelGrid> {
    scan(grid, None, None, span, &Median)
}

/// 3x3 mean (box convolution).
pub fn average(grid: &PixelGrid) -> Result<PixelGrid> {
    convolve(grid, &box_kernel(3, 3)?)
}

// ============================================================================
// Nagao-Matsuyama
// ============================================================================

/// Nine binary 5x5 masks: the centered 3x3 block, then eight wedges
/// clockwise from north.
const NAGAO_MASKS: [[[u8; 5]; 5]; 9] = [
    [
        [0, 0, 0, 0, 0],
        [0, 1, 1, 1, 0],
        [0, 1, 1, 1, 0],
        [0, 1, 1, 1, 0],
        [0, 0, 0, 0, 0],
    ],
    [
        [0, 1, 1, 1, 0],
        [0, 1, 1, 1, 0],
        [0, 0, 1, 0, 0],
        [0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0],
    ],
    [
        [0, 0, 0, 1, 1],
        [0, 0, 1, 1, 1],
        [0, 0, 1, 1, 0],
        [0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0],
    ],
    [
        [0, 0, 0, 0, 0],
        [0, 0, 0, 1, 1],
        [0, 0, 1, 1, 1],
        [0, 0, 0, 1, 1],
        [0, 0, 0, 0, 0],
    ],
    [
        [0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0],
        [0, 0, 1, 1, 0],
        [0, 0, 1, 1, 1],
        [0, 0, 0, 1, 1],
    ],
    [
        [0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0],
        [0, 0, 1, 0, 0],
        [0, 1, 1, 1, 0],
        [0, 1, 1, 1, 0],
    ],
    [
        [0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0],
        [0, 1, 1, 0, 0],
        [1, 1, 1, 0, 0],
        [1, 1, 0, 0, 0],
    ],
    [
        [0, 0, 0, 0, 0],
        [1, 1, 0, 0, 0],
        [1, 1, 1, 0, 0],
        [1, 1, 0, 0, 0],
        [0, 0, 0, 0, 0],
    ],
    [
        [1, 1, 0, 0, 0],
        [1, 1, 1, 0, 0],
        [0, 1, 1, 0, 0],
        [0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0],
    ],
];

/// Edge-preserving smoothing: the mean of the most homogeneous of nine
/// sub-regions of the 5x5 neighborhood. Ties go to the earlier mask.
///
/// Needs a span covering [`Nagao::SPAN`]; a narrower span yields 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nagao;

impl Nagao {
    pub const SPAN: Span = Span::square(2);
}

impl KernelFunction for Nagao {
    fn evaluate(
        &self,
        primary: &PixelGrid,
        _secondary: Option<&PixelGrid>,
        _weights: Option<ArrayView2<'_, f64>>,
        span: Span,
        center: usize,
    ) -> i32 {
        if !span.covers(Self::SPAN) {
            return 0;
        }
        let window = primary.window(center, Self::SPAN);

        let mut best_mean = 0.0;
        let mut best_var = f64::INFINITY;
        for mask in NAGAO_MASKS.iter() {
            let mut values = [0f64; 9];
            let mut count = 0;
            for ((r, c), &p) in window.indexed_iter() {
                if mask[r][c] == 1 {
                    values[count] = p as f64;
                    count += 1;
                }
            }
            let values = &values[..count];

            let mean = values.iter().sum::<f64>() / count as f64;
            let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
            if var < best_var {
                best_var = var;
                best_mean = mean;
            }
        }
        best_mean.floor() as i32
    }
}

/// 5x5 Nagao-Matsuyama filter.
pub fn nagao(grid: &PixelGrid) -> Result<PixelGrid> {
    scan(grid, None, None, Nagao::SPAN, &Nagao)
}
