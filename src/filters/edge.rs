//! Edge detection: gradient operators, 3/9 operator, non-maximum
//! suppression, hysteresis thresholding and the composed Canny-style
//! pipeline.
//!
//! ## Pipeline
//!
//! [`edges`] runs Gaussian smoothing, the Sobel gradient, [`suppress`] and
//! [`hysteresis`] in sequence and returns a binary grid (0 / 255).
//!
//! ## Orientation
//!
//! `sobel_x` differentiates across rows and `sobel_y` across columns, so a
//! phase near 0 means the intensity changes vertically. Suppression therefore
//! compares a quadrant-0 pixel with its north and south neighbors.

use std::f64::consts::SQRT_2;

use ndarray::{ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use super::basic::{linear_add, magnitude, phase, threshold, FOREGROUND, PHASE_SCALE};
use super::blur::{gauss, gauss_2d};
use super::core::{prewitt_x, prewitt_y, sobel_x, sobel_y, Kernel};
use super::scan::{convolve, scan, scan_into, KernelFunction};
use crate::error::{FilterError, Result};
use crate::grid::{PixelGrid, Span};

// ============================================================================
// 3/9 Operator
// ============================================================================

/// Scale of the 3/9 response.
const OP39_SCALE: f64 = 382.5;

/// Raster positions of the 3x3 ring, walked clockwise, then the center.
const OP39_RING: [usize; 9] = [5, 2, 1, 0, 3, 6, 7, 8, 4];

/// Ratio of the brightest cyclic triplet to the neighborhood sum, rescaled.
///
/// An all-zero neighborhood yields 0. Reads the 3x3 neighborhood, so it must
/// be scanned with a span covering [`Operator39::SPAN`]; a narrower span
/// yields 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Operator39;

impl Operator39 {
    pub const SPAN: Span = Span::square(1);
}

impl KernelFunction for Operator39 {
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
        let p: Vec<i32> = window.iter().copied().collect();

        let sum: i32 = p.iter().sum();
        if sum == 0 {
            return 0;
        }

        let ring: Vec<i32> = OP39_RING.iter().map(|&i| p[i]).collect();
        let n = ring.len();
        let best = (0..n)
            .map(|j| ring[(j + n - 1) % n] + ring[j] + ring[(j + 1) % n])
            .max()
            .unwrap_or(0);

        (OP39_SCALE * (best as f64 / sum as f64 - 1.0 / 3.0)).floor() as i32
    }
}

/// Apply the 3/9 operator.
pub fn operator_39(grid: &PixelGrid) -> Result<PixelGrid> {
    scan(grid, None, None, Operator39::SPAN, &Operator39)
}

// ============================================================================
// Gradient
// ============================================================================

/// Derivative mask pair used for the gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientOperator {
    #[default]
    Sobel,
    Prewitt,
}

impl GradientOperator {
    fn kernels(self) -> (Kernel, Kernel) {
        match self {
            GradientOperator::Sobel => (sobel_x(), sobel_y()),
            GradientOperator::Prewitt => (prewitt_x(), prewitt_y()),
        }
    }
}

/// Which gradient field [`sobel`] and [`prewitt`] return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientOutput {
    Magnitude,
    Phase,
}

/// Gradient fields of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub gx: PixelGrid,
    pub gy: PixelGrid,
    pub magnitude: PixelGrid,
    /// `atan2(gy, gx)` scaled onto `[-127, 127]`.
    pub phase: PixelGrid,
}

/// Compute gradient magnitude and phase.
///
/// # Arguments
/// * `grid` - Input grid
/// * `operator` - Sobel or Prewitt masks
///
/// # Returns
/// All four gradient fields; the 1-pixel border is 0 in each.
pub fn gradient(grid: &PixelGrid, operator: GradientOperator) -> Result<Gradient> {
    let (kx, ky) = operator.kernels();
    let gx = convolve(grid, &kx)?;
    let gy = convolve(grid, &ky)?;
    let magnitude = magnitude(&gx, &gy)?;
    let phase = phase(&gx, &gy)?;

    Ok(Gradient {
        gx,
        gy,
        magnitude,
        phase,
    })
}

fn select(gradient: Gradient, output: GradientOutput) -> PixelGrid {
    match output {
        GradientOutput::Magnitude => gradient.magnitude,
        GradientOutput::Phase => gradient.phase,
    }
}

/// Sobel gradient magnitude or phase.
pub fn sobel(grid: &PixelGrid, output: GradientOutput) -> Result<PixelGrid> {
    Ok(select(gradient(grid, GradientOperator::Sobel)?, output))
}

/// Prewitt gradient magnitude or phase.
pub fn prewitt(grid: &PixelGrid, output: GradientOutput) -> Result<PixelGrid> {
    Ok(select(gradient(grid, GradientOperator::Prewitt)?, output))
}

// ============================================================================
// Non-Maximum Suppression
// ============================================================================

/// Raster positions of the two neighbors on the gradient axis, per quadrant.
const SUPPRESSION_NEIGHBORS: [(usize, usize); 4] = [(1, 7), (0, 8), (3, 5), (2, 6)];

/// Convert a scaled phase value to degrees in `[-180, 180]`.
pub fn phase_to_degrees(phase: i32) -> f64 {
    180.0 * phase as f64 / PHASE_SCALE
}

/// Undirected 45° sector of an angle in degrees.
///
/// * `0`: within 22.5° of the 0°/180° axis
/// * `1`: around 45° / -135°
/// * `2`: around 90° / -90°
/// * `3`: around 135° / -45°
pub fn quadrant(degrees: f64) -> usize {
    let a = degrees;
    if a.abs() <= 22.5 || a.abs() >= 157.5 {
        0
    } else if (22.5..67.5).contains(&a) || (-157.5..-112.5).contains(&a) {
        1
    } else if (67.5..112.5).contains(&a) || (-112.5..-67.5).contains(&a) {
        2
    } else {
        3
    }
}

/// Keeps the center magnitude only where it is a local maximum along the
/// gradient direction. Primary is the magnitude, secondary the phase.
///
/// Needs a span covering [`Suppression::SPAN`]; a narrower span yields 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Suppression;

impl Suppression {
    pub const SPAN: Span = Span::square(1);
}

impl KernelFunction for Suppression {
    fn evaluate(
        &self,
        primary: &PixelGrid,
        secondary: Option<&PixelGrid>,
        _weights: Option<ArrayView2<'_, f64>>,
        span: Span,
        center: usize,
    ) -> i32 {
        if !span.covers(Self::SPAN) {
            return 0;
        }
        let window = primary.window(center, Self::SPAN);
        let m: Vec<i32> = window.iter().copied().collect();

        let phase = secondary.map_or(0, |s| s.at(center));
        let (a, b) = SUPPRESSION_NEIGHBORS[quadrant(phase_to_degrees(phase))];

        let value = m[4];
        if value >= m[a] && value >= m[b] {
            value
        } else {
            0
        }
    }
}

/// Non-maximum suppression of a gradient magnitude.
///
/// Every output pixel is either 0 or the input magnitude.
pub fn suppress(magnitude: &PixelGrid, phase: &PixelGrid) -> Result<PixelGrid> {
    scan(magnitude, Some(phase), None, Suppression::SPAN, &Suppression)
}

// ============================================================================
// Hysteresis
// ============================================================================

/// Marks a weak pixel as an edge when one of its 8 neighbors is strong.
/// Primary is the strong mask, secondary the weak band.
///
/// Needs a span covering [`Connectivity::SPAN`]; with a narrower span only
/// the strong mask is copied through. [`Hysteresis::step`] scans zero-padded
/// masks so that border pixels are evaluated too.
#[derive(Debug, Clone, Copy, Default)]
pub struct Connectivity;

impl Connectivity {
    pub const SPAN: Span = Span::square(1);
}

impl KernelFunction for Connectivity {
    fn evaluate(
        &self,
        primary: &PixelGrid,
        secondary: Option<&PixelGrid>,
        _weights: Option<ArrayView2<'_, f64>>,
        span: Span,
        center: usize,
    ) -> i32 {
        if primary.at(center) != 0 {
            return FOREGROUND;
        }
        if !span.covers(Self::SPAN) {
            return 0;
        }
        let weak = secondary.map_or(false, |s| s.at(center) != 0);
        if weak && primary.window(center, Self::SPAN).iter().any(|&p| p != 0) {
            FOREGROUND
        } else {
            0
        }
    }
}

/// Iterative hysteresis state: the strong mask grows into the weak band one
/// 8-connected ring per round until nothing changes.
#[derive(Debug, Clone)]
pub struct Hysteresis {
    strong: PixelGrid,
    weak: PixelGrid,
    rounds: usize,
}

impl Hysteresis {
    /// Split `magnitude` into strong (`>= high`) and weak (`[low, high)`) masks.
    ///
    /// Fails unless `low < high`; both are then clamped to `[0, 255]`.
    pub fn new(magnitude: &PixelGrid, high: i32, low: i32) -> Result<Self> {
        if low >= high {
            return Err(FilterError::InvalidThresholds { low, high });
        }
        let (high, low) = (clamp_threshold(high, "high"), clamp_threshold(low, "low"));

        let strong = threshold(magnitude, high);
        let weak = linear_add(&threshold(magnitude, low), &strong, 1.0, -1.0)?;

        Ok(Hysteresis {
            strong,
            weak,
            rounds: 0,
        })
    }

    /// Run one propagation round.
    ///
    /// Adjacency is judged against the strong mask as it was at the start of
    /// the round. Returns the number of promoted pixels.
    pub fn step(&mut self) -> Result<usize> {
        // A zero band makes every real pixel, border included, an interior one
        let pad = Connectivity::SPAN;
        let strong = self.strong.padded(pad);
        let weak = self.weak.padded(pad);
        let mut next = strong.clone();
        scan_into(&strong, Some(&weak), None, pad, &Connectivity, &mut next)?;
        let mut next = next.cropped(pad)?;
        next.set_max_val(FOREGROUND);

        let mut promoted = 0;
        Zip::from(self.weak.pixels_mut())
            .and(self.strong.pixels())
            .and(next.pixels())
            .for_each(|w, &s, &n| {
                if n != 0 && s == 0 {
                    *w = 0;
                    promoted += 1;
                }
            });

        self.strong = next;
        self.rounds += 1;
        log::debug!("hysteresis round {}: {} promoted", self.rounds, promoted);
        Ok(promoted)
    }

    pub fn strong(&self) -> &PixelGrid {
        &self.strong
    }

    /// Weak pixels not yet promoted.
    pub fn weak(&self) -> &PixelGrid {
        &self.weak
    }

    /// Rounds run so far, including the final empty one.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Propagate to the fixpoint and return the edge mask.
    pub fn run(mut self) -> Result<PixelGrid> {
        while self.step()? > 0 {}
        Ok(self.into_edges())
    }

    /// Current strong mask, consuming the state.
    pub fn into_edges(self) -> PixelGrid {
        self.strong
    }
}

fn clamp_threshold(value: i32, name: &str) -> i32 {
    let clamped = value.clamp(0, FOREGROUND);
    if clamped != value {
        log::warn!("{} threshold {} clamped to {}", name, value, clamped);
    }
    clamped
}

/// Hysteresis thresholding of a (suppressed) gradient magnitude.
///
/// # Arguments
/// * `magnitude` - Gradient magnitude
/// * `high` - Pixels at or above this value seed the edges
/// * `low` - Pixels at or above this value may join an edge
///
/// # Returns
/// Binary edge mask, a superset of `magnitude >= high` and a subset of
/// `magnitude >= low`.
pub fn hysteresis(magnitude: &PixelGrid, high: i32, low: i32) -> Result<PixelGrid> {
    Hysteresis::new(magnitude, high, low)?.run()
}

// ============================================================================
// Edge Pipeline
// ============================================================================

/// How the pipeline smooths its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoothing {
    /// Row pass then column pass with a 1D Gaussian.
    #[default]
    Separable,
    /// One pass with the 2D Gaussian.
    TwoDimensional,
}

/// Edge pipeline parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeOptions {
    pub sigma: f64,
    /// Gaussian size; 0 derives it from `sigma`.
    pub dim: usize,
    pub threshold_high: i32,
    pub threshold_low: i32,
    pub smoothing: Smoothing,
    pub operator: GradientOperator,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        EdgeOptions {
            sigma: SQRT_2,
            dim: 0,
            threshold_high: 75,
            threshold_low: 25,
            smoothing: Smoothing::Separable,
            operator: GradientOperator::Sobel,
        }
    }
}

/// Canny-style edge detection with separable smoothing and Sobel masks.
pub fn edges(grid: &PixelGrid, sigma: f64, dim: usize, high: i32, low: i32) -> Result<PixelGrid> {
    edges_with(
        grid,
        &EdgeOptions {
            sigma,
            dim,
            threshold_high: high,
            threshold_low: low,
            ..EdgeOptions::default()
        },
    )
}

/// Canny-style edge detection.
pub fn edges_with(grid: &PixelGrid, options: &EdgeOptions) -> Result<PixelGrid> {
    let smoothed = match options.smoothing {
        Smoothing::Separable => gauss(grid, options.sigma, options.dim)?,
        Smoothing::TwoDimensional => gauss_2d(grid, options.sigma, options.dim)?,
    };
    log::info!("edges: smoothed with sigma {}", options.sigma);

    let grad = gradient(&smoothed, options.operator)?;
    let thin = suppress(&grad.magnitude, &grad.phase)?;
    log::info!("edges: {} candidate pixels after suppression", thin.count_nonzero());

    let mut hyst = Hysteresis::new(&thin, options.threshold_high, options.threshold_low)?;
    while hyst.step()? > 0 {}
    log::info!(
        "edges: {} edge pixels after {} hysteresis rounds",
        hyst.strong().count_nonzero(),
        hyst.rounds()
    );
    Ok(hyst.into_edges())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: usize, height: usize, pixels: Vec<i32>) -> PixelGrid {
        PixelGrid::from_vec(width, height, 255, pixels).unwrap()
    }

    #[test]
    fn test_op39_zero_neighborhood() {
        let out = operator_39(&grid(3, 3, vec![0; 9])).unwrap();
        assert_eq!(out.get(1, 1), Some(0));
    }

    #[test]
    fn test_op39_flat_and_corner() {
        // Flat: every triplet is a third of the sum
        let out = operator_39(&grid(3, 3, vec![10; 9])).unwrap();
        assert_eq!(out.get(1, 1), Some(0));

        // Only p0, p1, p3 lit: ring triplet (p1, p0, p3) holds the whole sum
        let out = operator_39(&grid(3, 3, vec![9, 9, 0, 9, 0, 0, 0, 0, 0])).unwrap();
        assert_eq!(out.get(1, 1), Some(255));
    }

    #[test]
    fn test_quadrant_sectors() {
        assert_eq!(quadrant(0.0), 0);
        assert_eq!(quadrant(180.0), 0);
        assert_eq!(quadrant(-170.0), 0);
        assert_eq!(quadrant(45.0), 1);
        assert_eq!(quadrant(-135.0), 1);
        assert_eq!(quadrant(90.0), 2);
        assert_eq!(quadrant(-90.0), 2);
        assert_eq!(quadrant(135.0), 3);
        assert_eq!(quadrant(-45.0), 3);
    }

    #[test]
    fn test_gradient_detects_horizontal_edge() {
        // Top rows bright: sobel_x responds, sobel_y does not
        let pixels = (0..25).map(|i| if i / 5 < 2 { 100 } else { 0 }).collect();
        let g = gradient(&grid(5, 5, pixels), GradientOperator::Sobel).unwrap();
        assert_eq!(g.gx.get(2, 2), Some(400));
        assert_eq!(g.gy.get(2, 2), Some(0));
        assert_eq!(g.magnitude.get(2, 2), Some(400));
        assert_eq!(g.phase.get(2, 2), Some(0));
        assert_eq!(g.magnitude.get(0, 2), Some(0));
    }

    #[test]
    fn test_impulse_gradient_is_mirror_symmetric() {
        let mut pixels = vec![0; 49];
        pixels[24] = 255;
        let smoothed = gauss(&grid(7, 7, pixels), 1.0, 0).unwrap();
        let mag = sobel(&smoothed, GradientOutput::Magnitude).unwrap();

        assert!(mag.count_nonzero() > 0);
        for row in 0..7 {
            for col in 0..7 {
                let v = mag.get(row, col);
                assert_eq!(v, mag.get(6 - row, col), "vertical mirror at ({}, {})", row, col);
                assert_eq!(v, mag.get(row, 6 - col), "horizontal mirror at ({}, {})", row, col);
            }
        }
    }

    #[test]
    fn test_suppression_never_amplifies() {
        let pixels: Vec<i32> = (0..64).map(|i| (i * 29 % 97) as i32).collect();
        let image = grid(8, 8, pixels);
        let g = gradient(&image, GradientOperator::Prewitt).unwrap();
        let thin = suppress(&g.magnitude, &g.phase).unwrap();

        for (t, m) in thin.pixels().iter().zip(g.magnitude.pixels().iter()) {
            assert!(*t == 0 || t == m);
        }
    }

    #[test]
    fn test_suppression_keeps_ridge() {
        // Quadrant 0 compares north and south
        let magnitude = grid(3, 3, vec![0, 5, 0, 0, 9, 0, 0, 5, 0]);
        let phase = grid(3, 3, vec![0; 9]);
        assert_eq!(suppress(&magnitude, &phase).unwrap().get(1, 1), Some(9));

        let magnitude = grid(3, 3, vec![0, 12, 0, 0, 9, 0, 0, 5, 0]);
        assert_eq!(suppress(&magnitude, &phase).unwrap().get(1, 1), Some(0));
    }

    #[test]
    fn test_hysteresis_rounds() {
        // A strong at (1,1); B weak at (2,2); C weak at (3,3), not adjacent to A
        let mut magnitude = PixelGrid::new(6, 6, 255).unwrap();
        magnitude.set(1, 1, 220);
        magnitude.set(2, 2, 80);
        magnitude.set(3, 3, 80);

        let mut hyst = Hysteresis::new(&magnitude, 200, 50).unwrap();
        assert_eq!(hyst.step().unwrap(), 1);
        assert_eq!(hyst.strong().get(2, 2), Some(255));
        assert_eq!(hyst.strong().get(3, 3), Some(0));

        assert_eq!(hyst.step().unwrap(), 1);
        assert_eq!(hyst.strong().get(3, 3), Some(255));

        assert_eq!(hyst.step().unwrap(), 0);
        assert_eq!(hyst.rounds(), 3);
        assert_eq!(hyst.weak().count_nonzero(), 0);
        assert_eq!(hyst.strong().count_nonzero(), 3);
    }

    #[test]
    fn test_hysteresis_promotes_border_pixels() {
        let mut magnitude = PixelGrid::new(5, 5, 255).unwrap();
        magnitude.set(1, 1, 220);
        magnitude.set(0, 0, 80);
        magnitude.set(2, 2, 80);
        magnitude.set(4, 4, 80);
        magnitude.set(3, 3, 80);

        let out = hysteresis(&magnitude, 200, 50).unwrap();
        assert_eq!(out.get(0, 0), Some(255));
        assert_eq!(out.get(2, 2), Some(255));
        // Reached through (2,2) and (3,3)
        assert_eq!(out.get(4, 4), Some(255));
        assert_eq!(out.count_nonzero(), 5);
    }

    #[test]
    fn test_hysteresis_strong_border_seeds_interior() {
        let mut magnitude = PixelGrid::new(4, 4, 255).unwrap();
        magnitude.set(0, 3, 240);
        magnitude.set(1, 2, 60);
        let out = hysteresis(&magnitude, 200, 50).unwrap();
        assert_eq!(out.get(0, 3), Some(255));
        assert_eq!(out.get(1, 2), Some(255));
    }

    #[test]
    fn test_fixed_neighborhoods_tolerate_narrow_span() {
        let input = grid(4, 4, (0..16).collect());

        let out = scan(&input, None, None, Span::square(0), &Operator39).unwrap();
        assert_eq!(out.count_nonzero(), 0);

        let out = scan(&input, Some(&input), None, Span::new(1, 0), &Suppression).unwrap();
        assert_eq!(out.count_nonzero(), 0);

        let strong = threshold(&input, 15);
        let out = scan(&strong, Some(&input), None, Span::square(0), &Connectivity).unwrap();
        assert_eq!(out, strong);
    }

    #[test]
    fn test_hysteresis_bounds() {
        let pixels: Vec<i32> = (0..100).map(|i| (i * 53 % 256) as i32).collect();
        let magnitude = grid(10, 10, pixels);
        let out = hysteresis(&magnitude, 180, 60).unwrap();

        for (o, m) in out.pixels().iter().zip(magnitude.pixels().iter()) {
            if *m >= 180 {
                assert_eq!(*o, 255);
            }
            if *m < 60 {
                assert_eq!(*o, 0);
            }
        }
    }

    #[test]
    fn test_hysteresis_rejects_inverted_thresholds() {
        let magnitude = grid(3, 3, vec![0; 9]);
        assert_eq!(
            hysteresis(&magnitude, 20, 20).unwrap_err(),
            FilterError::InvalidThresholds { low: 20, high: 20 }
        );
    }

    #[test]
    fn test_edges_find_step() {
        let pixels = (0..256).map(|i| if i % 16 < 8 { 0 } else { 100 }).collect();
        let image = grid(16, 16, pixels);
        let out = edges(&image, 1.0, 0, 75, 25).unwrap();

        assert!(out.pixels().iter().all(|&p| p == 0 || p == 255));
        assert!((6..10).any(|col| out.get(8, col) == Some(255)));
        // Flat interior far from the step stays empty
        assert_eq!(out.get(8, 4), Some(0));
    }

    #[test]
    fn test_edges_with_two_dimensional_smoothing() {
        let pixels = (0..256).map(|i| if i / 16 < 8 { 0 } else { 100 }).collect();
        let options = EdgeOptions {
            sigma: 1.0,
            smoothing: Smoothing::TwoDimensional,
            operator: GradientOperator::Prewitt,
            ..EdgeOptions::default()
        };
        let out = edges_with(&grid(16, 16, pixels), &options).unwrap();
        assert!((6..10).any(|row| out.get(row, 8) == Some(255)));
    }
}
