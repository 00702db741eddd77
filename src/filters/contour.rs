//! Contour extraction on binary and piecewise-flat images.

use ndarray::ArrayView2;

use super::basic::FOREGROUND;
use super::scan::{scan, scan_into, KernelFunction};
use crate::error::Result;
use crate::grid::{PixelGrid, Span};

/// Internal N8 contour of the foreground.
///
/// Background is the grid's `max_val` (white). Output is inverted: contour
/// pixels are 0, everything else 255.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalContour;

impl KernelFunction for InternalContour {
    fn evaluate(
        &self,
        primary: &PixelGrid,
        _secondary: Option<&PixelGrid>,
        _weights: Option<ArrayView2<'_, f64>>,
        _span: Span,
        center: usize,
    ) -> i32 {
        let background = primary.max_val();
        if primary.at(center) == background {
            return FOREGROUND;
        }
        let touches_background = primary
            .window(center, Span::square(1))
            .iter()
            .any(|&p| p == background);
        if touches_background {
            0
        } else {
            FOREGROUND
        }
    }
}

/// Foreground pixels at N8 distance 1 from the background.
///
/// The 1-pixel border is reported as background.
pub fn internal_contour(grid: &PixelGrid) -> Result<PixelGrid> {
    let mut output = grid.zeros_like();
    output.pixels_mut().fill(FOREGROUND);
    scan_into(grid, None, None, Span::square(1), &InternalContour, &mut output)?;
    output.set_max_val(FOREGROUND);
    Ok(output)
}

/// Zeroes the center of every uniform 3x3 region, keeps the rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformContour;

impl KernelFunction for UniformContour {
    fn evaluate(
        &self,
        primary: &PixelGrid,
        _secondary: Option<&PixelGrid>,
        _weights: Option<ArrayView2<'_, f64>>,
        _span: Span,
        center: usize,
    ) -> i32 {
        let value = primary.at(center);
        let integral: i64 = primary
            .window(center, Span::square(1))
            .iter()
            .map(|&p| p.abs() as i64)
            .sum();
        if integral == 9 * value as i64 {
            0
        } else {
            value
        }
    }
}

/// Contours of a piecewise-flat image.
pub fn uniform_contour(grid: &PixelGrid) -> Result<PixelGrid> {
    scan(grid, None, None, Span::square(1), &UniformContour)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 7x7 white image with a black 3x3 square at the center.
    fn square() -> PixelGrid {
        let pixels = (0..49)
            .map(|i| {
                let (r, c) = (i / 7, i % 7);
                if (2..5).contains(&r) && (2..5).contains(&c) {
                    0
                } else {
                    255
                }
            })
            .collect();
        PixelGrid::from_vec(7, 7, 255, pixels).unwrap()
    }

    #[test]
    fn test_internal_contour_ring() {
        let out = internal_contour(&square()).unwrap();
        // Ring of the square is contour, its center is interior
        assert_eq!(out.get(2, 2), Some(0));
        assert_eq!(out.get(2, 3), Some(0));
        assert_eq!(out.get(3, 3), Some(255));
        assert_eq!(out.get(0, 0), Some(255));
        assert_eq!(out.get(1, 1), Some(255));
        assert_eq!(out.pixels().iter().filter(|&&p| p == 0).count(), 8);
    }

    #[test]
    fn test_uniform_contour_keeps_edges() {
        let out = uniform_contour(&square()).unwrap();
        assert_eq!(out.get(3, 3), Some(0));
        assert_eq!(out.get(1, 1), Some(255));
        assert_eq!(out.get(4, 5), Some(255));

        let flat = PixelGrid::from_vec(4, 4, 40, vec![40; 16]).unwrap();
        assert_eq!(uniform_contour(&flat).unwrap().count_nonzero(), 0);
    }
}
