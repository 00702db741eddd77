//! Pixel grid and histogram.
//!
//! A [`PixelGrid`] is a single-channel image of signed integer samples stored
//! row-major in an `ndarray::Array2` of shape `(height, width)`. Signed values
//! are needed because gradient and phase stages produce negative samples.
//!
//! Neighborhood code addresses pixels by linear index (`row * width + col`);
//! [`PixelGrid::index_of`] and [`PixelGrid::coords_of`] convert between the
//! two forms and [`PixelGrid::window`] hands out the bounds-checked
//! rectangular neighborhood of an index.

use ndarray::{s, Array2, ArrayView2};

use crate::error::{FilterError, Result};

/// Half-extents of a neighborhood: `x` columns left and right, `y` rows up
/// and down of the center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub x: usize,
    pub y: usize,
}

impl Span {
    pub const fn new(x: usize, y: usize) -> Self {
        Span { x, y }
    }

    /// Same half-extent in both directions.
    pub const fn square(radius: usize) -> Self {
        Span { x: radius, y: radius }
    }

    /// Full neighborhood width, `2x + 1`.
    pub const fn width(&self) -> usize {
        2 * self.x + 1
    }

    /// Full neighborhood height, `2y + 1`.
    pub const fn height(&self) -> usize {
        2 * self.y + 1
    }

    /// True when this span reaches at least as far as `other` in both directions.
    pub const fn covers(&self, other: Span) -> bool {
        self.x >= other.x && self.y >= other.y
    }
}

/// Single-channel image buffer.
///
/// Size is fixed at creation. `max_val` is the declared dynamic range; it is
/// advisory and producers overwrite it with the largest value they wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    max_val: i32,
    pixels: Array2<i32>,
}

impl PixelGrid {
    /// Create a zero-filled grid.
    pub fn new(width: usize, height: usize, max_val: i32) -> Result<Self> {
        if width < 1 || height < 1 {
            return Err(FilterError::InvalidDimensions { width, height });
        }
        Ok(PixelGrid {
            max_val,
            pixels: Array2::zeros((height, width)),
        })
    }

    /// Wrap a row-major pixel buffer.
    pub fn from_vec(width: usize, height: usize, max_val: i32, pixels: Vec<i32>) -> Result<Self> {
        if width < 1 || height < 1 {
            return Err(FilterError::InvalidDimensions { width, height });
        }
        let expected = width * height;
        let found = pixels.len();
        let pixels = Array2::from_shape_vec((height, width), pixels)
            .map_err(|_| FilterError::PixelCountMismatch { expected, found })?;
        Ok(PixelGrid { max_val, pixels })
    }

    /// Wrap an existing `(height, width)` array.
    pub fn from_array(pixels: Array2<i32>, max_val: i32) -> Result<Self> {
        let (height, width) = pixels.dim();
        if width < 1 || height < 1 {
            return Err(FilterError::InvalidDimensions { width, height });
        }
        Ok(PixelGrid { max_val, pixels })
    }

    /// A zeroed grid with the same size and declared range as `self`.
    pub fn zeros_like(&self) -> Self {
        PixelGrid {
            max_val: self.max_val,
            pixels: Array2::zeros(self.pixels.raw_dim()),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    /// `(width, height)`.
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// Number of pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Always false: a grid holds at least one pixel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn max_val(&self) -> i32 {
        self.max_val
    }

    #[inline]
    pub fn set_max_val(&mut self, max_val: i32) {
        self.max_val = max_val;
    }

    pub fn pixels(&self) -> &Array2<i32> {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut Array2<i32> {
        &mut self.pixels
    }

    pub fn into_array(self) -> Array2<i32> {
        self.pixels
    }

    /// Row-major copy of the samples.
    pub fn to_vec(&self) -> Vec<i32> {
        self.pixels.iter().copied().collect()
    }

    /// Linear index of `(row, col)`.
    #[inline]
    pub fn index_of(&self, row: usize, col: usize) -> usize {
        row * self.width() + col
    }

    /// `(row, col)` of a linear index.
    #[inline]
    pub fn coords_of(&self, index: usize) -> (usize, usize) {
        (index / self.width(), index % self.width())
    }

    /// Sample at `(row, col)`, `None` outside the grid.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<i32> {
        self.pixels.get((row, col)).copied()
    }

    /// Write `(row, col)`; returns false outside the grid.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: i32) -> bool {
        match self.pixels.get_mut((row, col)) {
            Some(p) => {
                *p = value;
                true
            }
            None => false,
        }
    }

    /// Sample at a linear index.
    ///
    /// # Panics
    /// If `index >= self.len()`.
    #[inline]
    pub fn at(&self, index: usize) -> i32 {
        let (row, col) = self.coords_of(index);
        self.pixels[[row, col]]
    }

    /// Rectangular neighborhood of `center`, in raster order when iterated.
    ///
    /// # Panics
    /// If the neighborhood leaves the grid. The scan engine only visits
    /// centers whose neighborhood fits.
    pub fn window(&self, center: usize, span: Span) -> ArrayView2<'_, i32> {
        let (row, col) = self.coords_of(center);
        self.pixels.slice(s![
            row - span.y..=row + span.y,
            col - span.x..=col + span.x
        ])
    }

    /// Copy surrounded by a zero band `span` wide, so that every original
    /// pixel becomes an interior pixel for a scan with that span.
    pub fn padded(&self, span: Span) -> PixelGrid {
        let (height, width) = self.pixels.dim();
        let mut pixels = Array2::zeros((height + 2 * span.y, width + 2 * span.x));
        pixels
            .slice_mut(s![span.y..span.y + height, span.x..span.x + width])
            .assign(&self.pixels);
        PixelGrid {
            max_val: self.max_val,
            pixels,
        }
    }

    /// Inverse of [`PixelGrid::padded`]: drop a band `span` wide.
    pub fn cropped(&self, span: Span) -> Result<PixelGrid> {
        let (height, width) = self.pixels.dim();
        if width <= 2 * span.x || height <= 2 * span.y {
            return Err(FilterError::InvalidDimensions {
                width: width.saturating_sub(2 * span.x),
                height: height.saturating_sub(2 * span.y),
            });
        }
        let pixels = self
            .pixels
            .slice(s![span.y..height - span.y, span.x..width - span.x])
            .to_owned();
        Ok(PixelGrid {
            max_val: self.max_val,
            pixels,
        })
    }

    /// Zero every pixel in place.
    pub fn reset(&mut self) {
        self.pixels.fill(0);
    }

    /// Copy pixels and `max_val` from `src`. Sizes must match.
    pub fn copy_from(&mut self, src: &PixelGrid) -> Result<()> {
        self.ensure_same_size(src)?;
        self.pixels.assign(&src.pixels);
        self.max_val = src.max_val;
        Ok(())
    }

    /// Fail with [`FilterError::DimensionMismatch`] unless `other` has our size.
    pub fn ensure_same_size(&self, other: &PixelGrid) -> Result<()> {
        if self.dims() != other.dims() {
            return Err(FilterError::DimensionMismatch {
                expected: self.dims(),
                found: other.dims(),
            });
        }
        Ok(())
    }

    /// Largest sample actually stored.
    pub fn observed_max(&self) -> i32 {
        self.pixels.iter().copied().max().unwrap_or(0)
    }

    /// Smallest sample actually stored.
    pub fn observed_min(&self) -> i32 {
        self.pixels.iter().copied().min().unwrap_or(0)
    }

    /// Number of non-zero samples.
    pub fn count_nonzero(&self) -> usize {
        self.pixels.iter().filter(|&&p| p != 0).count()
    }

    pub fn histogram(&self) -> Result<Histogram> {
        Histogram::of(self)
    }
}

/// Most buckets a [`Histogram`] allocates.
pub const MAX_HISTOGRAM_BUCKETS: usize = 1 << 24;

/// Per-intensity pixel counts between the observed minimum and maximum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    min_val: i32,
    max_val: i32,
    counts: Vec<usize>,
}

impl Histogram {
    /// Fails with [`FilterError::HistogramRange`] when the observed range
    /// needs more than [`MAX_HISTOGRAM_BUCKETS`] buckets.
    pub fn of(grid: &PixelGrid) -> Result<Self> {
        let min_val = grid.observed_min();
        let max_val = grid.observed_max();
        let size = i64::from(max_val) - i64::from(min_val) + 1;
        if size > MAX_HISTOGRAM_BUCKETS as i64 {
            return Err(FilterError::HistogramRange {
                min: min_val,
                max: max_val,
                limit: MAX_HISTOGRAM_BUCKETS,
            });
        }

        let mut counts = vec![0usize; size as usize];
        for &p in grid.pixels().iter() {
            counts[Self::bucket(min_val, p)] += 1;
        }

        Ok(Histogram {
            min_val,
            max_val,
            counts,
        })
    }

    #[inline]
    fn bucket(min_val: i32, value: i32) -> usize {
        (i64::from(value) - i64::from(min_val)) as usize
    }

    pub fn min_val(&self) -> i32 {
        self.min_val
    }

    pub fn max_val(&self) -> i32 {
        self.max_val
    }

    /// Number of buckets, `max_val - min_val + 1`.
    pub fn size(&self) -> usize {
        self.counts.len()
    }

    /// Bucket counts; index 0 is `min_val`.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Pixels with exactly `value`.
    pub fn count(&self, value: i32) -> usize {
        if value < self.min_val || value > self.max_val {
            return 0;
        }
        self.counts[Self::bucket(self.min_val, value)]
    }

    /// Pixels with a value `<= value`.
    pub fn cumulative(&self, value: i32) -> usize {
        if value < self.min_val {
            return 0;
        }
        let last = Self::bucket(self.min_val, value.min(self.max_val));
        self.counts[..=last].iter().sum()
    }

    /// Running totals: entry `i` counts the pixels `<= min_val + i`.
    pub fn cdf(&self) -> Vec<usize> {
        self.counts
            .iter()
            .scan(0usize, |acc, &c| {
                *acc += c;
                Some(*acc)
            })
            .collect()
    }

    /// Index of `value` into [`Histogram::counts`] and [`Histogram::cdf`].
    ///
    /// # Panics
    /// If `value` lies outside `[min_val, max_val]`.
    pub fn index_of(&self, value: i32) -> usize {
        assert!(value >= self.min_val && value <= self.max_val);
        Self::bucket(self.min_val, value)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// `(value, count)` for every non-empty bucket.
    pub fn non_empty(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(move |(i, &c)| ((i64::from(self.min_val) + i as i64) as i32, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_zero_dimensions() {
        assert_eq!(
            PixelGrid::new(0, 3, 255),
            Err(FilterError::InvalidDimensions { width: 0, height: 3 })
        );
        assert!(PixelGrid::new(3, 0, 255).is_err());
    }

    #[test]
    fn test_new_is_zero_filled() {
        let grid = PixelGrid::new(4, 3, 255).unwrap();
        assert_eq!(grid.dims(), (4, 3));
        assert_eq!(grid.len(), 12);
        assert!(grid.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_from_vec_checks_length() {
        let err = PixelGrid::from_vec(2, 2, 255, vec![1, 2, 3]).unwrap_err();
        assert_eq!(err, FilterError::PixelCountMismatch { expected: 4, found: 3 });
    }

    #[test]
    fn test_index_round_trip() {
        let grid = PixelGrid::new(5, 4, 255).unwrap();
        assert_eq!(grid.index_of(2, 3), 13);
        assert_eq!(grid.coords_of(13), (2, 3));
    }

    #[test]
    fn test_window_is_raster_order() {
        let grid = PixelGrid::from_vec(3, 3, 8, (0..9).collect()).unwrap();
        let values: Vec<i32> = grid.window(4, Span::square(1)).iter().copied().collect();
        assert_eq!(values, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_copy_from_requires_matching_size() {
        let src = PixelGrid::from_vec(2, 2, 9, vec![1, 2, 3, 4]).unwrap();
        let mut dst = PixelGrid::new(3, 2, 0).unwrap();
        assert!(dst.copy_from(&src).is_err());
        // Untouched on failure
        assert!(dst.pixels().iter().all(|&p| p == 0));

        let mut dst = PixelGrid::new(2, 2, 0).unwrap();
        dst.copy_from(&src).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn test_reset_zeroes_in_place() {
        let mut grid = PixelGrid::from_vec(2, 1, 9, vec![5, 7]).unwrap();
        grid.reset();
        assert_eq!(grid.to_vec(), vec![0, 0]);
    }

    #[test]
    fn test_histogram_buckets() {
        let grid = PixelGrid::from_vec(3, 2, 255, vec![-1, 0, 0, 3, 3, 3]).unwrap();
        let hist = grid.histogram().unwrap();
        assert_eq!(hist.min_val(), -1);
        assert_eq!(hist.max_val(), 3);
        assert_eq!(hist.size(), 5);
        assert_eq!(hist.count(0), 2);
        assert_eq!(hist.count(3), 3);
        assert_eq!(hist.count(7), 0);
        assert_eq!(hist.cumulative(0), 3);
        assert_eq!(hist.total(), 6);
        assert_eq!(hist.non_empty().collect::<Vec<_>>(), vec![(-1, 1), (0, 2), (3, 3)]);
        assert_eq!(hist.cdf(), vec![1, 3, 3, 3, 6]);
        assert_eq!(hist.cdf()[hist.index_of(0)], hist.cumulative(0));
    }

    #[test]
    fn test_histogram_rejects_extreme_range() {
        let grid = PixelGrid::from_vec(2, 1, 0, vec![i32::MIN, i32::MAX]).unwrap();
        assert_eq!(
            grid.histogram(),
            Err(FilterError::HistogramRange {
                min: i32::MIN,
                max: i32::MAX,
                limit: MAX_HISTOGRAM_BUCKETS,
            })
        );
    }

    #[test]
    fn test_pad_and_crop() {
        let grid = PixelGrid::from_vec(2, 2, 9, vec![1, 2, 3, 4]).unwrap();
        let padded = grid.padded(Span::new(2, 1));
        assert_eq!(padded.dims(), (6, 4));
        assert_eq!(padded.get(1, 2), Some(1));
        assert_eq!(padded.get(2, 3), Some(4));
        assert_eq!(padded.count_nonzero(), 4);
        assert_eq!(padded.cropped(Span::new(2, 1)).unwrap(), grid);
        assert!(grid.cropped(Span::square(1)).is_err());
    }

    #[test]
    fn test_span_covers() {
        assert!(Span::square(2).covers(Span::square(1)));
        assert!(Span::square(1).covers(Span::square(1)));
        assert!(!Span::new(1, 0).covers(Span::square(1)));
    }
}
