//! Filter modules for single-channel images.
//!
//! ## Supported Formats
//!
//! Every filter works on a [`PixelGrid`](crate::grid::PixelGrid): one channel
//! of signed `i32` samples, row-major, shape `(height, width)`. Intermediate
//! results (gradients, phases, Difference of Gaussians) may be negative or
//! exceed 255; `max_val` tracks the largest value written.
//!
//! ## Architecture
//!
//! - **Scan engine** - every neighborhood filter is a [`scan::KernelFunction`]
//!   applied to interior pixels; the border band is never written
//! - **Pure kernels** - kernel functions only read their inputs
//! - **Fresh outputs** - filters return a new grid and never modify the input
//!
//! ## Filter Categories
//!
//! - **Kernels**: box, identity, Sobel, Prewitt, Gaussian, DoG (`core`)
//! - **Pixel-wise**: absolute, threshold, linear add, magnitude, phase, invert,
//!   flip, normalize, equalize (`basic`)
//! - **Noise**: uniform and salt-and-pepper noise, median, average, Nagao (`noise`)
//! - **Smoothing**: Gaussian, DoG, sharpening (`blur`)
//! - **Edge detection**: gradient, 3/9 operator, suppression, hysteresis (`edge`)
//! - **Contours**: internal N8 contour, uniform-region contour (`contour`)

pub mod basic;
pub mod blur;
pub mod contour;
pub mod core;
pub mod edge;
pub mod noise;
pub mod scan;

pub use crate::error::Result;
