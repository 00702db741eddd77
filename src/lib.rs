//! EdgeStag: grayscale kernel filtering and edge detection.
//!
//! Neighborhood filters and a Canny-style edge pipeline over single-channel
//! integer images, with Python bindings via PyO3 and WASM bindings for
//! JavaScript.
//!
//! ## Image Format
//! Images are [`PixelGrid`]s: one channel of `i32` samples, row-major, shape
//! `(height, width)`. Samples are signed so gradients and phases fit; the
//! declared `max_val` follows the largest value a filter writes.
//!
//! ## Filter Architecture
//! Neighborhood filters are [`filters::scan::KernelFunction`]s run by the scan
//! engine over interior pixels only. Each filter returns a new grid of the
//! input's size; the band the neighborhood cannot cover stays 0.
//!
//! ## Around the Core
//! - [`pgm`]: P2/P5 reading and writing
//! - [`script`]: line-oriented filter scripts
//! - [`config`]: TOML configuration for the command-line tool

pub mod config;
pub mod error;
pub mod filters;
pub mod grid;
pub mod pgm;
pub mod script;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{FilterError, Result};
pub use filters::core::Kernel;
pub use filters::edge::{edges, edges_with, hysteresis, suppress, EdgeOptions};
pub use filters::scan::{scan, scan_into, KernelFunction};
pub use grid::{Histogram, PixelGrid, Span};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::error::FilterError;
    use crate::filters::{basic, blur, edge, noise};
    use crate::grid::PixelGrid;

    impl From<FilterError> for PyErr {
        fn from(err: FilterError) -> PyErr {
            PyValueError::new_err(err.to_string())
        }
    }

    /// Wrap a 2D int32 array; `max_val` is its largest sample (at least 0).
    fn to_grid(image: PyReadonlyArray2<'_, i32>) -> PyResult<PixelGrid> {
        let pixels = image.as_array().to_owned();
        let max_val = pixels.iter().copied().max().unwrap_or(0).max(0);
        Ok(PixelGrid::from_array(pixels, max_val)?)
    }

    fn to_numpy(py: Python<'_>, grid: PixelGrid) -> Bound<'_, PyArray2<i32>> {
        grid.into_array().into_pyarray(py)
    }

    // ========================================================================
    // Smoothing and Denoising
    // ========================================================================

    /// Separable Gaussian smoothing. `dim = 0` derives the size from sigma.
    #[pyfunction]
    #[pyo3(signature = (image, sigma=1.0, dim=0))]
    pub fn gauss<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, i32>,
        sigma: f64,
        dim: usize,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        let result = blur::gauss(&to_grid(image)?, sigma, dim)?;
        Ok(to_numpy(py, result))
    }

    /// Difference of Gaussians.
    #[pyfunction]
    #[pyo3(signature = (image, sigma=1.0, dim=0))]
    pub fn dog<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, i32>,
        sigma: f64,
        dim: usize,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        let result = blur::dog(&to_grid(image)?, sigma, dim)?;
        Ok(to_numpy(py, result))
    }

    #[pyfunction]
    pub fn sharpen<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, i32>,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        Ok(to_numpy(py, blur::sharpen(&to_grid(image)?)?))
    }

    #[pyfunction]
    pub fn median<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, i32>,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        Ok(to_numpy(py, noise::median(&to_grid(image)?)?))
    }

    #[pyfunction]
    pub fn nagao<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, i32>,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        Ok(to_numpy(py, noise::nagao(&to_grid(image)?)?))
    }

    #[pyfunction]
    pub fn operator_39<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, i32>,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        Ok(to_numpy(py, edge::operator_39(&to_grid(image)?)?))
    }

    // ========================================================================
    // Edge Detection
    // ========================================================================

    /// Sobel gradient magnitude, or phase when `phase` is true.
    #[pyfunction]
    #[pyo3(signature = (image, phase=false))]
    pub fn sobel<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, i32>,
        phase: bool,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        let output = if phase {
            edge::GradientOutput::Phase
        } else {
            edge::GradientOutput::Magnitude
        };
        Ok(to_numpy(py, edge::sobel(&to_grid(image)?, output)?))
    }

    /// Non-maximum suppression of a gradient magnitude given its phase.
    #[pyfunction]
    pub fn suppress<'py>(
        py: Python<'py>,
        magnitude: PyReadonlyArray2<'py, i32>,
        phase: PyReadonlyArray2<'py, i32>,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        let result = edge::suppress(&to_grid(magnitude)?, &to_grid(phase)?)?;
        Ok(to_numpy(py, result))
    }

    #[pyfunction]
    pub fn hysteresis<'py>(
        py: Python<'py>,
        magnitude: PyReadonlyArray2<'py, i32>,
        high: i32,
        low: i32,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        let result = edge::hysteresis(&to_grid(magnitude)?, high, low)?;
        Ok(to_numpy(py, result))
    }

    /// Full edge pipeline; returns a 0/255 mask.
    #[pyfunction]
    #[pyo3(signature = (image, sigma=std::f64::consts::SQRT_2, dim=0, high=75, low=25))]
    pub fn edges<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, i32>,
        sigma: f64,
        dim: usize,
        high: i32,
        low: i32,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        let result = edge::edges(&to_grid(image)?, sigma, dim, high, low)?;
        Ok(to_numpy(py, result))
    }

    // ========================================================================
    // Tonal
    // ========================================================================

    #[pyfunction]
    pub fn threshold<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, i32>,
        value: i32,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        Ok(to_numpy(py, basic::threshold(&to_grid(image)?, value)))
    }

    #[pyfunction]
    pub fn normalize<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, i32>,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        Ok(to_numpy(py, basic::normalize(&to_grid(image)?)))
    }

    #[pyfunction]
    pub fn equalize<'py>(
        py: Python<'py>,
        image: PyReadonlyArray2<'py, i32>,
    ) -> PyResult<Bound<'py, PyArray2<i32>>> {
        Ok(to_numpy(py, basic::equalize(&to_grid(image)?)?))
    }

    /// EdgeStag extension module
    #[pymodule]
    pub fn edgestag(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Smoothing and denoising
        m.add_function(wrap_pyfunction!(gauss, m)?)?;
        m.add_function(wrap_pyfunction!(dog, m)?)?;
        m.add_function(wrap_pyfunction!(sharpen, m)?)?;
        m.add_function(wrap_pyfunction!(median, m)?)?;
        m.add_function(wrap_pyfunction!(nagao, m)?)?;
        m.add_function(wrap_pyfunction!(operator_39, m)?)?;

        // Edge detection
        m.add_function(wrap_pyfunction!(sobel, m)?)?;
        m.add_function(wrap_pyfunction!(suppress, m)?)?;
        m.add_function(wrap_pyfunction!(hysteresis, m)?)?;
        m.add_function(wrap_pyfunction!(edges, m)?)?;

        // Tonal
        m.add_function(wrap_pyfunction!(threshold, m)?)?;
        m.add_function(wrap_pyfunction!(normalize, m)?)?;
        m.add_function(wrap_pyfunction!(equalize, m)?)?;

        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::edgestag;
