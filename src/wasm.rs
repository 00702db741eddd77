//! WebAssembly exports for EdgeStag filters.
//!
//! These functions are exposed to JavaScript via wasm-bindgen.
//!
//! ## Buffers
//!
//! Images cross the boundary as flat row-major `Int32Array`s
//! (length = width * height) plus their dimensions. Errors surface as
//! JavaScript exceptions carrying the error message.

use wasm_bindgen::prelude::*;

use crate::error::FilterError;
use crate::filters::blur::gauss;
use crate::filters::edge::{edges, sobel, GradientOutput};
use crate::filters::noise::median;
use crate::grid::PixelGrid;

fn to_grid(data: &[i32], width: usize, height: usize) -> Result<PixelGrid, JsValue> {
    let max_val = data.iter().copied().max().unwrap_or(0).max(0);
    PixelGrid::from_vec(width, height, max_val, data.to_vec()).map_err(to_js)
}

fn to_js(err: FilterError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ============================================================================
// Smoothing
// ============================================================================

/// Separable Gaussian smoothing.
///
/// # Arguments
/// * `data` - Flat array of samples (length = width * height)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `sigma` - Standard deviation of the Gaussian
/// * `dim` - Kernel size, 0 to derive it from sigma
///
/// # Returns
/// Flat array of smoothed samples
#[wasm_bindgen]
pub fn gauss_wasm(
    data: &[i32],
    width: usize,
    height: usize,
    sigma: f64,
    dim: usize,
) -> Result<Vec<i32>, JsValue> {
    let grid = to_grid(data, width, height)?;
    Ok(gauss(&grid, sigma, dim).map_err(to_js)?.to_vec())
}

/// 3x3 median filter.
#[wasm_bindgen]
pub fn median_wasm(data: &[i32], width: usize, height: usize) -> Result<Vec<i32>, JsValue> {
    let grid = to_grid(data, width, height)?;
    Ok(median(&grid).map_err(to_js)?.to_vec())
}

// ============================================================================
// Edge Detection
// ============================================================================

/// Sobel gradient magnitude.
#[wasm_bindgen]
pub fn sobel_wasm(data: &[i32], width: usize, height: usize) -> Result<Vec<i32>, JsValue> {
    let grid = to_grid(data, width, height)?;
    Ok(sobel(&grid, GradientOutput::Magnitude).map_err(to_js)?.to_vec())
}

/// Full edge pipeline.
///
/// # Returns
/// Flat 0/255 edge mask
#[wasm_bindgen]
pub fn edges_wasm(
    data: &[i32],
    width: usize,
    height: usize,
    sigma: f64,
    high: i32,
    low: i32,
) -> Result<Vec<i32>, JsValue> {
    let grid = to_grid(data, width, height)?;
    Ok(edges(&grid, sigma, 0, high, low).map_err(to_js)?.to_vec())
}
