//! WebAssembly exports for Tonestag filters.
//!
//! These functions are exposed to JavaScript via wasm-bindgen.
//!
//! Images cross the boundary as flat f32 buffers (values 0.0-1.0) in
//! row-major (height, width, channels) order. `channels` is 1, 3 or 4.

use ndarray::{aview1, ArrayD, IxDyn};
use wasm_bindgen::prelude::*;

use crate::filters::colorspace::{rgb_to_yiq_f32, yiq_to_rgb_f32};
use crate::filters::convert::{f32_to_u8, u8_to_f32};
use crate::filters::equalize::equalize_histogram;
use crate::filters::quantize::quantize_image;

fn image_from_flat(
    data: &[f32],
    width: usize,
    height: usize,
    channels: usize,
) -> Result<ArrayD<f32>, JsError> {
    let shape = if channels == 1 {
        vec![height, width]
    } else {
        vec![height, width, channels]
    };
    ArrayD::from_shape_vec(IxDyn(&shape), data.to_vec()).map_err(|e| JsError::new(&e.to_string()))
}

// ============================================================================
// Color Space
// ============================================================================

/// Convert a flat RGB buffer (width * height * 3) to YIQ.
#[wasm_bindgen]
pub fn rgb_to_yiq_wasm(data: &[f32], width: usize, height: usize) -> Result<Vec<f32>, JsError> {
    let input = ndarray::Array3::from_shape_vec((height, width, 3), data.to_vec())
        .map_err(|e| JsError::new(&e.to_string()))?;
    let result = rgb_to_yiq_f32(input.view())?;
    Ok(result.into_raw_vec_and_offset().0)
}

/// Convert a flat YIQ buffer (width * height * 3) back to RGB.
#[wasm_bindgen]
pub fn yiq_to_rgb_wasm(data: &[f32], width: usize, height: usize) -> Result<Vec<f32>, JsError> {
    let input = ndarray::Array3::from_shape_vec((height, width, 3), data.to_vec())
        .map_err(|e| JsError::new(&e.to_string()))?;
    let result = yiq_to_rgb_f32(input.view())?;
    Ok(result.into_raw_vec_and_offset().0)
}

// ============================================================================
// Histogram Equalization
// ============================================================================

/// Equalized image plus luminance histograms.
#[wasm_bindgen]
pub struct EqualizeResultWasm {
    image: Vec<f32>,
    original_histogram: Vec<u64>,
    equalized_histogram: Vec<u64>,
}

#[wasm_bindgen]
impl EqualizeResultWasm {
    #[wasm_bindgen(getter)]
    pub fn image(&self) -> Vec<f32> {
        self.image.clone()
    }

    #[wasm_bindgen(getter, js_name = originalHistogram)]
    pub fn original_histogram(&self) -> Vec<u64> {
        self.original_histogram.clone()
    }

    #[wasm_bindgen(getter, js_name = equalizedHistogram)]
    pub fn equalized_histogram(&self) -> Vec<u64> {
        self.equalized_histogram.clone()
    }
}

/// Equalize the luminance histogram of a flat image buffer.
///
/// # Arguments
/// * `data` - Flat array of floats (length = width * height * channels), values 0.0-1.0
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `channels` - 1, 3 or 4
#[wasm_bindgen]
pub fn equalize_histogram_wasm(
    data: &[f32],
    width: usize,
    height: usize,
    channels: usize,
) -> Result<EqualizeResultWasm, JsError> {
    let input = image_from_flat(data, width, height, channels)?;
    let (image, original, equalized) = equalize_histogram(input.view())?.into_parts();

    Ok(EqualizeResultWasm {
        image: image.into_raw_vec_and_offset().0,
        original_histogram: original.counts().to_vec(),
        equalized_histogram: equalized.counts().to_vec(),
    })
}

// ============================================================================
// Quantization
// ============================================================================

/// Every iteration of a quantization run.
#[wasm_bindgen]
pub struct QuantizeResultWasm {
    frames: Vec<f32>,
    errors: Vec<f64>,
}

#[wasm_bindgen]
impl QuantizeResultWasm {
    /// All iteration images back to back (iterations * width * height * channels).
    #[wasm_bindgen(getter)]
    pub fn frames(&self) -> Vec<f32> {
        self.frames.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn errors(&self) -> Vec<f64> {
        self.errors.clone()
    }
}

/// Quantize the luminance of a flat image buffer.
///
/// # Arguments
/// * `data` - Flat array of floats (length = width * height * channels), values 0.0-1.0
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `channels` - 1, 3 or 4
/// * `n_quant` - Number of levels (>= 1)
/// * `n_iter` - Number of iterations (>= 0)
#[wasm_bindgen]
pub fn quantize_image_wasm(
    data: &[f32],
    width: usize,
    height: usize,
    channels: usize,
    n_quant: i32,
    n_iter: i32,
) -> Result<QuantizeResultWasm, JsError> {
    let input = image_from_flat(data, width, height, channels)?;
    let (images, errors) =
        quantize_image(input.view(), n_quant as i64, n_iter as i64)?.into_parts();

    let frames = images
        .into_iter()
        .flat_map(|img| img.into_raw_vec_and_offset().0)
        .collect();

    Ok(QuantizeResultWasm { frames, errors })
}

// ============================================================================
// Conversion Utilities
// ============================================================================

/// Convert a flat u8 buffer (0-255) to f32 (0.0-1.0).
#[wasm_bindgen]
pub fn convert_u8_to_f32_wasm(data: &[u8]) -> Vec<f32> {
    u8_to_f32(aview1(data).into_dyn()).into_raw_vec_and_offset().0
}

/// Convert a flat f32 buffer (0.0-1.0) to u8 (0-255), rounding to nearest.
#[wasm_bindgen]
pub fn convert_f32_to_u8_wasm(data: &[f32]) -> Vec<u8> {
    f32_to_u8(aview1(data).into_dyn()).into_raw_vec_and_offset().0
}
