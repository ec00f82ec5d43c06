//! Luminance/chrominance color space conversion (RGB <-> YIQ).
//!
//! The tone filters work on luminance only. Color images are moved into YIQ,
//! the Y plane is processed, and the result is moved back to RGB with the
//! I/Q chrominance untouched.
//!
//! ## Supported Formats
//!
//! - **RGB (3 channels)**: (height, width, 3), values 0.0-1.0
//! - Any other channel count is rejected with [`ToneError::ChannelMismatch`]
//!
//! Y lies in 0.0-1.0 for in-range RGB input; I and Q are signed.

use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

use crate::error::{ToneError, ToneResult};

/// RGB -> YIQ transform. Rows produce Y, I and Q respectively.
pub const RGB_TO_YIQ: [[f32; 3]; 3] = [
    [0.299, 0.587, 0.114],
    [0.596, -0.275, -0.321],
    [0.212, -0.523, 0.311],
];

/// Exact inverse of [`RGB_TO_YIQ`].
///
/// The chroma rows of the forward matrix sum to zero and the luma row sums
/// to one, so the first column is exactly one.
pub const YIQ_TO_RGB: [[f32; 3]; 3] = [
    [1.0, 0.955_688_06, 0.619_858_1],
    [1.0, -0.271_581_8, -0.646_873_8],
    [1.0, -1.108_177_3, 1.705_064_6],
];

#[inline]
fn mat_mul(m: &[[f32; 3]; 3], a: f32, b: f32, c: f32) -> (f32, f32, f32) {
    (
        m[0][0] * a + m[0][1] * b + m[0][2] * c,
        m[1][0] * a + m[1][1] * b + m[1][2] * c,
        m[2][0] * a + m[2][1] * b + m[2][2] * c,
    )
}

/// Convert one RGB pixel to YIQ.
#[inline]
pub fn rgb_to_yiq(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    mat_mul(&RGB_TO_YIQ, r, g, b)
}

/// Convert one YIQ pixel to RGB.
#[inline]
pub fn yiq_to_rgb(y: f32, i: f32, q: f32) -> (f32, f32, f32) {
    mat_mul(&YIQ_TO_RGB, y, i, q)
}

fn transform(
    input: ArrayView3<f32>,
    pixel: fn(f32, f32, f32) -> (f32, f32, f32),
) -> ToneResult<Array3<f32>> {
    let (height, width, channels) = input.dim();
    if channels != 3 {
        return Err(ToneError::ChannelMismatch {
            expected: "3 channels",
            actual: channels,
        });
    }
    if width == 0 || height == 0 {
        return Ok(Array3::<f32>::zeros((height, width, 3)));
    }

    let mut flat = vec![0.0f32; height * width * 3];
    flat.par_chunks_mut(width * 3)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                let (a, b, c) = pixel(
                    input[[y, x, 0]],
                    input[[y, x, 1]],
                    input[[y, x, 2]],
                );
                row[x * 3] = a;
                row[x * 3 + 1] = b;
                row[x * 3 + 2] = c;
            }
        });

    Array3::from_shape_vec((height, width, 3), flat)
        .map_err(|e| ToneError::InvalidInput(e.to_string()))
}

/// Convert an RGB image to YIQ.
///
/// # Arguments
/// * `input` - Image of shape (height, width, 3), RGB values 0.0-1.0
///
/// # Returns
/// YIQ image of the same shape
pub fn rgb_to_yiq_f32(input: ArrayView3<f32>) -> ToneResult<Array3<f32>> {
    transform(input, rgb_to_yiq)
}

/// Convert a YIQ image back to RGB.
///
/// # Arguments
/// * `input` - Image of shape (height, width, 3) holding Y, I, Q
///
/// # Returns
/// RGB image of the same shape (not clamped)
pub fn yiq_to_rgb_f32(input: ArrayView3<f32>) -> ToneResult<Array3<f32>> {
    transform(input, yiq_to_rgb)
}
