//! Normalization and bit-depth conversion helpers.
//!
//! Host code decodes image files itself (numpy, canvas, ...) and hands the
//! pixels over as arrays. These helpers bring such arrays into the 0.0-1.0
//! float representation the tone filters expect, and back to 8-bit.

use ndarray::{ArrayD, ArrayViewD};

use crate::error::{ToneError, ToneResult};
use crate::filters::core::Layout;

/// Color mode of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Representation {
    Grayscale = 1,
    Rgb = 2,
}

impl Representation {
    /// Parse the numeric mode flag (1 = grayscale, 2 = RGB).
    pub fn from_code(code: i64) -> ToneResult<Self> {
        match code {
            1 => Ok(Representation::Grayscale),
            2 => Ok(Representation::Rgb),
            other => Err(ToneError::InvalidInput(format!(
                "unknown representation {}, expected 1 (grayscale) or 2 (RGB)",
                other
            ))),
        }
    }

    /// Representation of an in-memory image, from its shape.
    pub fn of(image: &ArrayViewD<f32>) -> ToneResult<Self> {
        Ok(if Layout::detect(image.shape())?.is_color() {
            Representation::Rgb
        } else {
            Representation::Grayscale
        })
    }
}

/// Min-max normalize arbitrary real data to 0.0-1.0.
///
/// Constant data maps to 0.0. The range is taken in f64, so data spanning
/// most of the f32 range still normalizes.
pub fn normalize_data(data: ArrayViewD<f32>) -> ToneResult<ArrayD<f32>> {
    if data.is_empty() {
        return Err(ToneError::EmptyImage);
    }

    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in data.iter() {
        if !v.is_finite() {
            return Err(ToneError::InvalidInput(format!("non-finite value {}", v)));
        }
        min = min.min(v);
        max = max.max(v);
    }

    let (min, range) = (min as f64, max as f64 - min as f64);
    if range <= 0.0 {
        return Ok(ArrayD::<f32>::zeros(data.raw_dim()));
    }
    Ok(data.mapv(|v| ((v as f64 - min) / range) as f32))
}

/// Convert u8 image (0-255) to f32 (0.0-1.0)
pub fn u8_to_f32(input: ArrayViewD<u8>) -> ArrayD<f32> {
    input.mapv(|v| v as f32 / 255.0)
}

/// Convert f32 image (0.0-1.0) to u8 (0-255), rounding to nearest
pub fn f32_to_u8(input: ArrayViewD<f32>) -> ArrayD<u8> {
    input.mapv(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3, IxDyn};

    #[test]
    fn test_normalize_data_range() {
        let data = array![[10.0f32, 20.0], [30.0, 50.0]].into_dyn();
        let out = normalize_data(data.view()).unwrap();

        assert_eq!(out[[0, 0]], 0.0);
        assert_eq!(out[[1, 1]], 1.0);
        assert!((out[[0, 1]] - 0.25).abs() < 1e-6);
        assert!((out[[1, 0]] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_data_extreme_range() {
        let data = array![-3.0e38f32, 0.0, 3.0e38].into_dyn();
        let out = normalize_data(data.view()).unwrap();

        assert!(out.iter().all(|v| v.is_finite()));
        assert_eq!(out[[0]], 0.0);
        assert!((out[[1]] - 0.5).abs() < 1e-6);
        assert_eq!(out[[2]], 1.0);
    }

    #[test]
    fn test_normalize_data_constant() {
        let data = ArrayD::<f32>::from_elem(IxDyn(&[2, 2, 3]), 42.0);
        let out = normalize_data(data.view()).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
        assert_eq!(out.shape(), &[2, 2, 3]);
    }

    #[test]
    fn test_normalize_data_errors() {
        let empty = ArrayD::<f32>::zeros(IxDyn(&[0, 3]));
        assert_eq!(normalize_data(empty.view()).unwrap_err(), ToneError::EmptyImage);

        let inf = array![1.0f32, f32::INFINITY].into_dyn();
        assert!(normalize_data(inf.view()).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_representation() {
        assert_eq!(Representation::from_code(1).unwrap(), Representation::Grayscale);
        assert_eq!(Representation::from_code(2).unwrap(), Representation::Rgb);
        assert!(Representation::from_code(3).is_err());

        let gray = Array3::<f32>::zeros((2, 2, 1)).into_dyn();
        let rgb = Array3::<f32>::zeros((2, 2, 3)).into_dyn();
        assert_eq!(Representation::of(&gray.view()).unwrap(), Representation::Grayscale);
        assert_eq!(Representation::of(&rgb.view()).unwrap(), Representation::Rgb);
    }

    #[test]
    fn test_u8_f32_roundtrip() {
        let img = array![[0u8, 1, 128], [200, 254, 255]].into_dyn();
        let back = f32_to_u8(u8_to_f32(img.view()).view());
        assert_eq!(back, img);
    }
}
