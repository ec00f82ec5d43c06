//! Core utilities shared by the tone filters.
//!
//! This module provides:
//! - Channel layout detection for 2-D and 3-D inputs
//! - Luminance plane extraction and reconstruction through YIQ
//! - Min-max scaling of a float plane to 8-bit working levels

use ndarray::{s, Array2, Array3, ArrayD, ArrayView2, ArrayViewD, Axis, Ix2, Ix3};
use rayon::prelude::*;

use crate::error::{ToneError, ToneResult};
use crate::filters::colorspace::{rgb_to_yiq_f32, yiq_to_rgb_f32};

/// Channel layout of a filter input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// (height, width)
    Gray,
    /// (height, width, 1)
    GrayChannel,
    /// (height, width, 3)
    Rgb,
    /// (height, width, 4), alpha passed through
    Rgba,
}

impl Layout {
    /// Classify an array shape.
    pub fn detect(shape: &[usize]) -> ToneResult<Self> {
        let layout = match shape {
            [_, _] => Layout::Gray,
            [_, _, 1] => Layout::GrayChannel,
            [_, _, 3] => Layout::Rgb,
            [_, _, 4] => Layout::Rgba,
            [_, _, c] => {
                return Err(ToneError::ChannelMismatch {
                    expected: "1, 3 or 4 channels",
                    actual: *c,
                })
            }
            other => {
                return Err(ToneError::InvalidInput(format!(
                    "expected a 2-D or 3-D image, got {} dimensions",
                    other.len()
                )))
            }
        };
        if shape[0] == 0 || shape[1] == 0 {
            return Err(ToneError::EmptyImage);
        }
        Ok(layout)
    }

    pub fn is_color(self) -> bool {
        matches!(self, Layout::Rgb | Layout::Rgba)
    }
}

/// An image split into the luminance plane the tone filters operate on and
/// whatever is needed to rebuild the original layout around a new plane.
#[derive(Debug, Clone)]
pub struct LumaSplit {
    layout: Layout,
    luma: Array2<f32>,
    yiq: Option<Array3<f32>>,
    alpha: Option<Array2<f32>>,
}

impl LumaSplit {
    /// Split an image. Grayscale planes are taken as-is; color images go
    /// through YIQ and keep their I/Q planes for reconstruction.
    pub fn new(image: ArrayViewD<f32>) -> ToneResult<Self> {
        let layout = Layout::detect(image.shape())?;

        if layout == Layout::Gray {
            let plane = image
                .into_dimensionality::<Ix2>()
                .map_err(|e| ToneError::InvalidInput(e.to_string()))?;
            return Ok(Self {
                layout,
                luma: plane.to_owned(),
                yiq: None,
                alpha: None,
            });
        }

        let image = image
            .into_dimensionality::<Ix3>()
            .map_err(|e| ToneError::InvalidInput(e.to_string()))?;

        match layout {
            Layout::GrayChannel => Ok(Self {
                layout,
                luma: image.index_axis(Axis(2), 0).to_owned(),
                yiq: None,
                alpha: None,
            }),
            _ => {
                let yiq = rgb_to_yiq_f32(image.slice(s![.., .., 0..3]))?;
                let alpha = (layout == Layout::Rgba)
                    .then(|| image.index_axis(Axis(2), 3).to_owned());
                Ok(Self {
                    layout,
                    luma: yiq.index_axis(Axis(2), 0).to_owned(),
                    yiq: Some(yiq),
                    alpha,
                })
            }
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn luma(&self) -> ArrayView2<'_, f32> {
        self.luma.view()
    }

    /// Rebuild an image of the original layout with `luma` as its
    /// luminance.
    pub fn merge(&self, luma: ArrayView2<f32>) -> ToneResult<ArrayD<f32>> {
        if luma.dim() != self.luma.dim() {
            return Err(ToneError::InvalidInput(format!(
                "luminance plane {:?} does not match image {:?}",
                luma.dim(),
                self.luma.dim()
            )));
        }

        match (self.layout, &self.yiq) {
            (Layout::Gray, _) => Ok(luma.to_owned().into_dyn()),
            (Layout::GrayChannel, _) => Ok(luma.insert_axis(Axis(2)).to_owned().into_dyn()),
            (_, Some(yiq)) => {
                let mut yiq = yiq.clone();
                yiq.index_axis_mut(Axis(2), 0).assign(&luma);
                let rgb = yiq_to_rgb_f32(yiq.view())?;

                match &self.alpha {
                    None => Ok(rgb.into_dyn()),
                    Some(alpha) => {
                        let (height, width) = alpha.dim();
                        let mut out = Array3::<f32>::zeros((height, width, 4));
                        out.slice_mut(s![.., .., 0..3]).assign(&rgb);
                        out.index_axis_mut(Axis(2), 3).assign(alpha);
                        Ok(out.into_dyn())
                    }
                }
            }
            (layout, None) => Err(ToneError::InvalidInput(format!(
                "{:?} image without chrominance planes",
                layout
            ))),
        }
    }
}

/// Min-max scale a plane to 8-bit levels.
///
/// `(v - min) / (max - min) * 255`, truncated. A constant plane maps to
/// level 0.
pub fn scale_to_levels(plane: ArrayView2<f32>) -> ToneResult<Array2<u8>> {
    let (height, width) = plane.dim();
    if height == 0 || width == 0 {
        return Err(ToneError::EmptyImage);
    }

    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in plane.iter() {
        if !v.is_finite() {
            return Err(ToneError::InvalidInput(format!("non-finite pixel value {}", v)));
        }
        min = min.min(v);
        max = max.max(v);
    }

    let range = max as f64 - min as f64;
    if range <= 0.0 {
        return Ok(Array2::<u8>::zeros((height, width)));
    }

    let mut flat = vec![0u8; height * width];
    flat.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let v = (plane[[y, x]] as f64 - min as f64) / range * 255.0;
                *out = v.clamp(0.0, 255.0) as u8;
            }
        });

    Array2::from_shape_vec((height, width), flat)
        .map_err(|e| ToneError::InvalidInput(e.to_string()))
}

/// Map 8-bit levels back to 0.0-1.0.
pub fn levels_to_unit(levels: ArrayView2<u8>) -> Array2<f32> {
    levels.mapv(|v| v as f32 / 255.0)
}
