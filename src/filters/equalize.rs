//! Histogram equalization.
//!
//! Remaps intensities through the image's own cumulative distribution so the
//! output levels are spread as evenly as a discrete histogram allows.
//!
//! ## Supported Formats
//!
//! - **Grayscale**: (height, width) or (height, width, 1)
//! - **RGB**: (height, width, 3) - luminance (YIQ Y) equalized, chrominance kept
//! - **RGBA**: (height, width, 4) - as RGB, alpha preserved
//!
//! Input and output values are 0.0-1.0. Histograms describe the 8-bit
//! luminance working levels.

use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD};

use crate::error::ToneResult;
use crate::filters::core::{levels_to_unit, scale_to_levels, LumaSplit};
use crate::filters::histogram::{Histogram, LookupTable};

/// Equalization of an 8-bit level image.
#[derive(Debug, Clone)]
pub struct LevelEqualization {
    pub levels: Array2<u8>,
    pub original_histogram: Histogram,
    pub equalized_histogram: Histogram,
    pub lut: LookupTable,
}

/// Result of [`equalize_histogram`].
#[derive(Debug, Clone)]
pub struct Equalized {
    /// Equalized image, same shape as the input, values 0.0-1.0
    pub image: ArrayD<f32>,
    /// Luminance histogram before equalization
    pub original_histogram: Histogram,
    /// Luminance histogram after equalization
    pub equalized_histogram: Histogram,
    /// Table that was applied to the luminance levels
    pub lut: LookupTable,
}

impl Equalized {
    pub fn into_parts(self) -> (ArrayD<f32>, Histogram, Histogram) {
        (self.image, self.original_histogram, self.equalized_histogram)
    }
}

/// Equalize an 8-bit level image.
///
/// Fails with [`crate::ToneError::EmptyImage`] for an image without pixels.
pub fn equalize_levels(levels: ArrayView2<u8>) -> ToneResult<LevelEqualization> {
    let original_histogram = Histogram::from_levels(levels);
    let lut = LookupTable::equalizing(&original_histogram.cumulative())?;

    let equalized = lut.apply(levels);
    let equalized_histogram = Histogram::from_levels(equalized.view());

    Ok(LevelEqualization {
        levels: equalized,
        original_histogram,
        equalized_histogram,
        lut,
    })
}

/// Equalize the histogram of an image.
///
/// The luminance is min-max scaled to 0-255, remapped through
/// `lut[i] = ceil(C[i] / C[255] * 255)` and scaled back to 0.0-1.0.
/// Color images are reconstructed from the new luminance and their original
/// chrominance.
///
/// # Arguments
/// * `image` - Grayscale (H, W) / (H, W, 1), RGB (H, W, 3) or RGBA (H, W, 4), values 0.0-1.0
///
/// # Returns
/// Equalized image plus the original and equalized luminance histograms
pub fn equalize_histogram(image: ArrayViewD<f32>) -> ToneResult<Equalized> {
    let split = LumaSplit::new(image)?;
    let levels = scale_to_levels(split.luma())?;

    let result = equalize_levels(levels.view())?;
    tracing::trace!(
        layout = ?split.layout(),
        pixels = result.original_histogram.total(),
        "histogram equalized"
    );

    let luma = levels_to_unit(result.levels.view());
    let image = split.merge(luma.view())?;

    Ok(Equalized {
        image,
        original_histogram: result.original_histogram,
        equalized_histogram: result.equalized_histogram,
        lut: result.lut,
    })
}
