//! Tonestag Rust Extensions
//!
//! Histogram equalization and iterative intensity quantization for images
//! held in ndarray buffers, with Python bindings via PyO3 and WASM bindings
//! for JavaScript.
//!
//! ## Image Format
//! Filters accept images with these layouts:
//! - **Grayscale**: (height, width) or (height, width, 1)
//! - **RGB**: (height, width, 3)
//! - **RGBA**: (height, width, 4) - alpha passed through
//!
//! Values are `f32` in 0.0-1.0. Internally the luminance is worked on as
//! 8-bit levels (0-255).
//!
//! ## Algorithms
//! - [`equalize_histogram`] remaps luminance through its cumulative
//!   distribution.
//! - [`quantize_image`] reduces luminance to `n_quant` levels, refining the
//!   segment boundaries over `n_iter` iterations and returning every
//!   intermediate image with its error.
//!
//! Color images are processed on the YIQ luminance; chrominance is kept.

pub mod error;
pub mod filters;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{ToneError, ToneResult};
pub use filters::colorspace::{rgb_to_yiq_f32, yiq_to_rgb_f32};
pub use filters::convert::{f32_to_u8, normalize_data, u8_to_f32, Representation};
pub use filters::equalize::{equalize_histogram, Equalized};
pub use filters::histogram::{CumulativeDistribution, Histogram, LookupTable};
pub use filters::quantize::{
    quantize_image, quantize_image_with, EmptySegmentPolicy, QuantizeOptions, QuantizeStep,
    QuantizeTrace,
};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray1, PyArray3, PyArrayDyn, PyReadonlyArray3, PyReadonlyArrayDyn};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::error::ToneError;
    use crate::filters::colorspace;
    use crate::filters::convert;
    use crate::filters::equalize;
    use crate::filters::quantize::{self, EmptySegmentPolicy, QuantizeOptions};

    impl From<ToneError> for PyErr {
        fn from(err: ToneError) -> PyErr {
            PyValueError::new_err(err.to_string())
        }
    }

    // ========================================================================
    // Color Space
    // ========================================================================

    /// Convert an RGB f32 image (H, W, 3) to YIQ.
    #[pyfunction]
    pub fn rgb_to_yiq<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, f32>,
    ) -> PyResult<Bound<'py, PyArray3<f32>>> {
        let result = colorspace::rgb_to_yiq_f32(image.as_array())?;
        Ok(result.into_pyarray(py))
    }

    /// Convert a YIQ f32 image (H, W, 3) back to RGB.
    #[pyfunction]
    pub fn yiq_to_rgb<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, f32>,
    ) -> PyResult<Bound<'py, PyArray3<f32>>> {
        let result = colorspace::yiq_to_rgb_f32(image.as_array())?;
        Ok(result.into_pyarray(py))
    }

    // ========================================================================
    // Tonal Filters
    // ========================================================================

    /// Equalize the luminance histogram of an image.
    ///
    /// Returns (equalized image, original histogram, equalized histogram).
    /// Histograms are uint64 arrays of 256 bins.
    #[pyfunction]
    pub fn equalize_histogram<'py>(
        py: Python<'py>,
        image: PyReadonlyArrayDyn<'py, f32>,
    ) -> PyResult<(
        Bound<'py, PyArrayDyn<f32>>,
        Bound<'py, PyArray1<u64>>,
        Bound<'py, PyArray1<u64>>,
    )> {
        let (result, hist_org, hist_eq) =
            equalize::equalize_histogram(image.as_array())?.into_parts();
        Ok((
            result.into_pyarray(py),
            PyArray1::from_slice(py, hist_org.counts()),
            PyArray1::from_slice(py, hist_eq.counts()),
        ))
    }

    /// Quantize the luminance of an image into `n_quant` levels.
    ///
    /// Returns (list of images, list of errors), one entry per iteration.
    ///
    /// # Arguments
    /// * `image` - Grayscale (H, W), RGB (H, W, 3) or RGBA (H, W, 4), values 0.0-1.0
    /// * `n_quant` - Number of levels (>= 1)
    /// * `n_iter` - Number of iterations (>= 0)
    /// * `fail_on_empty_segment` - Raise instead of using the segment midpoint
    #[pyfunction]
    #[pyo3(signature = (image, n_quant, n_iter, fail_on_empty_segment=false))]
    pub fn quantize_image<'py>(
        py: Python<'py>,
        image: PyReadonlyArrayDyn<'py, f32>,
        n_quant: i64,
        n_iter: i64,
        fail_on_empty_segment: bool,
    ) -> PyResult<(Vec<Bound<'py, PyArrayDyn<f32>>>, Vec<f64>)> {
        let policy = if fail_on_empty_segment {
            EmptySegmentPolicy::Fail
        } else {
            EmptySegmentPolicy::Midpoint
        };
        let options = QuantizeOptions::from_signed(n_quant, n_iter)?.with_empty_segment(policy);

        let (images, errors) = quantize::quantize_image_with(image.as_array(), &options)?.into_parts();
        let images = images.into_iter().map(|img| img.into_pyarray(py)).collect();
        Ok((images, errors))
    }

    // ========================================================================
    // Conversion Utilities
    // ========================================================================

    /// Min-max normalize an array to 0.0-1.0.
    #[pyfunction]
    pub fn normalize_data<'py>(
        py: Python<'py>,
        data: PyReadonlyArrayDyn<'py, f32>,
    ) -> PyResult<Bound<'py, PyArrayDyn<f32>>> {
        let result = convert::normalize_data(data.as_array())?;
        Ok(result.into_pyarray(py))
    }

    /// Convert a u8 image (0-255) to f32 (0.0-1.0).
    #[pyfunction]
    pub fn convert_u8_to_f32<'py>(
        py: Python<'py>,
        image: PyReadonlyArrayDyn<'py, u8>,
    ) -> Bound<'py, PyArrayDyn<f32>> {
        convert::u8_to_f32(image.as_array()).into_pyarray(py)
    }

    /// Convert an f32 image (0.0-1.0) to u8 (0-255), rounding to nearest.
    #[pyfunction]
    pub fn convert_f32_to_u8<'py>(
        py: Python<'py>,
        image: PyReadonlyArrayDyn<'py, f32>,
    ) -> Bound<'py, PyArrayDyn<u8>> {
        convert::f32_to_u8(image.as_array()).into_pyarray(py)
    }

    /// Tonestag Rust extension module
    #[pymodule]
    pub fn tonestag(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Color space
        m.add_function(wrap_pyfunction!(rgb_to_yiq, m)?)?;
        m.add_function(wrap_pyfunction!(yiq_to_rgb, m)?)?;

        // Tonal filters
        m.add_function(wrap_pyfunction!(equalize_histogram, m)?)?;
        m.add_function(wrap_pyfunction!(quantize_image, m)?)?;

        // Conversion utilities
        m.add_function(wrap_pyfunction!(normalize_data, m)?)?;
        m.add_function(wrap_pyfunction!(convert_u8_to_f32, m)?)?;
        m.add_function(wrap_pyfunction!(convert_f32_to_u8, m)?)?;

        // Representation flags
        m.add("LOAD_GRAY_SCALE", convert::Representation::Grayscale as u8)?;
        m.add("LOAD_RGB", convert::Representation::Rgb as u8)?;

        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::tonestag;
