//! Tone filter modules.
//!
//! ## Supported Formats
//!
//! | Format | Shape | Type | Description |
//! |--------|-------|------|-------------|
//! | Grayscale | (H, W) | f32 | Single intensity plane, 0.0-1.0 |
//! | Grayscale | (H, W, 1) | f32 | Single intensity channel, 0.0-1.0 |
//! | RGB | (H, W, 3) | f32 | Red, green, blue, 0.0-1.0 |
//! | RGBA | (H, W, 4) | f32 | RGB + alpha, 0.0-1.0 |
//!
//! ## Architecture
//!
//! - **Luminance only** - Color images are moved to YIQ, only Y is processed
//! - **8-bit working levels** - Luminance is min-max scaled to 0-255 for
//!   histogram work and scaled back to 0.0-1.0 on output
//! - **Alpha preservation** - Alpha channel (if present) is copied through
//! - **Thread-safe** - Pixel-wise passes use rayon; iterations stay sequential
//!
//! ## Filter Categories
//!
//! - **Color space**: rgb_to_yiq, yiq_to_rgb
//! - **Tonal**: equalize_histogram, quantize_image
//! - **Conversion**: normalize_data, u8_to_f32, f32_to_u8

pub mod colorspace;
pub mod convert;
pub mod core;
pub mod equalize;
pub mod histogram;
pub mod quantize;
