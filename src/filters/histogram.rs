//! 256-bin intensity histograms, cumulative distributions and lookup tables.
//!
//! All three types work on 8-bit intensity levels (0-255), the working
//! representation of the equalization and quantization filters.

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::error::{ToneError, ToneResult};

/// Number of intensity levels in the working representation.
pub const LEVELS: usize = 256;

/// Pixel counts per intensity level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: [u64; LEVELS],
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            counts: [0; LEVELS],
        }
    }
}

impl Histogram {
    /// Count every pixel of an 8-bit level image.
    pub fn from_levels(levels: ArrayView2<u8>) -> Self {
        let mut hist = Self::default();
        for &v in levels.iter() {
            hist.counts[v as usize] += 1;
        }
        hist
    }

    pub fn counts(&self) -> &[u64; LEVELS] {
        &self.counts
    }

    #[inline]
    pub fn get(&self, level: u8) -> u64 {
        self.counts[level as usize]
    }

    /// Total pixel count.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Running sum over the levels.
    pub fn cumulative(&self) -> CumulativeDistribution {
        let mut sums = [0u64; LEVELS];
        let mut acc = 0u64;
        for (sum, &count) in sums.iter_mut().zip(self.counts.iter()) {
            acc += count;
            *sum = acc;
        }
        CumulativeDistribution { sums }
    }

    /// Count-weighted mean level over `lo..=hi`.
    ///
    /// Returns `None` when the range holds no pixels (or `lo > hi`).
    pub fn weighted_mean(&self, lo: u8, hi: u8) -> Option<f64> {
        if lo > hi {
            return None;
        }
        let mut mass = 0u64;
        let mut moment = 0u64;
        for level in lo as usize..=hi as usize {
            let count = self.counts[level];
            mass += count;
            moment += level as u64 * count;
        }
        if mass == 0 {
            None
        } else {
            Some(moment as f64 / mass as f64)
        }
    }
}

/// Cumulative distribution of a [`Histogram`].
///
/// Non-decreasing; the last entry equals the histogram total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulativeDistribution {
    sums: [u64; LEVELS],
}

impl CumulativeDistribution {
    #[inline]
    pub fn at(&self, level: u8) -> u64 {
        self.sums[level as usize]
    }

    pub fn total(&self) -> u64 {
        self.sums[LEVELS - 1]
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.sums
    }
}

/// Level-to-level remapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    table: [u8; LEVELS],
}

impl LookupTable {
    pub fn from_table(table: [u8; LEVELS]) -> Self {
        Self { table }
    }

    /// Equalizing table: `lut[i] = ceil(C[i] / C[255] * 255)`.
    ///
    /// Fails with [`ToneError::EmptyImage`] when the distribution is empty.
    pub fn equalizing(cdf: &CumulativeDistribution) -> ToneResult<Self> {
        let total = cdf.total();
        if total == 0 {
            return Err(ToneError::EmptyImage);
        }

        let mut table = [0u8; LEVELS];
        for (level, entry) in (0..=u8::MAX).zip(table.iter_mut()) {
            let fraction = cdf.at(level) as f64 / total as f64;
            *entry = (fraction * 255.0).ceil().clamp(0.0, 255.0) as u8;
        }
        Ok(Self { table })
    }

    #[inline]
    pub fn get(&self, level: u8) -> u8 {
        self.table[level as usize]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.table
    }

    pub fn is_monotonic(&self) -> bool {
        self.table.windows(2).all(|w| w[0] <= w[1])
    }

    /// Remap every pixel of a level image.
    pub fn apply(&self, levels: ArrayView2<u8>) -> Array2<u8> {
        let (height, width) = levels.dim();
        if height == 0 || width == 0 {
            return Array2::<u8>::zeros((height, width));
        }

        let mut flat = vec![0u8; height * width];
        flat.par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    *out = self.table[levels[[y, x]] as usize];
                }
            });

        Array2::from_shape_vec((height, width), flat)
            .expect("Shape mismatch in LookupTable::apply")
    }
}
