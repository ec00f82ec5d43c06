//! Iterative intensity quantization.
//!
//! Reduces the luminance of an image to a fixed number of levels by
//! alternating between two steps for a fixed number of iterations:
//! 1. every segment of the intensity range is represented by the
//!    count-weighted mean of the original histogram inside it;
//! 2. segment boundaries move to the midpoints between neighbouring
//!    representatives.
//!
//! The histogram is taken once from the original image. Every iteration is
//! recorded, so callers get the full history of images and errors.
//!
//! ## Supported Formats
//!
//! - **Grayscale**: (height, width) or (height, width, 1)
//! - **RGB**: (height, width, 3) - luminance (YIQ Y) quantized, chrominance kept
//! - **RGBA**: (height, width, 4) - as RGB, alpha preserved

use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD};

use crate::error::{ToneError, ToneResult};
use crate::filters::core::{levels_to_unit, scale_to_levels, LumaSplit};
use crate::filters::histogram::{CumulativeDistribution, Histogram, LookupTable, LEVELS};

/// What to do with a segment that holds no pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptySegmentPolicy {
    /// Represent the segment by the rounded midpoint of its bounds
    #[default]
    Midpoint,
    /// Abort with [`ToneError::DegenerateSegment`]
    Fail,
}

/// Quantization parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizeOptions {
    /// Number of output intensity levels (>= 1)
    pub levels: usize,
    /// Number of refinement iterations
    pub iterations: usize,
    /// Handling of segments that hold no pixels
    pub empty_segment: EmptySegmentPolicy,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            levels: 4,
            iterations: 10,
            empty_segment: EmptySegmentPolicy::Midpoint,
        }
    }
}

impl QuantizeOptions {
    pub fn new(levels: usize, iterations: usize) -> ToneResult<Self> {
        let options = Self {
            levels,
            iterations,
            ..Self::default()
        };
        options.validate()?;
        Ok(options)
    }

    /// Build options from signed counts, rejecting `n_quant < 1` and
    /// `n_iter < 0`.
    pub fn from_signed(n_quant: i64, n_iter: i64) -> ToneResult<Self> {
        if n_quant < 1 {
            return Err(ToneError::InvalidInput(format!(
                "n_quant must be >= 1, got {}",
                n_quant
            )));
        }
        if n_iter < 0 {
            return Err(ToneError::InvalidInput(format!(
                "n_iter must be >= 0, got {}",
                n_iter
            )));
        }
        let levels = usize::try_from(n_quant)
            .map_err(|_| ToneError::InvalidInput(format!("n_quant out of range: {}", n_quant)))?;
        let iterations = usize::try_from(n_iter)
            .map_err(|_| ToneError::InvalidInput(format!("n_iter out of range: {}", n_iter)))?;
        Self::new(levels, iterations)
    }

    pub fn with_empty_segment(mut self, policy: EmptySegmentPolicy) -> Self {
        self.empty_segment = policy;
        self
    }

    pub fn validate(&self) -> ToneResult<()> {
        if self.levels == 0 {
            return Err(ToneError::InvalidInput("levels must be >= 1".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Partition
// ============================================================================

/// Upper limit on the number of segments a partition holds: one per
/// intensity level.
pub const MAX_SEGMENTS: usize = LEVELS;

/// Segment boundaries `b[0] = 0 <= b[1] <= ... <= b[n] = 255`.
///
/// Segment 0 covers levels `0..=b[1]`, segment `j > 0` covers
/// `b[j]+1..=b[j+1]`: a level belongs to the highest segment whose lower
/// boundary it strictly exceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    bounds: Vec<u8>,
}

impl Partition {
    /// Mass-balanced starting partition: the k-th interior boundary is the
    /// first level at which the cumulative mass reaches `k / segments` of the
    /// total. Levels carrying several targets' worth of mass produce
    /// coinciding boundaries (collapsed segments).
    ///
    /// The recorded level is the one that completes the straddle
    /// `C[i] <= k/segments <= C[i+1]`, i.e. `i + 1`, not `i`.
    ///
    /// At most [`MAX_SEGMENTS`] segments are built; more than that can only
    /// ever be collapsed.
    pub fn initial(cdf: &CumulativeDistribution, segments: usize) -> Self {
        let segments = segments.clamp(1, MAX_SEGMENTS);
        let total = cdf.total() as u128;
        let n = segments as u128;

        let mut bounds = Vec::with_capacity(segments + 1);
        bounds.push(0u8);

        let mut level = 0usize;
        for k in 1..segments as u128 {
            // C[level] * n >= k * total  <=>  C[level] >= k/n of the mass
            while level < LEVELS - 1 && (cdf.at(level as u8) as u128) * n < k * total {
                level += 1;
            }
            bounds.push(level as u8);
        }

        bounds.push(255);
        Self { bounds }
    }

    /// Boundaries halfway between neighbouring representatives.
    pub fn from_representatives(representatives: &[u8]) -> Self {
        let mut bounds = Vec::with_capacity(representatives.len() + 1);
        bounds.push(0u8);
        for pair in representatives.windows(2) {
            let mid = ((pair[0] as f64 + pair[1] as f64) / 2.0).round();
            bounds.push(mid.clamp(0.0, 255.0) as u8);
        }
        bounds.push(255);
        Self { bounds }
    }

    pub fn bounds(&self) -> &[u8] {
        &self.bounds
    }

    pub fn segments(&self) -> usize {
        self.bounds.len() - 1
    }

    /// Inclusive level range of segment `j`, `None` when it is collapsed.
    pub fn segment_range(&self, j: usize) -> Option<(u8, u8)> {
        let hi = self.bounds[j + 1];
        let lo = if j == 0 {
            0
        } else {
            self.bounds[j].checked_add(1)?
        };
        (lo <= hi).then_some((lo, hi))
    }

    /// Segment of a level (binary search over the interior boundaries).
    pub fn segment_of(&self, level: u8) -> usize {
        let interior = &self.bounds[1..self.bounds.len() - 1];
        interior.partition_point(|&b| b < level)
    }

    /// Count-weighted mean level of every segment.
    pub fn representatives(
        &self,
        histogram: &Histogram,
        policy: EmptySegmentPolicy,
        iteration: usize,
    ) -> ToneResult<Vec<u8>> {
        (0..self.segments())
            .map(|j| {
                let mean = self
                    .segment_range(j)
                    .and_then(|(lo, hi)| histogram.weighted_mean(lo, hi));
                match (mean, policy) {
                    (Some(mean), _) => Ok(mean.round().clamp(0.0, 255.0) as u8),
                    (None, EmptySegmentPolicy::Midpoint) => {
                        let (lower, upper) = (self.bounds[j], self.bounds[j + 1]);
                        let mid = ((lower as f64 + upper as f64) / 2.0).round() as u8;
                        tracing::warn!(
                            segment = j,
                            lower,
                            upper,
                            iteration,
                            representative = mid,
                            "empty quantization segment, using midpoint"
                        );
                        Ok(mid)
                    }
                    (None, EmptySegmentPolicy::Fail) => Err(ToneError::DegenerateSegment {
                        segment: j,
                        lower: self.bounds[j],
                        upper: self.bounds[j + 1],
                        iteration,
                    }),
                }
            })
            .collect()
    }

    /// Table sending every level to its segment's representative.
    pub fn lookup_table(&self, representatives: &[u8]) -> LookupTable {
        let mut table = [0u8; LEVELS];
        for (level, entry) in table.iter_mut().enumerate() {
            *entry = representatives[self.segment_of(level as u8)];
        }
        LookupTable::from_table(table)
    }
}

// ============================================================================
// Level-domain quantizer
// ============================================================================

/// One iteration on 8-bit levels.
#[derive(Debug, Clone)]
pub struct LevelStep {
    pub levels: Array2<u8>,
    /// Mean absolute difference to the previous working image, in levels
    pub error: f64,
    /// Partition used during this iteration
    pub partition: Partition,
    pub representatives: Vec<u8>,
}

/// State of one quantization run.
///
/// Owns its histogram, partition and working image; nothing is shared
/// between runs.
#[derive(Debug)]
pub struct Quantizer {
    histogram: Histogram,
    partition: Partition,
    working: Array2<u8>,
    policy: EmptySegmentPolicy,
    iteration: usize,
}

impl Quantizer {
    pub fn new(levels: ArrayView2<u8>, options: &QuantizeOptions) -> ToneResult<Self> {
        options.validate()?;
        let (height, width) = levels.dim();
        if height == 0 || width == 0 {
            return Err(ToneError::EmptyImage);
        }

        let histogram = Histogram::from_levels(levels);
        if options.levels > MAX_SEGMENTS {
            tracing::debug!(
                requested = options.levels,
                segments = MAX_SEGMENTS,
                "segment count capped at intensity level count"
            );
        }
        let partition = Partition::initial(&histogram.cumulative(), options.levels);
        tracing::debug!(
            segments = partition.segments(),
            bounds = ?partition.bounds(),
            "initial partition"
        );

        Ok(Self {
            histogram,
            partition,
            working: levels.to_owned(),
            policy: options.empty_segment,
            iteration: 0,
        })
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Run one iteration and advance the state.
    pub fn step(&mut self) -> ToneResult<LevelStep> {
        let representatives =
            self.partition
                .representatives(&self.histogram, self.policy, self.iteration)?;

        let quantized = self
            .partition
            .lookup_table(&representatives)
            .apply(self.working.view());
        let error = mean_abs_diff(self.working.view(), quantized.view());

        tracing::debug!(
            iteration = self.iteration,
            error,
            bounds = ?self.partition.bounds(),
            representatives = ?representatives,
            "quantization step"
        );

        let used = std::mem::replace(
            &mut self.partition,
            Partition::from_representatives(&representatives),
        );
        self.working = quantized.clone();
        self.iteration += 1;

        Ok(LevelStep {
            levels: quantized,
            error,
            partition: used,
            representatives,
        })
    }
}

fn mean_abs_diff(a: ArrayView2<u8>, b: ArrayView2<u8>) -> f64 {
    let count = a.len();
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x as i64 - y as i64).unsigned_abs())
        .sum();
    sum as f64 / count as f64
}

/// Quantize an 8-bit level image, returning every iteration.
pub fn quantize_levels(
    levels: ArrayView2<u8>,
    options: &QuantizeOptions,
) -> ToneResult<Vec<LevelStep>> {
    let mut quantizer = Quantizer::new(levels, options)?;
    (0..options.iterations).map(|_| quantizer.step()).collect()
}

// ============================================================================
// Image-level API
// ============================================================================

/// One recorded iteration.
#[derive(Debug, Clone)]
pub struct QuantizeStep {
    /// Quantized image, same shape as the input, values 0.0-1.0
    pub image: ArrayD<f32>,
    /// Mean absolute error against the previous working image (0-255 scale)
    pub error: f64,
    pub boundaries: Vec<u8>,
    pub representatives: Vec<u8>,
}

/// Full history of a quantization run, one entry per iteration.
#[derive(Debug, Clone, Default)]
pub struct QuantizeTrace {
    steps: Vec<QuantizeStep>,
}

impl QuantizeTrace {
    pub fn steps(&self) -> &[QuantizeStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn errors(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.error).collect()
    }

    pub fn images(&self) -> impl Iterator<Item = &ArrayD<f32>> {
        self.steps.iter().map(|s| &s.image)
    }

    /// Split into `(images, errors)`.
    pub fn into_parts(self) -> (Vec<ArrayD<f32>>, Vec<f64>) {
        self.steps.into_iter().map(|s| (s.image, s.error)).unzip()
    }
}

/// Quantize the luminance of an image to `n_quant` levels over `n_iter`
/// iterations.
///
/// # Arguments
/// * `image` - Grayscale (H, W) / (H, W, 1), RGB (H, W, 3) or RGBA (H, W, 4), values 0.0-1.0
/// * `n_quant` - Number of intensity levels (>= 1)
/// * `n_iter` - Number of iterations (>= 0)
///
/// # Returns
/// One image and one error per iteration
pub fn quantize_image(image: ArrayViewD<f32>, n_quant: i64, n_iter: i64) -> ToneResult<QuantizeTrace> {
    let options = QuantizeOptions::from_signed(n_quant, n_iter)?;
    quantize_image_with(image, &options)
}

/// [`quantize_image`] with explicit options.
pub fn quantize_image_with(
    image: ArrayViewD<f32>,
    options: &QuantizeOptions,
) -> ToneResult<QuantizeTrace> {
    options.validate()?;
    let split = LumaSplit::new(image)?;
    let levels = scale_to_levels(split.luma())?;

    let steps = quantize_levels(levels.view(), options)?
        .into_iter()
        .map(|step| {
            let luma = levels_to_unit(step.levels.view());
            Ok(QuantizeStep {
                image: split.merge(luma.view())?,
                error: step.error,
                boundaries: step.partition.bounds().to_vec(),
                representatives: step.representatives,
            })
        })
        .collect::<ToneResult<Vec<_>>>()?;

    Ok(QuantizeTrace { steps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, IxDyn};

    fn two_cluster(low: u8, high: u8) -> Array2<u8> {
        let mut levels = Array2::<u8>::zeros((4, 6));
        for (i, v) in levels.iter_mut().enumerate() {
            *v = if i % 2 == 0 { low } else { high };
        }
        levels
    }

    fn gradient(height: usize, width: usize) -> Array2<f32> {
        Array2::from_shape_fn((height, width), |(y, x)| {
            ((y * width + x) as f32 / (height * width - 1) as f32).powf(1.7)
        })
    }

    #[test]
    fn test_options_validation() {
        assert!(QuantizeOptions::new(0, 3).unwrap_err().is_invalid_input());
        assert!(QuantizeOptions::from_signed(0, 3).unwrap_err().is_invalid_input());
        assert!(QuantizeOptions::from_signed(-2, 3).unwrap_err().is_invalid_input());
        assert!(QuantizeOptions::from_signed(3, -1).unwrap_err().is_invalid_input());

        let options = QuantizeOptions::from_signed(3, 0).unwrap();
        assert_eq!(options.levels, 3);
        assert_eq!(options.iterations, 0);
        assert_eq!(options.empty_segment, EmptySegmentPolicy::Midpoint);
    }

    #[test]
    fn test_quantize_image_rejects_bad_counts() {
        let img = gradient(3, 3).into_dyn();
        for (n_quant, n_iter) in [(0, 1), (-1, 1), (2, -1)] {
            let err = quantize_image(img.view(), n_quant, n_iter).unwrap_err();
            assert!(matches!(err, ToneError::InvalidInput(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_segment_of_strictly_greater() {
        let partition = Partition {
            bounds: vec![0, 10, 100, 255],
        };

        assert_eq!(partition.segment_of(0), 0);
        assert_eq!(partition.segment_of(10), 0);
        assert_eq!(partition.segment_of(11), 1);
        assert_eq!(partition.segment_of(100), 1);
        assert_eq!(partition.segment_of(101), 2);
        assert_eq!(partition.segment_of(255), 2);
    }

    #[test]
    fn test_segment_range() {
        let partition = Partition {
            bounds: vec![0, 0, 40, 255, 255],
        };

        assert_eq!(partition.segment_range(0), Some((0, 0)));
        assert_eq!(partition.segment_range(1), Some((1, 40)));
        assert_eq!(partition.segment_range(2), Some((41, 255)));
        assert_eq!(partition.segment_range(3), None);
    }

    #[test]
    fn test_initial_partition_two_clusters() {
        let levels = two_cluster(10, 200);
        let cdf = Histogram::from_levels(levels.view()).cumulative();

        let partition = Partition::initial(&cdf, 2);
        assert_eq!(partition.bounds(), &[0, 10, 255]);
    }

    #[test]
    fn test_initial_partition_single_segment() {
        let levels = two_cluster(10, 200);
        let cdf = Histogram::from_levels(levels.view()).cumulative();

        assert_eq!(Partition::initial(&cdf, 1).bounds(), &[0, 255]);
    }

    #[test]
    fn test_initial_partition_collapses_on_heavy_level() {
        let levels = two_cluster(0, 255);
        let cdf = Histogram::from_levels(levels.view()).cumulative();

        let partition = Partition::initial(&cdf, 4);
        assert_eq!(partition.bounds(), &[0, 0, 0, 255, 255]);
        assert_eq!(partition.segments(), 4);
    }

    #[test]
    fn test_initial_partition_caps_segment_count() {
        let levels = two_cluster(10, 200);
        let cdf = Histogram::from_levels(levels.view()).cumulative();

        let partition = Partition::initial(&cdf, usize::MAX);
        assert_eq!(partition.segments(), MAX_SEGMENTS);
        assert_eq!(partition.bounds()[0], 0);
        assert_eq!(partition.bounds()[MAX_SEGMENTS], 255);
    }

    #[test]
    fn test_huge_level_count_degrades_gracefully() {
        let img = gradient(4, 4).into_dyn();
        let trace = quantize_image(img.view(), i64::MAX, 1).unwrap();
        assert_eq!(trace.len(), 1);

        let step = &trace.steps()[0];
        assert_eq!(step.representatives.len(), MAX_SEGMENTS);
        assert_eq!(step.boundaries.len(), MAX_SEGMENTS + 1);
        assert!(step.boundaries.windows(2).all(|w| w[0] <= w[1]));
        assert!(step.error.is_finite());
        assert!(step.image.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_boundaries_from_representatives() {
        let partition = Partition::from_representatives(&[10, 200]);
        assert_eq!(partition.bounds(), &[0, 105, 255]);

        // (0 + 1) / 2 rounds half away from zero
        let partition = Partition::from_representatives(&[0, 1, 255]);
        assert_eq!(partition.bounds(), &[0, 1, 128, 255]);
    }

    #[test]
    fn test_two_clusters_exact_in_one_iteration() {
        let levels = two_cluster(10, 200);
        let options = QuantizeOptions::new(2, 1).unwrap();

        let steps = quantize_levels(levels.view(), &options).unwrap();
        assert_eq!(steps.len(), 1);

        let step = &steps[0];
        assert_eq!(step.partition.bounds(), &[0, 10, 255]);
        assert_eq!(step.representatives, vec![10, 200]);
        assert_eq!(step.error, 0.0);
        assert_eq!(step.levels, levels);
    }

    #[test]
    fn test_quantizer_moves_boundaries_to_midpoints() {
        let levels = two_cluster(10, 200);
        let options = QuantizeOptions::new(2, 3).unwrap();
        let mut quantizer = Quantizer::new(levels.view(), &options).unwrap();

        quantizer.step().unwrap();
        assert_eq!(quantizer.partition().bounds(), &[0, 105, 255]);

        let second = quantizer.step().unwrap();
        assert_eq!(second.representatives, vec![10, 200]);
        assert_eq!(second.error, 0.0);
    }

    #[test]
    fn test_single_level_is_global_mean() {
        let img = gradient(5, 7).into_dyn();
        let trace = quantize_image(img.view(), 1, 3).unwrap();
        assert_eq!(trace.len(), 3);

        let split = LumaSplit::new(img.view()).unwrap();
        let levels = scale_to_levels(split.luma()).unwrap();
        let mean = Histogram::from_levels(levels.view())
            .weighted_mean(0, 255)
            .unwrap()
            .round() as u8;

        for step in trace.steps() {
            assert_eq!(step.representatives, vec![mean]);
            let expected = mean as f32 / 255.0;
            assert!(step.image.iter().all(|&v| v == expected));
        }
    }

    #[test]
    fn test_error_sequence_length() {
        let img = gradient(6, 6).into_dyn();

        for n_iter in [0, 1, 4] {
            let trace = quantize_image(img.view(), 3, n_iter).unwrap();
            let (images, errors) = trace.into_parts();
            assert_eq!(images.len(), n_iter as usize);
            assert_eq!(errors.len(), n_iter as usize);
            assert!(errors.iter().all(|e| e.is_finite() && *e >= 0.0));
        }
    }

    #[test]
    fn test_boundaries_stay_sorted() {
        let img = gradient(8, 9).into_dyn();
        let trace = quantize_image(img.view(), 5, 6).unwrap();

        for step in trace.steps() {
            assert_eq!(step.boundaries.len(), 6);
            assert_eq!(step.boundaries[0], 0);
            assert_eq!(step.boundaries[5], 255);
            assert!(step.boundaries.windows(2).all(|w| w[0] <= w[1]));
            assert!(step.representatives.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_output_uses_at_most_n_levels() {
        let img = gradient(8, 8).into_dyn();
        let trace = quantize_image(img.view(), 4, 2).unwrap();

        for image in trace.images() {
            let mut seen: Vec<u8> = image.iter().map(|&v| (v * 255.0).round() as u8).collect();
            seen.sort_unstable();
            seen.dedup();
            assert!(seen.len() <= 4, "{:?}", seen);
        }
    }

    #[test]
    fn test_two_clusters_through_image_api() {
        let mut img = Array2::<f32>::zeros((2, 4));
        for (i, v) in img.iter_mut().enumerate() {
            *v = if i < 4 { 0.1 } else { 0.8 };
        }

        let trace = quantize_image(img.view().into_dyn(), 2, 1).unwrap();
        let step = &trace.steps()[0];

        // Min-max scaling sends the clusters to 0 and 255
        assert_eq!(step.representatives, vec![0, 255]);
        assert_eq!(step.error, 0.0);
        assert_eq!(step.image[[0, 0]], 0.0);
        assert_eq!(step.image[[1, 3]], 1.0);
    }

    #[test]
    fn test_more_levels_than_intensities_midpoint() {
        let levels = two_cluster(0, 255);
        let options = QuantizeOptions::new(4, 2).unwrap();

        let steps = quantize_levels(levels.view(), &options).unwrap();
        assert_eq!(steps[0].representatives, vec![0, 0, 255, 255]);
        for step in &steps {
            assert_eq!(step.error, 0.0);
            assert_eq!(step.levels, levels);
        }
    }

    #[test]
    fn test_more_levels_than_intensities_fail_policy() {
        let levels = two_cluster(0, 255);
        let options = QuantizeOptions::new(4, 2)
            .unwrap()
            .with_empty_segment(EmptySegmentPolicy::Fail);

        let err = quantize_levels(levels.view(), &options).unwrap_err();
        assert_eq!(
            err,
            ToneError::DegenerateSegment {
                segment: 1,
                lower: 0,
                upper: 0,
                iteration: 0,
            }
        );
    }

    #[test]
    fn test_empty_image() {
        let img = ArrayD::<f32>::zeros(IxDyn(&[3, 0]));
        assert_eq!(quantize_image(img.view(), 2, 1).unwrap_err(), ToneError::EmptyImage);

        let levels = Array2::<u8>::zeros((0, 0));
        let options = QuantizeOptions::default();
        assert_eq!(
            quantize_levels(levels.view(), &options).unwrap_err(),
            ToneError::EmptyImage
        );
    }

    #[test]
    fn test_color_image_shape_and_trace() {
        let mut img = Array3::<f32>::zeros((4, 5, 3));
        for ((y, x, c), v) in img.indexed_iter_mut() {
            *v = ((y * 5 + x) as f32 / 19.0 + c as f32 * 0.1).min(1.0);
        }

        let trace = quantize_image(img.view().into_dyn(), 3, 2).unwrap();
        assert_eq!(trace.len(), 2);
        for image in trace.images() {
            assert_eq!(image.shape(), &[4, 5, 3]);
        }
    }

    #[test]
    fn test_zero_iterations() {
        let img = gradient(3, 3).into_dyn();
        let trace = quantize_image(img.view(), 2, 0).unwrap();
        assert!(trace.is_empty());
        assert!(trace.errors().is_empty());
    }
}
