//! Contour smoothing
//!
//! Removes single-frame outliers (octave jumps, voicing glitches) from a
//! quantized contour with a sliding median filter.
//!
//! The filter runs independently over each maximal run of present frames;
//! absent runs are copied through untouched, so the output has exactly the
//! input's length and absent pattern. Smoothing never fills a gap.
//!
//! ## Edge policy
//!
//! The window shrinks symmetrically near the ends of a run: for frame `i` in
//! run `[s, e)` the radius is `min(width / 2, i - s, e - 1 - i)`. The window
//! is therefore always odd and centred, the median is always one of the input
//! values, and the first and last frame of every run are left as they are.

use rayon::prelude::*;

use crate::contour::FrequencyContour;
use crate::{PitchError, PitchResult};

/// Default median window width (frames)
pub const DEFAULT_SMOOTHING_WINDOW: usize = 11;

/// Gap-preserving median smoother
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourSmoother {
    /// Window width (odd, >= 1)
    window: usize,
}

impl Default for ContourSmoother {
    fn default() -> Self {
        Self {
            window: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

impl ContourSmoother {
    /// Create smoother; fails for even or zero widths
    pub fn new(window: usize) -> PitchResult<Self> {
        if window == 0 || window % 2 == 0 {
            return Err(PitchError::InvalidWindow(window));
        }
        Ok(Self { window })
    }

    /// Window width
    pub fn window(&self) -> usize {
        self.window
    }

    /// Smooth a contour
    pub fn smooth(&self, contour: &FrequencyContour) -> FrequencyContour {
        let mut frames = contour.frames().to_vec();
        let runs = contour.present_runs();

        for run in &runs {
            let values: Vec<f64> = contour.frames()[run.clone()]
                .iter()
                .flatten()
                .copied()
                .collect();
            let filtered = median_filter(&values, self.window);

            for (slot, value) in frames[run.clone()].iter_mut().zip(filtered) {
                *slot = Some(value);
            }
        }

        log::debug!(
            "Smoothed {} frames in {} voiced runs (window {})",
            frames.len(),
            runs.len(),
            self.window
        );

        FrequencyContour::new(frames)
    }
}

/// Smooth `contour` with a median window of `window_width` frames
pub fn smooth(contour: &FrequencyContour, window_width: usize) -> PitchResult<FrequencyContour> {
    Ok(ContourSmoother::new(window_width)?.smooth(contour))
}

/// Runs shorter than this are filtered on the calling thread
const PARALLEL_MIN_RUN: usize = 256;

/// Median filter over a gap-free run with the symmetric shrinking edge policy.
///
/// Each output index reads a read-only neighbourhood of `values`; long runs
/// are split across threads, each reusing one scratch buffer.
pub fn median_filter(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;

    if values.len() < PARALLEL_MIN_RUN {
        let mut scratch = Vec::with_capacity(window);
        return (0..values.len())
            .map(|i| windowed_median(values, half, i, &mut scratch))
            .collect();
    }

    (0..values.len())
        .into_par_iter()
        .map_init(
            || Vec::with_capacity(window),
            |scratch, i| windowed_median(values, half, i, scratch),
        )
        .collect()
}

/// Median of the window around `i`, shrunk to stay inside `values`
fn windowed_median(values: &[f64], half: usize, i: usize, scratch: &mut Vec<f64>) -> f64 {
    let radius = half.min(i).min(values.len() - 1 - i);
    if radius == 0 {
        return values[i];
    }

    scratch.clear();
    scratch.extend_from_slice(&values[i - radius..=i + radius]);
    let (_, median, _) = scratch.select_nth_unstable_by(radius, f64::total_cmp);
    *median
}
