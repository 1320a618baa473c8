//! Autotune pipeline
//!
//! Linear, single pass, no retries:
//!
//! ```text
//! samples ─► [estimator] ─► contour ─► [quantizer] ─► [smoother] ─► target ─► [resynthesizer] ─► samples
//! ```
//!
//! Estimation and resynthesis are collaborators behind the
//! [`PitchEstimator`] and [`Resynthesizer`] traits; the pipeline only checks
//! their contracts (frame count in, sample count out). The first failure
//! aborts the run.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::AutotuneConfig;
use crate::contour::FrequencyContour;
use crate::quantize::{CorrectionMode, PitchQuantizer};
use crate::smoothing::ContourSmoother;
use crate::{PitchError, PitchResult, hz_to_cents, midi_to_hz};

// ═══════════════════════════════════════════════════════════════════════════════
// ANALYSIS PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Framing and f0 search range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Analysis frame length (samples)
    pub frame_length: usize,
    /// Hop between frame centres (samples)
    pub hop_length: usize,
    /// Lowest detectable f0 (Hz)
    pub f_min: f64,
    /// Highest detectable f0 (Hz)
    pub f_max: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        let frame_length = 2048;
        Self {
            frame_length,
            hop_length: frame_length / 4,
            // C2 .. C7
            f_min: midi_to_hz(36.0),
            f_max: midi_to_hz(96.0),
        }
    }
}

impl AnalysisParams {
    /// Number of centred frames for a signal of `num_samples`
    pub fn frame_count(&self, num_samples: usize) -> usize {
        if num_samples == 0 {
            0
        } else {
            1 + num_samples / self.hop_length
        }
    }

    /// Time of frame centre (seconds)
    pub fn frame_time(&self, frame: usize, sample_rate: u32) -> f64 {
        (frame * self.hop_length) as f64 / sample_rate as f64
    }

    /// Validate framing and search range
    pub fn validate(&self) -> PitchResult<()> {
        if self.frame_length < 4 {
            return Err(PitchError::InvalidConfig(format!(
                "frame_length must be at least 4, got {}",
                self.frame_length
            )));
        }
        if self.hop_length == 0 {
            return Err(PitchError::InvalidConfig("hop_length must be positive".into()));
        }
        if !(self.f_min.is_finite() && self.f_min > 0.0 && self.f_max.is_finite()) {
            return Err(PitchError::InvalidConfig(format!(
                "invalid frequency range: {} - {} Hz",
                self.f_min, self.f_max
            )));
        }
        if self.f_max <= self.f_min {
            return Err(PitchError::InvalidConfig(format!(
                "invalid frequency range: {} - {} Hz",
                self.f_min, self.f_max
            )));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLABORATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Whole-buffer f0 estimator.
///
/// Must return one frame per hop ([`AnalysisParams::frame_count`]), Hz for
/// voiced frames and `None` for unvoiced or unreliable ones.
pub trait PitchEstimator {
    fn estimate(
        &self,
        samples: &[f64],
        sample_rate: u32,
        params: &AnalysisParams,
    ) -> PitchResult<FrequencyContour>;
}

/// Whole-buffer pitch resynthesizer.
///
/// Must return exactly `samples.len()` samples. An absent target frame
/// means "leave the pitch of that region unmodified".
pub trait Resynthesizer {
    fn resynthesize(
        &self,
        samples: &[f64],
        sample_rate: u32,
        target: &FrequencyContour,
        params: &AnalysisParams,
    ) -> PitchResult<Vec<f64>>;
}

impl<T: PitchEstimator + ?Sized> PitchEstimator for &T {
    fn estimate(
        &self,
        samples: &[f64],
        sample_rate: u32,
        params: &AnalysisParams,
    ) -> PitchResult<FrequencyContour> {
        (**self).estimate(samples, sample_rate, params)
    }
}

impl<T: Resynthesizer + ?Sized> Resynthesizer for &T {
    fn resynthesize(
        &self,
        samples: &[f64],
        sample_rate: u32,
        target: &FrequencyContour,
        params: &AnalysisParams,
    ) -> PitchResult<Vec<f64>> {
        (**self).resynthesize(samples, sample_rate, target, params)
    }
}

impl<T: PitchEstimator + ?Sized> PitchEstimator for Box<T> {
    fn estimate(
        &self,
        samples: &[f64],
        sample_rate: u32,
        params: &AnalysisParams,
    ) -> PitchResult<FrequencyContour> {
        (**self).estimate(samples, sample_rate, params)
    }
}

impl<T: Resynthesizer + ?Sized> Resynthesizer for Box<T> {
    fn resynthesize(
        &self,
        samples: &[f64],
        sample_rate: u32,
        target: &FrequencyContour,
        params: &AnalysisParams,
    ) -> PitchResult<Vec<f64>> {
        (**self).resynthesize(samples, sample_rate, target, params)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Pipeline stage, for logs and error context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Estimation,
    Quantization,
    Smoothing,
    Resynthesis,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Estimation => "estimation",
            PipelineStage::Quantization => "quantization",
            PipelineStage::Smoothing => "smoothing",
            PipelineStage::Resynthesis => "resynthesis",
        };
        f.write_str(name)
    }
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct AutotuneOutput {
    /// Corrected audio (same length as input)
    pub audio: Vec<f64>,
    /// Estimated contour
    pub original: FrequencyContour,
    /// Quantized and smoothed target contour
    pub corrected: FrequencyContour,
}

impl AutotuneOutput {
    /// Mean absolute pitch change over frames present in both contours (cents)
    pub fn mean_correction_cents(&self) -> Option<f64> {
        let (sum, count) = self
            .original
            .iter()
            .zip(self.corrected.iter())
            .filter_map(|pair| match pair {
                (Some(from), Some(to)) => Some(hz_to_cents(from, to).abs()),
                _ => None,
            })
            .fold((0.0, 0usize), |(sum, count), cents| (sum + cents, count + 1));

        (count > 0).then(|| sum / count as f64)
    }
}

/// Estimation → quantization → smoothing → resynthesis
pub struct AutotunePipeline<E, R> {
    config: AutotuneConfig,
    quantizer: PitchQuantizer,
    smoother: ContourSmoother,
    estimator: E,
    resynthesizer: R,
}

impl<E: PitchEstimator, R: Resynthesizer> AutotunePipeline<E, R> {
    /// Create pipeline; the configuration is validated here
    pub fn new(
        config: AutotuneConfig,
        mode: CorrectionMode,
        estimator: E,
        resynthesizer: R,
    ) -> PitchResult<Self> {
        config.validate()?;
        let smoother = ContourSmoother::new(config.smoothing_window)?;

        Ok(Self {
            config,
            quantizer: PitchQuantizer::new(mode),
            smoother,
            estimator,
            resynthesizer,
        })
    }

    /// Get configuration
    pub fn config(&self) -> &AutotuneConfig {
        &self.config
    }

    /// Get correction mode
    pub fn mode(&self) -> &CorrectionMode {
        self.quantizer.mode()
    }

    /// Quantize and smooth an estimated contour
    pub fn correct_contour(&self, contour: &FrequencyContour) -> PitchResult<FrequencyContour> {
        log::debug!("Stage {}: {} frames", PipelineStage::Quantization, contour.len());
        let quantized = self.quantizer.quantize(contour)?;

        log::debug!("Stage {}: {} frames", PipelineStage::Smoothing, quantized.len());
        Ok(self.smoother.smooth(&quantized))
    }

    /// Run the full pipeline over a mono signal
    pub fn run(&self, samples: &[f64], sample_rate: u32) -> PitchResult<AutotuneOutput> {
        if sample_rate == 0 {
            return Err(PitchError::InvalidConfig("sample rate must be positive".into()));
        }
        let start = Instant::now();
        let params = &self.config.analysis;

        log::debug!(
            "Stage {}: {} samples @ {} Hz",
            PipelineStage::Estimation,
            samples.len(),
            sample_rate
        );
        let original = self
            .estimator
            .estimate(samples, sample_rate, params)
            .map_err(into_estimation_failure)?;

        let expected_frames = params.frame_count(samples.len());
        if original.len() != expected_frames {
            return Err(PitchError::UpstreamEstimationFailure(format!(
                "estimator returned {} frames, expected {}",
                original.len(),
                expected_frames
            )));
        }

        let corrected = self.correct_contour(&original)?;

        log::debug!(
            "Stage {}: {} target frames",
            PipelineStage::Resynthesis,
            corrected.len()
        );
        let audio = self
            .resynthesizer
            .resynthesize(samples, sample_rate, &corrected, params)
            .map_err(into_resynthesis_failure)?;

        if audio.len() != samples.len() {
            return Err(PitchError::UpstreamResynthesisFailure(format!(
                "resynthesizer returned {} samples, expected {}",
                audio.len(),
                samples.len()
            )));
        }

        let output = AutotuneOutput {
            audio,
            original,
            corrected,
        };

        log::info!(
            "Corrected {} frames ({} voiced, mean shift {:.1} cents) with {} in {:.2?}",
            output.corrected.len(),
            output.corrected.voiced_count(),
            output.mean_correction_cents().unwrap_or(0.0),
            self.quantizer.mode().name(),
            start.elapsed()
        );

        Ok(output)
    }
}

fn into_estimation_failure(err: PitchError) -> PitchError {
    match err {
        PitchError::UpstreamEstimationFailure(_) => err,
        other => PitchError::UpstreamEstimationFailure(other.to_string()),
    }
}

fn into_resynthesis_failure(err: PitchError) -> PitchError {
    match err {
        PitchError::UpstreamResynthesisFailure(_) => err,
        other => PitchError::UpstreamResynthesisFailure(other.to_string()),
    }
}
