//! Pitch detection
//!
//! YIN f0 estimator used as the default [`PitchEstimator`]:
//! - Centred, zero-padded frames (frame `t` centred on sample `t * hop`)
//! - Difference function from an FFT cross-correlation
//! - Cumulative mean normalized difference + absolute threshold
//! - Parabolic interpolation for sub-sample lag accuracy
//!
//! Silent frames and frames with no dip below the threshold are unvoiced.

use std::sync::Arc;

use rayon::prelude::*;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use crate::config::AutotuneConfig;
use crate::contour::FrequencyContour;
use crate::pipeline::{AnalysisParams, PitchEstimator};
use crate::{PitchError, PitchResult};

/// YIN pitch estimator
#[derive(Debug, Clone, Copy)]
pub struct YinEstimator {
    /// YIN absolute threshold
    threshold: f64,
    /// RMS below which a frame is silent (linear)
    silence_rms: f64,
}

impl Default for YinEstimator {
    fn default() -> Self {
        Self::new(&AutotuneConfig::default())
    }
}

impl YinEstimator {
    /// Create estimator from configuration
    pub fn new(config: &AutotuneConfig) -> Self {
        Self {
            threshold: config.yin_threshold,
            silence_rms: 10f64.powf(config.silence_threshold_db / 20.0),
        }
    }

    /// Set YIN threshold (0.01 - 0.5)
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold.clamp(0.01, 0.5);
    }

    /// Get YIN threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl PitchEstimator for YinEstimator {
    fn estimate(
        &self,
        samples: &[f64],
        sample_rate: u32,
        params: &AnalysisParams,
    ) -> PitchResult<FrequencyContour> {
        params.validate()?;
        if sample_rate == 0 {
            return Err(PitchError::UpstreamEstimationFailure(
                "sample rate must be positive".into(),
            ));
        }

        let num_frames = params.frame_count(samples.len());
        if num_frames == 0 {
            return Ok(FrequencyContour::empty());
        }

        let frame_length = params.frame_length;
        let half = frame_length / 2;
        let sr = sample_rate as f64;
        let min_tau = ((sr / params.f_max).floor() as usize).max(2);
        let max_tau = ((sr / params.f_min).ceil() as usize).min(half - 2);
        if min_tau + 2 >= max_tau {
            return Err(PitchError::UpstreamEstimationFailure(format!(
                "frame length {} cannot resolve {:.1} - {:.1} Hz at {} Hz",
                frame_length, params.f_min, params.f_max, sample_rate
            )));
        }

        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(frame_length);
        let inverse = planner.plan_fft_inverse(frame_length);

        // NaN marks unvoiced frames
        let f0 = (0..num_frames)
            .into_par_iter()
            .map_init(
                || YinFrame::new(forward.clone(), inverse.clone()),
                |frame, t| {
                    frame.load(samples, t * params.hop_length);
                    frame.detect(sr, min_tau, max_tau, self.threshold, self.silence_rms)
                },
            )
            .collect::<PitchResult<Vec<f64>>>()?;

        let contour =
            FrequencyContour::from_hz(&f0).map_present(|hz| hz.clamp(params.f_min, params.f_max));

        log::debug!(
            "YIN: {} frames, {} voiced (threshold {})",
            contour.len(),
            contour.voiced_count(),
            self.threshold
        );

        Ok(contour)
    }
}

/// Per-thread working buffers for one analysis frame
struct YinFrame {
    forward: Arc<dyn RealToComplex<f64>>,
    inverse: Arc<dyn ComplexToReal<f64>>,
    /// Current frame
    frame: Vec<f64>,
    /// FFT input
    fft_input: Vec<f64>,
    /// Spectrum of the first half (zero padded)
    head_spectrum: Vec<Complex<f64>>,
    /// Spectrum of the whole frame
    frame_spectrum: Vec<Complex<f64>>,
    /// Cross-correlation
    acf: Vec<f64>,
    /// Prefix sums of squared samples
    energy: Vec<f64>,
    /// Cumulative mean normalized difference
    cmnd: Vec<f64>,
}

impl YinFrame {
    fn new(forward: Arc<dyn RealToComplex<f64>>, inverse: Arc<dyn ComplexToReal<f64>>) -> Self {
        let n = forward.len();
        Self {
            frame: vec![0.0; n],
            fft_input: forward.make_input_vec(),
            head_spectrum: forward.make_output_vec(),
            frame_spectrum: forward.make_output_vec(),
            acf: inverse.make_output_vec(),
            energy: vec![0.0; n + 1],
            cmnd: vec![0.0; n / 2],
            forward,
            inverse,
        }
    }

    /// Copy the frame centred on `center`, zero padding outside the signal
    fn load(&mut self, samples: &[f64], center: usize) {
        let n = self.frame.len();
        let start = center as isize - (n / 2) as isize;
        for (i, slot) in self.frame.iter_mut().enumerate() {
            let idx = start + i as isize;
            *slot = if idx >= 0 && (idx as usize) < samples.len() {
                samples[idx as usize]
            } else {
                0.0
            };
        }
    }

    fn detect(
        &mut self,
        sample_rate: f64,
        min_tau: usize,
        max_tau: usize,
        threshold: f64,
        silence_rms: f64,
    ) -> PitchResult<f64> {
        let n = self.frame.len();
        let half = n / 2;

        self.energy[0] = 0.0;
        for (i, &x) in self.frame.iter().enumerate() {
            self.energy[i + 1] = self.energy[i] + x * x;
        }
        let rms = (self.energy[n] / n as f64).sqrt();
        if rms < silence_rms {
            return Ok(f64::NAN);
        }

        self.cross_correlate()?;
        self.normalized_difference(half);

        let Some(tau) = self.first_dip(min_tau, max_tau, threshold) else {
            return Ok(f64::NAN);
        };

        let tau_refined = self.parabolic_interpolation(tau);
        Ok(sample_rate / tau_refined)
    }

    /// acf[tau] = sum_{j < n/2} x[j] * x[j + tau]
    fn cross_correlate(&mut self) -> PitchResult<()> {
        let n = self.frame.len();
        let half = n / 2;

        self.fft_input[..half].copy_from_slice(&self.frame[..half]);
        self.fft_input[half..].fill(0.0);
        self.forward
            .process(&mut self.fft_input, &mut self.head_spectrum)
            .map_err(fft_error)?;

        self.fft_input.copy_from_slice(&self.frame);
        self.forward
            .process(&mut self.fft_input, &mut self.frame_spectrum)
            .map_err(fft_error)?;

        for (head, full) in self.head_spectrum.iter_mut().zip(&self.frame_spectrum) {
            *head = head.conj() * full;
        }
        // DC (and Nyquist for even lengths) must be purely real for the inverse
        self.head_spectrum[0].im = 0.0;
        if n % 2 == 0 {
            let last = self.head_spectrum.len() - 1;
            self.head_spectrum[last].im = 0.0;
        }

        self.inverse
            .process(&mut self.head_spectrum, &mut self.acf)
            .map_err(fft_error)?;

        let scale = 1.0 / n as f64;
        for value in &mut self.acf {
            *value *= scale;
        }
        Ok(())
    }

    /// Difference function and its cumulative mean normalization
    fn normalized_difference(&mut self, half: usize) {
        let head_energy = self.energy[half];
        self.cmnd[0] = 1.0;
        let mut running_sum = 0.0;

        for tau in 1..half {
            let lagged_energy = self.energy[tau + half] - self.energy[tau];
            let diff = (head_energy + lagged_energy - 2.0 * self.acf[tau]).max(0.0);
            running_sum += diff;
            self.cmnd[tau] = if running_sum > 0.0 {
                diff * tau as f64 / running_sum
            } else {
                1.0
            };
        }
    }

    /// First lag under the threshold, walked down to its local minimum
    fn first_dip(&self, min_tau: usize, max_tau: usize, threshold: f64) -> Option<usize> {
        let mut tau = min_tau;
        while tau < max_tau {
            if self.cmnd[tau] < threshold {
                while tau + 1 < max_tau && self.cmnd[tau + 1] < self.cmnd[tau] {
                    tau += 1;
                }
                return Some(tau);
            }
            tau += 1;
        }
        None
    }

    /// Parabolic interpolation for sub-sample accuracy
    fn parabolic_interpolation(&self, tau: usize) -> f64 {
        if tau == 0 || tau + 1 >= self.cmnd.len() {
            return tau as f64;
        }

        let s0 = self.cmnd[tau - 1];
        let s1 = self.cmnd[tau];
        let s2 = self.cmnd[tau + 1];

        let adjustment = (s0 - s2) / (2.0 * (s0 - 2.0 * s1 + s2));

        if adjustment.is_finite() && adjustment.abs() < 1.0 {
            tau as f64 + adjustment
        } else {
            tau as f64
        }
    }
}

fn fft_error(err: realfft::FftError) -> PitchError {
    PitchError::UpstreamEstimationFailure(format!("FFT error: {err:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const SAMPLE_RATE: u32 = 44100;

    fn generate_sine(samples: usize, freq: f64, amplitude: f64) -> Vec<f64> {
        (0..samples)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / SAMPLE_RATE as f64).sin())
            .collect()
    }

    fn interior(contour: &FrequencyContour) -> Vec<Option<f64>> {
        let n = contour.len();
        contour.frames()[4..n - 4].to_vec()
    }

    #[test]
    fn test_frame_count_matches_contract() {
        let estimator = YinEstimator::default();
        let params = AnalysisParams::default();
        let signal = generate_sine(SAMPLE_RATE as usize, 220.0, 0.5);
        let contour = estimator.estimate(&signal, SAMPLE_RATE, &params).unwrap();
        assert_eq!(contour.len(), params.frame_count(signal.len()));
    }

    #[test]
    fn test_detects_sine() {
        let estimator = YinEstimator::default();
        let params = AnalysisParams::default();

        for freq in [110.0, 220.0, 440.0, 880.0] {
            let signal = generate_sine(SAMPLE_RATE as usize, freq, 0.5);
            let contour = estimator.estimate(&signal, SAMPLE_RATE, &params).unwrap();

            for frame in interior(&contour) {
                let hz = frame.unwrap_or_else(|| panic!("{freq} Hz frame unvoiced"));
                assert!(
                    (hz - freq).abs() / freq < 0.01,
                    "expected {freq} Hz, got {hz}"
                );
            }
        }
    }

    #[test]
    fn test_silence_is_unvoiced() {
        let estimator = YinEstimator::default();
        let params = AnalysisParams::default();
        let silence = vec![0.0; 20_000];
        let contour = estimator.estimate(&silence, SAMPLE_RATE, &params).unwrap();
        assert_eq!(contour.voiced_count(), 0);
        assert_eq!(contour.len(), params.frame_count(silence.len()));
    }

    #[test]
    fn test_gap_in_signal_is_unvoiced() {
        let estimator = YinEstimator::default();
        let params = AnalysisParams::default();
        let mut signal = generate_sine(SAMPLE_RATE as usize, 330.0, 0.5);
        signal[15_000..30_000].fill(0.0);

        let contour = estimator.estimate(&signal, SAMPLE_RATE, &params).unwrap();
        // frame 44 is centred at 22528, entirely inside the gap
        assert_eq!(contour.get(44), None);
        assert!(contour.get(10).is_some());
        assert!(contour.get(75).is_some());
    }

    #[test]
    fn test_empty_input() {
        let estimator = YinEstimator::default();
        let contour = estimator
            .estimate(&[], SAMPLE_RATE, &AnalysisParams::default())
            .unwrap();
        assert!(contour.is_empty());
    }

    #[test]
    fn test_range_too_wide_for_frame() {
        let estimator = YinEstimator::default();
        let params = AnalysisParams {
            frame_length: 32,
            hop_length: 8,
            ..Default::default()
        };
        let result = estimator.estimate(&[0.1; 1000], SAMPLE_RATE, &params);
        assert!(matches!(result, Err(PitchError::UpstreamEstimationFailure(_))));
    }

    #[test]
    fn test_threshold_clamped() {
        let mut estimator = YinEstimator::default();
        estimator.set_threshold(2.0);
        assert_eq!(estimator.threshold(), 0.5);
    }
}
