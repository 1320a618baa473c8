//! Audio resynthesis at a target pitch contour
//!
//! Time-domain PSOLA used as the default [`Resynthesizer`]:
//! - Re-analyse the source f0 with an inner estimator
//! - Place analysis marks one local source period apart
//! - Place synthesis marks one target period apart
//! - Overlap-add Hann-windowed two-period grains from the nearest analysis mark
//! - Normalize by the accumulated window so overlap density does not change level
//!
//! Frames where either the source or the target is absent keep their source
//! period, which reproduces the input there. Output length equals input length.

use std::f64::consts::PI;

use crate::config::AutotuneConfig;
use crate::contour::FrequencyContour;
use crate::detection::YinEstimator;
use crate::pipeline::{AnalysisParams, PitchEstimator, Resynthesizer};
use crate::{PitchError, PitchResult};

/// Grain period used where the source is unvoiced (Hz)
const UNVOICED_PERIOD_HZ: f64 = 100.0;

/// Largest pitch ratio applied to a grain (two octaves)
const MAX_SHIFT_RATIO: f64 = 4.0;

/// Window weight below which a sample is taken from the input unchanged
const MIN_WINDOW_WEIGHT: f64 = 1e-6;

/// TD-PSOLA resynthesizer
#[derive(Debug, Clone)]
pub struct PsolaResynthesizer<E = YinEstimator> {
    /// Source re-analysis
    estimator: E,
}

impl PsolaResynthesizer<YinEstimator> {
    /// Create resynthesizer with the default YIN analysis
    pub fn new(config: &AutotuneConfig) -> Self {
        Self::with_estimator(YinEstimator::new(config))
    }
}

impl<E: PitchEstimator> PsolaResynthesizer<E> {
    /// Create resynthesizer with a custom source analysis
    pub fn with_estimator(estimator: E) -> Self {
        Self { estimator }
    }
}

impl<E: PitchEstimator> Resynthesizer for PsolaResynthesizer<E> {
    fn resynthesize(
        &self,
        samples: &[f64],
        sample_rate: u32,
        target: &FrequencyContour,
        params: &AnalysisParams,
    ) -> PitchResult<Vec<f64>> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let source = self
            .estimator
            .estimate(samples, sample_rate, params)
            .map_err(|e| PitchError::UpstreamResynthesisFailure(format!("source analysis: {e}")))?;

        if source.len() != target.len() {
            return Err(PitchError::UpstreamResynthesisFailure(format!(
                "target contour has {} frames, source analysis has {}",
                target.len(),
                source.len()
            )));
        }

        Ok(psola(samples, sample_rate, &source, target, params))
    }
}

/// Analysis mark: grain centre and local period (samples)
#[derive(Debug, Clone, Copy)]
struct PitchMark {
    position: usize,
    period: f64,
}

/// Shift `samples` from the `source` contour to the `target` contour.
///
/// Both contours must have one frame per hop of `params`.
pub fn psola(
    samples: &[f64],
    sample_rate: u32,
    source: &FrequencyContour,
    target: &FrequencyContour,
    params: &AnalysisParams,
) -> Vec<f64> {
    let n = samples.len();
    if n == 0 || source.is_empty() {
        return samples.to_vec();
    }

    let sr = sample_rate as f64;
    let min_period = (sr / params.f_max).max(1.0);
    let max_period = (sr / params.f_min).max(min_period);
    let hop = params.hop_length as f64;
    let last_frame = source.len() - 1;

    let frame_at = |position: f64| ((position / hop).round() as usize).min(last_frame);
    let source_period = |frame: usize| {
        source
            .get(frame)
            .map(|f0| sr / f0)
            .unwrap_or(sr / UNVOICED_PERIOD_HZ)
            .clamp(min_period, max_period)
    };

    // Analysis marks, one source period apart
    let mut marks = Vec::new();
    let mut position = 0.0;
    while position < n as f64 {
        let period = source_period(frame_at(position));
        marks.push(PitchMark {
            position: position.round() as usize,
            period,
        });
        position += period;
    }

    let mut output = vec![0.0; n];
    let mut weights = vec![0.0; n];

    // Synthesis marks, one target period apart
    let mut time = 0.0;
    let mut nearest = 0;
    while time < n as f64 {
        while nearest + 1 < marks.len()
            && (marks[nearest + 1].position as f64 - time).abs()
                <= (marks[nearest].position as f64 - time).abs()
        {
            nearest += 1;
        }
        let mark = marks[nearest];

        let frame = frame_at(time);
        let ratio = match (source.get(frame), target.get(frame)) {
            (Some(src), Some(tgt)) => (tgt / src).clamp(1.0 / MAX_SHIFT_RATIO, MAX_SHIFT_RATIO),
            _ => 1.0,
        };

        overlap_add_grain(
            samples,
            mark,
            time.round() as usize,
            &mut output,
            &mut weights,
        );

        time += (mark.period / ratio).max(1.0);
    }

    output
        .iter()
        .zip(&weights)
        .zip(samples)
        .map(|((&value, &weight), &original)| {
            if weight > MIN_WINDOW_WEIGHT {
                value / weight
            } else {
                original
            }
        })
        .collect()
}

/// Add the Hann-windowed grain around `mark` centred at `center`
fn overlap_add_grain(
    samples: &[f64],
    mark: PitchMark,
    center: usize,
    output: &mut [f64],
    weights: &mut [f64],
) {
    let half = mark.period.round().max(1.0) as isize;
    let n = samples.len() as isize;

    for offset in -half..=half {
        let src = mark.position as isize + offset;
        let dst = center as isize + offset;
        if src < 0 || src >= n || dst < 0 || dst >= n {
            continue;
        }

        let window = 0.5 * (1.0 + (PI * offset as f64 / half as f64).cos());
        output[dst as usize] += window * samples[src as usize];
        weights[dst as usize] += window;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44100;

    fn generate_sine(samples: usize, freq: f64) -> Vec<f64> {
        (0..samples)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f64 / SAMPLE_RATE as f64).sin())
            .collect()
    }

    fn median_voiced(contour: &FrequencyContour) -> f64 {
        let mut voiced: Vec<f64> = contour.iter().flatten().collect();
        voiced.sort_by(f64::total_cmp);
        voiced[voiced.len() / 2]
    }

    #[test]
    fn test_absent_target_reproduces_input() {
        let params = AnalysisParams::default();
        let input = generate_sine(20_000, 220.0);
        let frames = params.frame_count(input.len());
        let source = FrequencyContour::new(vec![Some(220.0); frames]);
        let target = FrequencyContour::new(vec![None; frames]);

        let output = psola(&input, SAMPLE_RATE, &source, &target, &params);
        assert_eq!(output.len(), input.len());
        for (a, b) in output.iter().zip(&input) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unity_ratio_reproduces_input() {
        let params = AnalysisParams::default();
        let input = generate_sine(12_000, 330.0);
        let frames = params.frame_count(input.len());
        let source = FrequencyContour::new(vec![Some(330.0); frames]);

        let output = psola(&input, SAMPLE_RATE, &source, &source, &params);
        for (a, b) in output.iter().zip(&input) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_length_preserved_when_shifting() {
        let params = AnalysisParams::default();
        let input = generate_sine(30_001, 200.0);
        let frames = params.frame_count(input.len());
        let source = FrequencyContour::new(vec![Some(200.0); frames]);

        for target_hz in [150.0, 250.0, 400.0] {
            let target = FrequencyContour::new(vec![Some(target_hz); frames]);
            let output = psola(&input, SAMPLE_RATE, &source, &target, &params);
            assert_eq!(output.len(), input.len());
            assert!(output.iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn test_shift_moves_pitch() {
        let config = AutotuneConfig::default();
        let params = config.analysis;
        let resynth = PsolaResynthesizer::new(&config);
        let estimator = YinEstimator::new(&config);

        let input = generate_sine(SAMPLE_RATE as usize, 220.0);
        let frames = params.frame_count(input.len());
        // two semitones up
        let target_hz = 220.0 * 2f64.powf(2.0 / 12.0);
        let target = FrequencyContour::new(vec![Some(target_hz); frames]);

        let output = resynth
            .resynthesize(&input, SAMPLE_RATE, &target, &params)
            .unwrap();
        assert_eq!(output.len(), input.len());

        let detected = estimator.estimate(&output, SAMPLE_RATE, &params).unwrap();
        let f0 = median_voiced(&detected);
        assert!(
            (f0 - target_hz).abs() / target_hz < 0.05,
            "expected ~{target_hz} Hz, got {f0}"
        );
    }

    #[test]
    fn test_mismatched_target_length() {
        let config = AutotuneConfig::default();
        let resynth = PsolaResynthesizer::new(&config);
        let input = generate_sine(10_000, 220.0);
        let target = FrequencyContour::new(vec![Some(220.0); 3]);

        let result = resynth.resynthesize(&input, SAMPLE_RATE, &target, &config.analysis);
        assert!(matches!(result, Err(PitchError::UpstreamResynthesisFailure(_))));
    }

    #[test]
    fn test_empty_input() {
        let config = AutotuneConfig::default();
        let resynth = PsolaResynthesizer::new(&config);
        let output = resynth
            .resynthesize(&[], SAMPLE_RATE, &FrequencyContour::empty(), &config.analysis)
            .unwrap();
        assert!(output.is_empty());
    }
}
