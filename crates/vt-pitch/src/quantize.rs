//! Pitch quantization
//!
//! Maps each frequency estimate to its correction target:
//! - Nearest semitone (round-half-up on the MIDI scale)
//! - Nearest scale degree (pitch class snapped, octave preserved)
//!
//! Both policies are pure per-frame functions. Temporal smoothing happens
//! afterwards in [`crate::smoothing`].

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::contour::FrequencyContour;
use crate::scale::ScaleModel;
use crate::{PitchError, PitchResult, hz_to_midi, midi_to_hz};

/// Pitch correction mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CorrectionMode {
    /// Correct to nearest semitone
    NearestSemitone,
    /// Correct to nearest note of the scale
    NearestScaleDegree(ScaleModel),
}

impl CorrectionMode {
    /// Short mode name for logs
    pub fn name(&self) -> String {
        match self {
            CorrectionMode::NearestSemitone => "nearest-semitone".to_string(),
            CorrectionMode::NearestScaleDegree(scale) => {
                format!("nearest-scale-degree ({})", scale.name())
            }
        }
    }
}

/// Round a MIDI value to the nearest note; exact halves go up
pub fn round_half_up(midi: f64) -> f64 {
    (midi + 0.5).floor()
}

/// Snap a MIDI value to the nearest semitone
pub fn nearest_semitone(midi: f64) -> f64 {
    round_half_up(midi)
}

/// Snap a MIDI value's pitch class to the nearest scale degree.
///
/// Only the pitch class moves; the octave of the input is kept.
pub fn nearest_scale_degree(midi: f64, scale: &ScaleModel) -> f64 {
    let degree = scale.pitch_class(midi);
    let chosen = scale.nearest_degree(degree);
    let delta = degree - chosen as f64;
    midi - delta
}

/// Per-frame pitch quantizer
#[derive(Debug, Clone)]
pub struct PitchQuantizer {
    /// Correction mode
    mode: CorrectionMode,
}

impl PitchQuantizer {
    /// Create new quantizer
    pub fn new(mode: CorrectionMode) -> Self {
        Self { mode }
    }

    /// Nearest-semitone quantizer
    pub fn chromatic() -> Self {
        Self::new(CorrectionMode::NearestSemitone)
    }

    /// Nearest-scale-degree quantizer
    pub fn with_scale(scale: ScaleModel) -> Self {
        Self::new(CorrectionMode::NearestScaleDegree(scale))
    }

    /// Get mode
    pub fn mode(&self) -> &CorrectionMode {
        &self.mode
    }

    /// Target MIDI value for a MIDI value
    pub fn target_midi(&self, midi: f64) -> f64 {
        match &self.mode {
            CorrectionMode::NearestSemitone => nearest_semitone(midi),
            CorrectionMode::NearestScaleDegree(scale) => nearest_scale_degree(midi, scale),
        }
    }

    /// Quantize one present frequency; `frame` is only used for error context
    pub fn quantize_value(&self, hz: f64, frame: usize) -> PitchResult<f64> {
        if !(hz.is_finite() && hz > 0.0) {
            return Err(PitchError::InvalidFrequency { frame, value: hz });
        }
        Ok(midi_to_hz(self.target_midi(hz_to_midi(hz))))
    }

    /// Quantize one frame. Absent in, absent out.
    pub fn quantize_hz(&self, hz: Option<f64>, frame: usize) -> PitchResult<Option<f64>> {
        hz.map(|hz| self.quantize_value(hz, frame)).transpose()
    }

    /// Quantize a whole contour.
    ///
    /// Frames are validated in order first, so the error names the first bad
    /// frame; the mapping itself runs in parallel.
    pub fn quantize(&self, contour: &FrequencyContour) -> PitchResult<FrequencyContour> {
        contour.validate()?;

        let frames: Vec<Option<f64>> = contour
            .frames()
            .par_iter()
            .map(|frame| frame.map(|hz| midi_to_hz(self.target_midi(hz_to_midi(hz)))))
            .collect();

        log::debug!(
            "Quantized {} frames ({} voiced) with {}",
            frames.len(),
            contour.voiced_count(),
            self.mode.name()
        );

        Ok(FrequencyContour::new(frames))
    }
}
