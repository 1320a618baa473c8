//! VoxTune Pitch Correction Engine
//!
//! Offline "autotune" for monophonic vocal recordings:
//!
//! ## Features
//! - **Frequency Contours**: Per-frame f0 estimates with explicit unvoiced frames
//! - **Scale Model**: Root + mode specifications ("C:maj", "F# minor", ...)
//! - **Quantization**: Nearest semitone or nearest scale degree, octave preserved
//! - **Smoothing**: Gap-aware median filtering of the target contour
//! - **Pipeline**: Estimation → quantization → smoothing → resynthesis
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vt_pitch::{AutotuneConfig, AutotunePipeline, CorrectionMode, ScaleModel};
//! use vt_pitch::detection::YinEstimator;
//! use vt_pitch::synthesis::PsolaResynthesizer;
//!
//! let config = AutotuneConfig::default();
//! let mode = CorrectionMode::NearestScaleDegree("C:maj".parse::<ScaleModel>()?);
//! let pipeline = AutotunePipeline::new(
//!     config.clone(),
//!     mode,
//!     YinEstimator::new(&config),
//!     PsolaResynthesizer::new(&config),
//! )?;
//!
//! let output = pipeline.run(&samples, 44100)?;
//! ```

pub mod config;
pub mod contour;
pub mod detection;
pub mod pipeline;
pub mod quantize;
pub mod scale;
pub mod smoothing;
pub mod synthesis;

mod error;

pub use config::AutotuneConfig;
pub use contour::FrequencyContour;
pub use error::{PitchError, PitchResult};
pub use pipeline::{
    AnalysisParams, AutotuneOutput, AutotunePipeline, PipelineStage, PitchEstimator,
    Resynthesizer,
};
pub use quantize::{CorrectionMode, PitchQuantizer};
pub use scale::{ScaleModel, ScaleSpec, ScaleType};
pub use smoothing::{ContourSmoother, DEFAULT_SMOOTHING_WINDOW};

/// Semitones per octave
pub const SEMITONES_IN_OCTAVE: i32 = 12;

/// Concert pitch reference (A4)
pub const A4_HZ: f64 = 440.0;

/// MIDI note number of A4
pub const A4_MIDI: f64 = 69.0;

/// Note names
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Convert frequency to (real-valued) MIDI note number
pub fn hz_to_midi(hz: f64) -> f64 {
    A4_MIDI + 12.0 * (hz / A4_HZ).log2()
}

/// Convert MIDI note number to frequency
pub fn midi_to_hz(midi: f64) -> f64 {
    A4_HZ * 2.0f64.powf((midi - A4_MIDI) / 12.0)
}

/// Convert frequency difference to cents
pub fn hz_to_cents(from: f64, to: f64) -> f64 {
    1200.0 * (to / from).log2()
}

/// Get note name from MIDI number
pub fn midi_to_note_name(midi: f64) -> String {
    let note = midi.round() as i32;
    let octave = note.div_euclid(SEMITONES_IN_OCTAVE) - 1;
    let note_idx = note.rem_euclid(SEMITONES_IN_OCTAVE) as usize;
    format!("{}{}", NOTE_NAMES[note_idx], octave)
}

/// Parse a leading pitch class (`C`, `F#`, `Bb`, `Ebb`, ...).
///
/// Returns the semitone offset (not reduced modulo 12) and the unparsed rest.
pub(crate) fn parse_pitch_class(text: &str) -> Option<(i32, &str)> {
    let mut chars = text.char_indices();
    let (_, letter) = chars.next()?;
    let mut offset = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut rest = &text[letter.len_utf8()..];
    for (idx, c) in chars {
        match c {
            '#' | '♯' => offset += 1,
            'b' | '♭' => offset -= 1,
            _ => {
                rest = &text[idx..];
                return Some((offset, rest));
            }
        }
        rest = &text[idx + c.len_utf8()..];
    }

    Some((offset, rest))
}

/// Parse a note name such as `C2`, `A4`, `F#3` or `Bb-1` to Hz
pub fn note_to_hz(name: &str) -> PitchResult<f64> {
    let trimmed = name.trim();
    let (offset, rest) = parse_pitch_class(trimmed)
        .ok_or_else(|| PitchError::InvalidNoteName(name.to_string()))?;
    let octave: i32 = rest
        .parse()
        .map_err(|_| PitchError::InvalidNoteName(name.to_string()))?;

    let midi = (octave + 1) * SEMITONES_IN_OCTAVE + offset;
    Ok(midi_to_hz(midi as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hz_to_midi() {
        assert_relative_eq!(hz_to_midi(440.0), 69.0);
        assert!((hz_to_midi(261.63) - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_midi_to_hz() {
        assert_relative_eq!(midi_to_hz(69.0), 440.0);
        assert_relative_eq!(midi_to_hz(57.0), 220.0, max_relative = 1e-12);
    }

    #[test]
    fn test_round_trip_identity() {
        for &hz in &[1e-3, 0.5, 27.5, 65.406, 220.0, 233.08, 1000.0, 2093.0, 19_999.9, 1e6] {
            let back = midi_to_hz(hz_to_midi(hz));
            assert_relative_eq!(back, hz, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_cents() {
        assert_relative_eq!(hz_to_cents(440.0, 880.0), 1200.0);
        assert!((hz_to_cents(440.0, 466.16) - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_note_name() {
        assert_eq!(midi_to_note_name(60.0), "C4");
        assert_eq!(midi_to_note_name(69.0), "A4");
        assert_eq!(midi_to_note_name(72.0), "C5");
        assert_eq!(midi_to_note_name(0.0), "C-1");
    }

    #[test]
    fn test_note_to_hz() {
        assert_relative_eq!(note_to_hz("A4").unwrap(), 440.0);
        assert_relative_eq!(note_to_hz("C2").unwrap(), 65.40639132514966, max_relative = 1e-12);
        assert_relative_eq!(note_to_hz("C7").unwrap(), 2093.004522404789, max_relative = 1e-12);
        assert_relative_eq!(note_to_hz("Bb3").unwrap(), note_to_hz("A#3").unwrap());
        assert_relative_eq!(note_to_hz("Cb4").unwrap(), note_to_hz("B3").unwrap());
    }

    #[test]
    fn test_note_to_hz_rejects_garbage() {
        assert!(matches!(note_to_hz("H4"), Err(PitchError::InvalidNoteName(_))));
        assert!(matches!(note_to_hz("C"), Err(PitchError::InvalidNoteName(_))));
        assert!(matches!(note_to_hz(""), Err(PitchError::InvalidNoteName(_))));
    }

    #[test]
    fn test_parse_pitch_class_rest() {
        assert_eq!(parse_pitch_class("F#:maj"), Some((6, ":maj")));
        assert_eq!(parse_pitch_class("Ebb minor"), Some((2, " minor")));
        assert_eq!(parse_pitch_class("C"), Some((0, "")));
        assert_eq!(parse_pitch_class("x"), None);
    }
}
