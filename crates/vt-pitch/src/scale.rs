//! Musical scales
//!
//! A [`ScaleSpec`] names a root and a mode ("C:maj", "F# minor"); a
//! [`ScaleModel`] is the degree list derived from it once and used for
//! nearest-degree queries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{NOTE_NAMES, PitchError, PitchResult, SEMITONES_IN_OCTAVE, parse_pitch_class};

/// Musical scale types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleType {
    /// Chromatic (all 12 notes)
    Chromatic,
    /// Major scale (ionian)
    Major,
    /// Natural minor (aeolian)
    NaturalMinor,
    /// Harmonic minor
    HarmonicMinor,
    /// Melodic minor
    MelodicMinor,
    /// Pentatonic major
    PentatonicMajor,
    /// Pentatonic minor
    PentatonicMinor,
    /// Blues scale
    Blues,
    /// Dorian mode
    Dorian,
    /// Phrygian mode
    Phrygian,
    /// Lydian mode
    Lydian,
    /// Mixolydian mode
    Mixolydian,
    /// Locrian mode
    Locrian,
    /// Whole tone
    WholeTone,
}

impl ScaleType {
    /// Semitone intervals above the root
    pub fn intervals(&self) -> &'static [i32] {
        match self {
            ScaleType::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            ScaleType::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleType::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleType::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleType::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            ScaleType::PentatonicMajor => &[0, 2, 4, 7, 9],
            ScaleType::PentatonicMinor => &[0, 3, 5, 7, 10],
            ScaleType::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleType::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleType::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleType::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleType::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleType::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            ScaleType::WholeTone => &[0, 2, 4, 6, 8, 10],
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            ScaleType::Chromatic => "Chromatic",
            ScaleType::Major => "Major",
            ScaleType::NaturalMinor => "Minor",
            ScaleType::HarmonicMinor => "Harmonic Minor",
            ScaleType::MelodicMinor => "Melodic Minor",
            ScaleType::PentatonicMajor => "Pentatonic Major",
            ScaleType::PentatonicMinor => "Pentatonic Minor",
            ScaleType::Blues => "Blues",
            ScaleType::Dorian => "Dorian",
            ScaleType::Phrygian => "Phrygian",
            ScaleType::Lydian => "Lydian",
            ScaleType::Mixolydian => "Mixolydian",
            ScaleType::Locrian => "Locrian",
            ScaleType::WholeTone => "Whole Tone",
        }
    }

    /// Look up a mode by name. Case, spaces, `-` and `_` are ignored.
    pub fn from_mode_name(mode: &str) -> Option<Self> {
        let key: String = mode
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let scale_type = match key.as_str() {
            "chromatic" | "chr" => ScaleType::Chromatic,
            "maj" | "major" | "ionian" | "ion" => ScaleType::Major,
            "min" | "minor" | "aeolian" | "aeo" | "naturalminor" => ScaleType::NaturalMinor,
            "harmonicminor" | "harmmin" => ScaleType::HarmonicMinor,
            "melodicminor" | "melmin" => ScaleType::MelodicMinor,
            "pentatonicmajor" | "majorpentatonic" | "pentmaj" => ScaleType::PentatonicMajor,
            "pentatonicminor" | "minorpentatonic" | "pentmin" => ScaleType::PentatonicMinor,
            "blues" => ScaleType::Blues,
            "dorian" | "dor" => ScaleType::Dorian,
            "phrygian" | "phr" => ScaleType::Phrygian,
            "lydian" | "lyd" => ScaleType::Lydian,
            "mixolydian" | "mix" => ScaleType::Mixolydian,
            "locrian" | "loc" => ScaleType::Locrian,
            "wholetone" | "whole" => ScaleType::WholeTone,
            _ => return None,
        };
        Some(scale_type)
    }
}

/// Root + mode, as written by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleSpec {
    /// Root pitch class (0-11, where 0=C, 1=C#, etc.)
    pub root: u8,
    /// Scale type
    pub scale_type: ScaleType,
}

impl ScaleSpec {
    /// Create spec, reducing the root modulo 12
    pub fn new(root: u8, scale_type: ScaleType) -> Self {
        Self {
            root: root % SEMITONES_IN_OCTAVE as u8,
            scale_type,
        }
    }

    /// Parse `"<root>[:| ]<mode>"`, e.g. `C:maj`, `F# minor`, `Bb:dorian`
    pub fn parse(text: &str) -> PitchResult<Self> {
        let invalid = || PitchError::InvalidScaleSpec(text.to_string());

        let trimmed = text.trim();
        let (offset, rest) = parse_pitch_class(trimmed).ok_or_else(invalid)?;
        let mode = rest.trim_start_matches([':', ' ']).trim();
        if mode.is_empty() {
            return Err(invalid());
        }
        let scale_type = ScaleType::from_mode_name(mode).ok_or_else(invalid)?;

        let root = offset.rem_euclid(SEMITONES_IN_OCTAVE) as u8;
        Ok(Self { root, scale_type })
    }

    /// Scale name, e.g. "C Major"
    pub fn name(&self) -> String {
        format!("{} {}", NOTE_NAMES[self.root as usize], self.scale_type.name())
    }
}

impl FromStr for ScaleSpec {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ScaleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Scale degree set used for nearest-degree search.
///
/// Degrees are semitone offsets sorted ascending, starting at the root
/// (0-11) and ending with the root repeated one octave up, so the list
/// covers the window `[root, root + 12]` without modular wrap-around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleModel {
    spec: ScaleSpec,
    degrees: Vec<i32>,
}

impl ScaleModel {
    /// Derive the degree list for a spec
    pub fn new(spec: ScaleSpec) -> Self {
        let root = spec.root as i32;
        let mut degrees: Vec<i32> = spec
            .scale_type
            .intervals()
            .iter()
            .map(|&interval| root + interval)
            .collect();
        degrees.push(root + SEMITONES_IN_OCTAVE);

        Self { spec, degrees }
    }

    /// Create major scale
    pub fn major(root: u8) -> Self {
        Self::new(ScaleSpec::new(root, ScaleType::Major))
    }

    /// Create minor scale
    pub fn minor(root: u8) -> Self {
        Self::new(ScaleSpec::new(root, ScaleType::NaturalMinor))
    }

    /// Spec this model was built from
    pub fn spec(&self) -> &ScaleSpec {
        &self.spec
    }

    /// Root pitch class
    pub fn root(&self) -> u8 {
        self.spec.root
    }

    /// Degree list (mode cardinality + 1 entries)
    pub fn degrees(&self) -> &[i32] {
        &self.degrees
    }

    /// Scale name
    pub fn name(&self) -> String {
        self.spec.name()
    }

    /// Check whether a pitch class (any integer, reduced mod 12) is in the scale
    pub fn contains_pitch_class(&self, pitch_class: i32) -> bool {
        let pc = pitch_class.rem_euclid(SEMITONES_IN_OCTAVE);
        self.degrees
            .iter()
            .any(|&d| d.rem_euclid(SEMITONES_IN_OCTAVE) == pc)
    }

    /// Lift a MIDI value's pitch class into `[root, root + 12)`
    pub fn pitch_class(&self, midi: f64) -> f64 {
        let root = self.spec.root as f64;
        (midi - root).rem_euclid(SEMITONES_IN_OCTAVE as f64) + root
    }

    /// Nearest degree to a pitch class in `[root, root + 12)`.
    ///
    /// Linear scan over at most 13 entries; on an exact tie the lower
    /// degree (first in ascending order) wins.
    pub fn nearest_degree(&self, pitch_class: f64) -> i32 {
        let mut best = self.degrees[0];
        let mut best_dist = f64::INFINITY;

        for &degree in &self.degrees {
            let dist = (pitch_class - degree as f64).abs();
            if dist < best_dist {
                best_dist = dist;
                best = degree;
            }
        }

        best
    }
}

impl FromStr for ScaleModel {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScaleSpec::parse(s).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_major_degrees() {
        let scale: ScaleModel = "C:maj".parse().unwrap();
        assert_eq!(scale.degrees(), &[0, 2, 4, 5, 7, 9, 11, 12]);
        assert_eq!(scale.name(), "C Major");
    }

    #[test]
    fn test_degree_list_shape() {
        for spec in ["C:maj", "A:min", "F#:dorian", "Bb blues", "E pentatonic minor", "G:chromatic"] {
            let scale: ScaleModel = spec.parse().unwrap();
            let degrees = scale.degrees();
            let cardinality = scale.spec().scale_type.intervals().len();

            assert_eq!(degrees.len(), cardinality + 1, "{spec}");
            assert!(degrees.windows(2).all(|w| w[0] < w[1]), "{spec}");
            assert_eq!(degrees[0], scale.root() as i32, "{spec}");
            assert_eq!(*degrees.last().unwrap(), degrees[0] + 12, "{spec}");
        }
    }

    #[test]
    fn test_chromatic_has_thirteen_entries() {
        let scale: ScaleModel = "C chromatic".parse().unwrap();
        assert_eq!(scale.degrees().len(), 13);
    }

    #[test]
    fn test_parse_accidentals_and_separators() {
        assert_eq!(ScaleSpec::parse("F#:maj").unwrap(), ScaleSpec::new(6, ScaleType::Major));
        assert_eq!(ScaleSpec::parse("Bb minor").unwrap(), ScaleSpec::new(10, ScaleType::NaturalMinor));
        assert_eq!(ScaleSpec::parse("Cb:maj").unwrap(), ScaleSpec::new(11, ScaleType::Major));
        assert_eq!(ScaleSpec::parse("B#:maj").unwrap(), ScaleSpec::new(0, ScaleType::Major));
        assert_eq!(ScaleSpec::parse("  d Harmonic-Minor ").unwrap(), ScaleSpec::new(2, ScaleType::HarmonicMinor));
        assert_eq!(ScaleSpec::parse("B:blues").unwrap(), ScaleSpec::new(11, ScaleType::Blues));
    }

    #[test]
    fn test_parse_rejects_unknown_root() {
        assert!(matches!(ScaleSpec::parse("H:maj"), Err(PitchError::InvalidScaleSpec(_))));
        assert!(matches!(ScaleSpec::parse(""), Err(PitchError::InvalidScaleSpec(_))));
        assert!(matches!(ScaleSpec::parse("1:maj"), Err(PitchError::InvalidScaleSpec(_))));
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        assert!(matches!(ScaleSpec::parse("C:superlocrianish"), Err(PitchError::InvalidScaleSpec(_))));
        assert!(matches!(ScaleSpec::parse("C"), Err(PitchError::InvalidScaleSpec(_))));
        assert!(matches!(ScaleSpec::parse("C:"), Err(PitchError::InvalidScaleSpec(_))));
    }

    #[test]
    fn test_contains_pitch_class() {
        let scale = ScaleModel::minor(9); // A minor: A B C D E F G
        assert!(scale.contains_pitch_class(9));
        assert!(scale.contains_pitch_class(11));
        assert!(scale.contains_pitch_class(0));
        assert!(scale.contains_pitch_class(72));
        assert!(!scale.contains_pitch_class(10));
    }

    #[test]
    fn test_nearest_degree_unambiguous() {
        let scale = ScaleModel::major(0);
        assert_eq!(scale.nearest_degree(1.1), 0);
        assert_eq!(scale.nearest_degree(1.3), 2);
        assert_eq!(scale.nearest_degree(11.8), 12);
        assert_eq!(scale.nearest_degree(7.0), 7);
    }

    #[test]
    fn test_nearest_degree_tie_prefers_lower() {
        let scale = ScaleModel::major(0);
        // C# is equidistant from C and D
        assert_eq!(scale.nearest_degree(1.0), 0);
        // F# is equidistant from F and G
        assert_eq!(scale.nearest_degree(6.0), 5);
        // B + 0.5 is equidistant from B and the octave C
        assert_eq!(scale.nearest_degree(11.5), 11);
    }

    #[test]
    fn test_pitch_class_window_follows_root() {
        let d_major = ScaleModel::major(2);
        // C (MIDI 60) lifts into [2, 14) as 12
        assert_eq!(d_major.pitch_class(60.0), 12.0);
        assert_eq!(d_major.pitch_class(62.5), 2.5);
        assert_eq!(ScaleModel::major(0).pitch_class(61.0), 1.0);
    }

    #[test]
    fn test_scale_spec_display() {
        assert_eq!(ScaleSpec::new(9, ScaleType::NaturalMinor).to_string(), "A Minor");
        assert_eq!(ScaleSpec::new(7, ScaleType::Blues).to_string(), "G Blues");
    }
}
