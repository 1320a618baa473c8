//! Frequency contours
//!
//! One optional f0 estimate (Hz) per analysis frame. Unvoiced frames are
//! `None`, never a sentinel value, and every transform keeps them in place.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{PitchError, PitchResult};

/// Per-frame frequency estimates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyContour {
    frames: Vec<Option<f64>>,
}

impl FrequencyContour {
    /// Create contour from frames
    pub fn new(frames: Vec<Option<f64>>) -> Self {
        Self { frames }
    }

    /// Create contour with no frames
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create contour from raw estimator output.
    ///
    /// Non-finite and non-positive values (NaN "no pitch" markers, zeros)
    /// become absent frames.
    pub fn from_hz(values: &[f64]) -> Self {
        let frames = values
            .iter()
            .map(|&hz| (hz.is_finite() && hz > 0.0).then_some(hz))
            .collect();
        Self { frames }
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when there are no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame at index (`None` when out of range or absent)
    pub fn get(&self, index: usize) -> Option<f64> {
        self.frames.get(index).copied().flatten()
    }

    /// All frames
    pub fn frames(&self) -> &[Option<f64>] {
        &self.frames
    }

    /// Iterate frames
    pub fn iter(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.frames.iter().copied()
    }

    /// Indices of absent frames
    pub fn absent_positions(&self) -> Vec<usize> {
        self.frames
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.is_none().then_some(i))
            .collect()
    }

    /// Number of present frames
    pub fn voiced_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_some()).count()
    }

    /// Maximal runs of present frames, in order
    pub fn present_runs(&self) -> Vec<Range<usize>> {
        let mut runs = Vec::new();
        let mut start = None;

        for (i, frame) in self.frames.iter().enumerate() {
            match (frame, start) {
                (Some(_), None) => start = Some(i),
                (None, Some(s)) => {
                    runs.push(s..i);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push(s..self.frames.len());
        }

        runs
    }

    /// Apply `f` to present frames, leaving absent frames in place
    pub fn map_present<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        Self {
            frames: self.frames.iter().map(|frame| frame.map(&f)).collect(),
        }
    }

    /// First present frame that is not a usable frequency
    pub fn validate(&self) -> PitchResult<()> {
        for (frame, value) in self.frames.iter().enumerate() {
            if let Some(value) = *value {
                if !(value.is_finite() && value > 0.0) {
                    return Err(PitchError::InvalidFrequency { frame, value });
                }
            }
        }
        Ok(())
    }
}

impl From<Vec<Option<f64>>> for FrequencyContour {
    fn from(frames: Vec<Option<f64>>) -> Self {
        Self::new(frames)
    }
}

impl FromIterator<Option<f64>> for FrequencyContour {
    fn from_iter<I: IntoIterator<Item = Option<f64>>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hz_marks_unvoiced() {
        let contour = FrequencyContour::from_hz(&[220.0, f64::NAN, 0.0, -5.0, 440.0]);
        assert_eq!(
            contour.frames(),
            &[Some(220.0), None, None, None, Some(440.0)]
        );
        assert_eq!(contour.absent_positions(), vec![1, 2, 3]);
        assert_eq!(contour.voiced_count(), 2);
    }

    #[test]
    fn test_present_runs() {
        let contour = FrequencyContour::new(vec![
            None,
            Some(1.0),
            Some(2.0),
            None,
            None,
            Some(3.0),
        ]);
        assert_eq!(contour.present_runs(), vec![1..3, 5..6]);

        let full = FrequencyContour::new(vec![Some(1.0); 4]);
        assert_eq!(full.present_runs(), vec![0..4]);

        assert!(FrequencyContour::empty().present_runs().is_empty());
        assert!(FrequencyContour::new(vec![None; 3]).present_runs().is_empty());
    }

    #[test]
    fn test_map_present_keeps_gaps() {
        let contour = FrequencyContour::new(vec![Some(100.0), None, Some(200.0)]);
        let doubled = contour.map_present(|hz| hz * 2.0);
        assert_eq!(doubled.frames(), &[Some(200.0), None, Some(400.0)]);
    }

    #[test]
    fn test_validate() {
        assert!(FrequencyContour::new(vec![Some(1.0), None]).validate().is_ok());
        let bad = FrequencyContour::new(vec![Some(1.0), Some(f64::INFINITY), Some(0.0)]);
        assert!(matches!(
            bad.validate(),
            Err(PitchError::InvalidFrequency { frame: 1, .. })
        ));
    }

    #[test]
    fn test_serializes_absent_as_null() {
        let contour = FrequencyContour::new(vec![Some(220.0), None]);
        let json = serde_json::to_string(&contour).unwrap();
        assert_eq!(json, "[220.0,null]");
    }
}
