//! Configuration for pitch correction runs

use serde::{Deserialize, Serialize};

use crate::pipeline::AnalysisParams;
use crate::smoothing::{ContourSmoother, DEFAULT_SMOOTHING_WINDOW};
use crate::{PitchError, PitchResult};

/// Pitch correction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutotuneConfig {
    /// Framing and search range shared by estimator and resynthesizer
    pub analysis: AnalysisParams,
    /// Median window width for contour smoothing (odd)
    pub smoothing_window: usize,
    /// YIN absolute threshold (0-1, lower = stricter voicing)
    pub yin_threshold: f64,
    /// Frames quieter than this RMS level (dBFS) are unvoiced
    pub silence_threshold_db: f64,
}

impl Default for AutotuneConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisParams::default(),
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            yin_threshold: 0.1,
            silence_threshold_db: -60.0,
        }
    }
}

impl AutotuneConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> PitchResult<Self> {
        serde_json::from_str(json).map_err(|e| PitchError::InvalidConfig(e.to_string()))
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> PitchResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PitchError::InvalidConfig(e.to_string()))
    }

    /// Set smoothing window
    pub fn with_smoothing_window(mut self, window: usize) -> Self {
        self.smoothing_window = window;
        self
    }

    /// Set analysis parameters
    pub fn with_analysis(mut self, analysis: AnalysisParams) -> Self {
        self.analysis = analysis;
        self
    }

    /// Set YIN threshold
    pub fn with_yin_threshold(mut self, threshold: f64) -> Self {
        self.yin_threshold = threshold;
        self
    }

    /// Check every field before any processing starts
    pub fn validate(&self) -> PitchResult<()> {
        self.analysis.validate()?;
        ContourSmoother::new(self.smoothing_window)?;

        if !(self.yin_threshold > 0.0 && self.yin_threshold < 1.0) {
            return Err(PitchError::InvalidConfig(format!(
                "yin_threshold must be in (0, 1), got {}",
                self.yin_threshold
            )));
        }
        if !self.silence_threshold_db.is_finite() {
            return Err(PitchError::InvalidConfig(format!(
                "silence_threshold_db must be finite, got {}",
                self.silence_threshold_db
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = AutotuneConfig::default();
        assert_eq!(config.analysis.frame_length, 2048);
        assert_eq!(config.analysis.hop_length, 512);
        assert_relative_eq!(config.analysis.f_min, 65.40639132514966, max_relative = 1e-12);
        assert_relative_eq!(config.analysis.f_max, 2093.004522404789, max_relative = 1e-12);
        assert_eq!(config.smoothing_window, 11);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AutotuneConfig::from_json(r#"{ "smoothing_window": 5 }"#).unwrap();
        assert_eq!(config.smoothing_window, 5);
        assert_eq!(config.analysis, AnalysisParams::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = AutotuneConfig::default().with_smoothing_window(7);
        let json = config.to_json().unwrap();
        assert_eq!(AutotuneConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            AutotuneConfig::from_json("{ not json"),
            Err(PitchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_window() {
        let config = AutotuneConfig::default().with_smoothing_window(10);
        assert!(matches!(config.validate(), Err(PitchError::InvalidWindow(10))));
    }

    #[test]
    fn test_validate_threshold() {
        let config = AutotuneConfig::default().with_yin_threshold(1.5);
        assert!(matches!(config.validate(), Err(PitchError::InvalidConfig(_))));
    }
}
