//! Correction diagnostics
//!
//! Frame-by-frame dump of the estimated and corrected contours, written as
//! JSON for external plotting. Absent frames are `null`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vt_pitch::{AnalysisParams, FrequencyContour};

use crate::audio_file::sibling_path;
use crate::error::{FileError, FileResult};

/// Suffix appended to the input stem for the diagnostics report
pub const DIAGNOSTICS_SUFFIX: &str = "_pitch_correction";

/// Original vs corrected contour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    /// Source file name
    pub source: String,
    pub sample_rate: u32,
    pub hop_length: usize,
    /// Correction mode description
    pub mode: String,
    /// Frame centre times (seconds)
    pub times: Vec<f64>,
    pub original: FrequencyContour,
    pub corrected: FrequencyContour,
}

impl DiagnosticsReport {
    /// Build report; both contours must have the same length
    pub fn new(
        source: impl Into<String>,
        sample_rate: u32,
        params: &AnalysisParams,
        mode: impl Into<String>,
        original: FrequencyContour,
        corrected: FrequencyContour,
    ) -> FileResult<Self> {
        if original.len() != corrected.len() {
            return Err(FileError::InvalidFile(format!(
                "contour length mismatch: {} original vs {} corrected frames",
                original.len(),
                corrected.len()
            )));
        }

        let times = (0..original.len())
            .map(|frame| params.frame_time(frame, sample_rate))
            .collect();

        Ok(Self {
            source: source.into(),
            sample_rate,
            hop_length: params.hop_length,
            mode: mode.into(),
            times,
            original,
            corrected,
        })
    }

    pub fn num_frames(&self) -> usize {
        self.times.len()
    }
}

/// `<stem>_pitch_correction.json` next to the input
pub fn diagnostics_path<P: AsRef<Path>>(input: P) -> PathBuf {
    sibling_path(input.as_ref(), DIAGNOSTICS_SUFFIX, "json")
}

/// Write report as pretty JSON
pub fn write_diagnostics<P: AsRef<Path>>(path: P, report: &DiagnosticsReport) -> FileResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;

    log::debug!(
        "Wrote diagnostics for {} frames to {}",
        report.num_frames(),
        path.as_ref().display()
    );
    Ok(())
}

/// Read report back
pub fn read_diagnostics<P: AsRef<Path>>(path: P) -> FileResult<DiagnosticsReport> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FileError::NotFound(path.display().to_string()));
    }
    let file = File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_times() {
        let params = AnalysisParams::default();
        let contour = FrequencyContour::new(vec![Some(220.0), None, Some(221.0)]);
        let report =
            DiagnosticsReport::new("a.wav", 44100, &params, "nearest-semitone", contour.clone(), contour)
                .unwrap();
        assert_eq!(report.num_frames(), 3);
        assert_eq!(report.times[0], 0.0);
        assert!((report.times[2] - 1024.0 / 44100.0).abs() < 1e-12);
    }

    #[test]
    fn test_report_length_mismatch() {
        let params = AnalysisParams::default();
        let result = DiagnosticsReport::new(
            "a.wav",
            44100,
            &params,
            "nearest-semitone",
            FrequencyContour::new(vec![None; 3]),
            FrequencyContour::new(vec![None; 2]),
        );
        assert!(matches!(result, Err(FileError::InvalidFile(_))));
    }

    #[test]
    fn test_diagnostics_path() {
        assert_eq!(
            diagnostics_path("dir/vocals.wav"),
            PathBuf::from("dir/vocals_pitch_correction.json")
        );
    }
}
