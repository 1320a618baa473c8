//! Error types for the pitch correction engine

use thiserror::Error;

/// Pitch correction errors
#[derive(Debug, Error)]
pub enum PitchError {
    /// Scale specification names an unknown root or mode
    #[error("Invalid scale specification: {0}")]
    InvalidScaleSpec(String),

    /// Note name could not be parsed
    #[error("Invalid note name: {0}")]
    InvalidNoteName(String),

    /// Present frame holds a non-positive or non-finite frequency
    #[error("Quantization: invalid frequency {value} Hz at frame {frame}")]
    InvalidFrequency { frame: usize, value: f64 },

    /// Median window width is even or zero
    #[error("Smoothing: invalid window width {0}, must be odd and at least 1")]
    InvalidWindow(usize),

    /// Configuration rejected before processing
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Pitch estimation stage failed
    #[error("Estimation failed: {0}")]
    UpstreamEstimationFailure(String),

    /// Resynthesis stage failed
    #[error("Resynthesis failed: {0}")]
    UpstreamResynthesisFailure(String),
}

/// Result type for pitch operations
pub type PitchResult<T> = Result<T, PitchError>;
