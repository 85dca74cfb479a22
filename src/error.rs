//! Error types for the tempo detection engine

use std::fmt;

/// Errors that can occur at the boundaries of tempo detection
///
/// The numeric hot path (block processing, autocorrelation, comb filtering)
/// never produces errors; it degrades to sentinel values (0.0 BPM, empty
/// candidate list) instead. Only boundary operations surface a `TempoError`.
#[derive(Debug, Clone, PartialEq)]
pub enum TempoError {
    /// No audio samples were provided to a batch call or scan
    NoAudioData,

    /// Finalization produced no usable tempo candidates
    DetectionFailed,

    /// Cooperative cancellation was observed between ingestion steps
    Cancelled,

    /// Invalid input parameters
    InvalidInput(String),
}

impl fmt::Display for TempoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TempoError::NoAudioData => write!(f, "No audio data"),
            TempoError::DetectionFailed => write!(f, "Failed to detect tempo"),
            TempoError::Cancelled => write!(f, "Analysis cancelled"),
            TempoError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for TempoError {}
