//! # tempo-dsp
//!
//! A streaming tempo (BPM) detection engine for recorded audio, providing
//! one-shot batch estimation, incremental streaming estimation, and
//! cross-window voting over long recordings with early termination.
//!
//! ## Features
//!
//! - **Onset features**: narrow-band spectral flux via a sparse Fourier
//!   filterbank, plus a block RMS envelope
//! - **Periodicity**: FFT-accelerated autocorrelation with comb filtering
//!   across harmonically related lags
//! - **Candidate ranking**: harmonic-template scoring with subharmonic
//!   suppression and parabolic peak refinement
//! - **Voting**: rolling estimates tallied across analysis windows with
//!   early stop once enough windows agree
//!
//! ## Quick Start
//!
//! ```no_run
//! use tempo_dsp::{estimate_tempo, DetectorConfig};
//!
//! // Mono samples, normalized to [-1.0, 1.0]
//! let samples: Vec<f32> = vec![]; // Your audio data
//! let sample_rate = 44100.0;
//!
//! let bpm = estimate_tempo(&samples, sample_rate, DetectorConfig::default())?;
//! println!("Tempo: {:.2} BPM", bpm);
//! # Ok::<(), tempo_dsp::TempoError>(())
//! ```
//!
//! For streaming ingestion use [`TempoDetector`] directly; for long
//! recordings with progress and cancellation, implement
//! [`SampleSource`] and use [`scan_source`].
//!
//! ## Architecture
//!
//! ```text
//! Samples -> Blocks -> Feature Series -> Autocorrelation -> Comb Response
//!         -> Scored Candidates -> (Cross-Window Votes) -> Final BPM
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;

// Re-export main types
pub use analysis::aggregator::ResultAggregator;
pub use analysis::detector::TempoDetector;
pub use analysis::scan::{scan_source, ScanConfig};
pub use config::DetectorConfig;
pub use error::TempoError;
pub use features::period::TempoCandidate;
pub use io::source::{SampleSource, SliceSource};

/// Estimate the dominant tempo of a whole sample buffer
///
/// Batch convenience over [`TempoDetector`]: equivalent to streaming the
/// same samples through [`TempoDetector::process`] followed by
/// [`TempoDetector::estimate_tempo`] within a small numerical tolerance.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
/// * `config` - Detector configuration parameters
///
/// # Errors
///
/// * `TempoError::NoAudioData` when `samples` is empty
/// * `TempoError::InvalidInput` for a non-positive sample rate or an
///   invalid configuration
/// * `TempoError::DetectionFailed` when no tempo could be found
///
/// # Example
///
/// ```no_run
/// use tempo_dsp::{estimate_tempo, DetectorConfig};
///
/// let samples = vec![0.1f32; 44100 * 30];
/// let bpm = estimate_tempo(&samples, 44100.0, DetectorConfig::default())?;
/// # Ok::<(), tempo_dsp::TempoError>(())
/// ```
pub fn estimate_tempo(
    samples: &[f32],
    sample_rate: f32,
    config: DetectorConfig,
) -> Result<f64, TempoError> {
    log::debug!(
        "Estimating tempo: {} samples at {} Hz",
        samples.len(),
        sample_rate
    );

    if samples.is_empty() {
        return Err(TempoError::NoAudioData);
    }

    if sample_rate <= 0.0 {
        return Err(TempoError::InvalidInput(format!(
            "Invalid sample rate: {}",
            sample_rate
        )));
    }

    config.validate()?;

    let mut detector = TempoDetector::new(sample_rate, config);
    let bpm = detector.estimate_tempo_of_samples(samples);

    if bpm > 0.0 {
        Ok(bpm)
    } else {
        Err(TempoError::DetectionFailed)
    }
}
