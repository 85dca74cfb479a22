//! Periodicity analysis modules
//!
//! Building blocks for converting onset-feature series to tempo
//! candidates:
//! - FFT-accelerated autocorrelation, plus the shared lag/BPM conversions
//! - Comb filtering across harmonically related lags, with multi-harmonic
//!   consensus refinement of a coarse lag

pub mod autocorrelation;
pub mod comb_filter;

/// A ranked tempo candidate produced by finalization
#[derive(Debug, Clone, Copy)]
pub struct TempoCandidate {
    /// Tempo estimate in beats per minute
    pub bpm: f64,

    /// Peak strength of the blended comb/template score this candidate
    /// derived from, in [0, 1]
    pub strength: f32,

    /// Refined fundamental lag (in feature-series hops) the BPM derived from
    pub lag: f32,
}
