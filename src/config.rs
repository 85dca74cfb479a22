//! Configuration parameters for tempo detection

use serde::{Deserialize, Serialize};

use crate::error::TempoError;

/// Tempo detector configuration parameters
///
/// Immutable per-detector configuration. This is the only serializable
/// state the engine exposes; everything else is transient analysis state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum BPM to consider (default: 40.0)
    pub min_bpm: f32,

    /// Maximum BPM to consider (default: 300.0)
    pub max_bpm: f32,

    /// Beats per bar used for harmonic stacking across bars (default: 4)
    pub beats_per_bar: usize,

    /// Perceptual tempo bias in [0, 1] (default: 0.0)
    ///
    /// 0.0 = no perceptual tempo bias (most neutral/accurate),
    /// 1.0 = full legacy weighting toward mid-tempo (bell centered at 130 BPM).
    pub perceptual_weighting_amount: f32,

    /// Log-compression factor applied before the positive spectral flux
    /// difference (default: 2.0). Higher values emphasize quiet onsets.
    pub flux_compression: f32,

    /// Harmonic template weight at 1x the candidate lag (default: 1.0)
    pub harmonic_weight_1: f32,

    /// Harmonic template weight at 2x the candidate lag (default: 0.25)
    pub harmonic_weight_2: f32,

    /// Harmonic template weight at 3x the candidate lag (default: 0.10)
    pub harmonic_weight_3: f32,

    /// Harmonic template weight at 4x the candidate lag (default: 0.05)
    pub harmonic_weight_4: f32,

    /// Penalty for comb energy at half the candidate lag (default: 0.10)
    ///
    /// Strong subharmonics often cause over-fast picks; set all harmonic
    /// weights and penalties to 0 to fall back to comb-only peak strength.
    pub subharmonic_penalty_2: f32,

    /// Penalty for comb energy at a third of the candidate lag (default: 0.03)
    pub subharmonic_penalty_3: f32,

    /// Blend of harmonic template score with comb score in [0, 1]
    /// (default: 0.35). 0 = comb only, 1 = template only.
    pub template_blend: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_bpm: 40.0,
            max_bpm: 300.0,
            beats_per_bar: 4,
            perceptual_weighting_amount: 0.0,
            flux_compression: 2.0,
            harmonic_weight_1: 1.0,
            harmonic_weight_2: 0.25,
            harmonic_weight_3: 0.10,
            harmonic_weight_4: 0.05,
            subharmonic_penalty_2: 0.10,
            subharmonic_penalty_3: 0.03,
            template_blend: 0.35,
        }
    }
}

impl DetectorConfig {
    /// Validate configuration invariants
    ///
    /// # Errors
    ///
    /// Returns `TempoError::InvalidInput` if the BPM range is not a valid
    /// closed interval, `beats_per_bar` is zero, or any weight is non-finite.
    pub fn validate(&self) -> Result<(), TempoError> {
        if self.min_bpm <= 0.0 || self.max_bpm <= 0.0 || self.min_bpm >= self.max_bpm {
            return Err(TempoError::InvalidInput(format!(
                "Invalid BPM range: [{:.1}, {:.1}]",
                self.min_bpm, self.max_bpm
            )));
        }

        if self.beats_per_bar == 0 {
            return Err(TempoError::InvalidInput(
                "beats_per_bar must be at least 1".to_string(),
            ));
        }

        let weights = [
            self.perceptual_weighting_amount,
            self.flux_compression,
            self.harmonic_weight_1,
            self.harmonic_weight_2,
            self.harmonic_weight_3,
            self.harmonic_weight_4,
            self.subharmonic_penalty_2,
            self.subharmonic_penalty_3,
            self.template_blend,
        ];

        if weights.iter().any(|w| !w.is_finite()) {
            return Err(TempoError::InvalidInput(
                "All weights must be finite".to_string(),
            ));
        }

        Ok(())
    }
}
