//! Onset-strength features
//!
//! Per-block features accumulated by the detector: compressed positive
//! spectral flux (an onset-emphasizing half-wave-rectified log flux) and
//! the block RMS envelope.

/// Compressed positive spectral flux between two magnitude spectra
///
/// Sums `max(0, log1p(c * k) - log1p(p * k))` over bins, where `k` is the
/// compression factor (clamped to at least 1e-4). Only positive deltas
/// count; compressed positive flux is more onset-focused and less noisy
/// than a raw power difference.
pub fn positive_spectral_flux(current: &[f32], previous: &[f32], compression: f32) -> f32 {
    debug_assert_eq!(current.len(), previous.len());

    let compression = compression.max(1e-4);
    let mut total = 0.0f32;
    for (&c, &p) in current.iter().zip(previous.iter()) {
        let delta = (c * compression).ln_1p() - (p * compression).ln_1p();
        if delta > 0.0 {
            total += delta;
        }
    }
    total
}

/// Root-mean-square of one analysis block
pub fn block_rms(block: &[f32]) -> f32 {
    if block.is_empty() {
        return 0.0;
    }

    let mut energy = 0.0f32;
    for &sample in block {
        energy += sample * sample;
    }
    (energy / block.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flux_ignores_negative_deltas() {
        let rising = vec![0.0, 1.0, 2.0];
        let falling = vec![2.0, 1.0, 0.0];

        let up = positive_spectral_flux(&rising, &falling, 2.0);
        assert!(up > 0.0);

        let down = positive_spectral_flux(&[0.0; 3], &rising, 2.0);
        assert_eq!(down, 0.0);
    }

    #[test]
    fn test_flux_identical_spectra_is_zero() {
        let spectrum = vec![0.3, 0.7, 1.1, 0.2];
        assert_eq!(positive_spectral_flux(&spectrum, &spectrum, 2.0), 0.0);
    }

    #[test]
    fn test_flux_compression_is_clamped() {
        let current = vec![1.0, 1.0];
        let previous = vec![0.0, 0.0];
        // A non-positive compression must not zero out the feature.
        let flux = positive_spectral_flux(&current, &previous, 0.0);
        assert!(flux > 0.0);
    }

    #[test]
    fn test_block_rms() {
        assert_eq!(block_rms(&[]), 0.0);
        assert_eq!(block_rms(&[0.0, 0.0]), 0.0);

        let rms = block_rms(&[1.0, -1.0, 1.0, -1.0]);
        assert!((rms - 1.0).abs() < 1e-6);

        let rms = block_rms(&[0.5, 0.5, 0.5, 0.5]);
        assert!((rms - 0.5).abs() < 1e-6);
    }
}
