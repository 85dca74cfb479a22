//! Comb filtering of the autocorrelation sequence
//!
//! Enhances periodicity estimates by summing autocorrelation peak evidence
//! at integer multiples of the analysis lag. Summing across harmonically
//! related lags (one bar, two bars, four bars, ...) reinforces the true
//! bar period and suppresses noise present at any single lag.

use super::autocorrelation::lag_to_bpm;

/// Comb filter over a bounded lag range of an autocorrelation sequence
pub struct AcfCombFilter {
    beats_per_bar: usize,
    min_lag: usize,
    max_lag: usize,
    hops_per_sec: f32,
}

impl AcfCombFilter {
    /// Create a comb filter for lags `min_lag..=max_lag`
    pub fn new(beats_per_bar: usize, min_lag: usize, max_lag: usize, hops_per_sec: f32) -> Self {
        Self {
            beats_per_bar: beats_per_bar.max(1),
            min_lag,
            max_lag,
            hops_per_sec,
        }
    }

    /// Length of the filtered output (one value per lag in the search range)
    pub fn filtered_len(&self) -> usize {
        self.max_lag - self.min_lag + 1
    }

    /// Contribution window around `lag * multiple`
    ///
    /// Returns `(base, count)`: the window starts at `lag * m - m/4`
    /// (clamped to >= 0) and spans `m/4 + m/2` samples, so higher
    /// multiples tolerate proportionally more drift. Multiple 1 is the
    /// lag itself.
    fn contributing_range(lag: usize, multiple: usize) -> (usize, usize) {
        if multiple == 1 {
            return (lag, 1);
        }

        let base = (lag * multiple).saturating_sub(multiple / 4);
        let count = multiple / 4 + multiple / 2;
        (base, count)
    }

    /// Next harmonic multiple: `1, beats_per_bar, beats_per_bar * 2, * 4, ...`
    fn next_multiple(&self, multiple: usize) -> usize {
        if multiple == 1 {
            self.beats_per_bar
        } else {
            multiple * 2
        }
    }

    /// Comb-filter the autocorrelation into `filtered[0..filtered_len()]`
    ///
    /// For each lag in the search range, accumulates the maximum
    /// autocorrelation value within the contribution window at each
    /// harmonic multiple (stopping once a window runs past the sequence),
    /// then averages by the number of contributing multiples.
    ///
    /// # Panics
    ///
    /// Panics if `filtered.len() < self.filtered_len()`.
    pub fn filter(&self, autocorrelation: &[f32], filtered: &mut [f32]) {
        let filtered_len = self.filtered_len();
        assert!(filtered.len() >= filtered_len);

        let acf_len = autocorrelation.len();

        for (filtered_index, out) in filtered.iter_mut().take(filtered_len).enumerate() {
            *out = 0.0;
            let lag = self.min_lag + filtered_index;
            let mut multiple = 1usize;
            let mut contribution_count = 0usize;

            loop {
                let (base, count) = Self::contributing_range(lag, multiple);
                if base + count > acf_len {
                    break;
                }

                let mut peak = 0.0f32;
                for (j, &value) in autocorrelation[base..base + count].iter().enumerate() {
                    if j == 0 || value > peak {
                        peak = value;
                    }
                }

                *out += peak;
                contribution_count += 1;
                multiple = self.next_multiple(multiple);
            }

            if contribution_count != 0 {
                *out /= contribution_count as f32;
            }
        }
    }

    /// Refine a coarse lag into a continuous BPM via multi-harmonic consensus
    ///
    /// For multiples up to 16, locates the local peak near `lag * m`,
    /// parabolically interpolates its sub-sample position, and maps it back
    /// to the fundamental by dividing by `m`. Candidates weaker than 90% of
    /// the strongest peak are discarded; the survivors are averaged with
    /// weights `peak * 1 / (1 + |candidate - seed|)` so harmonics that agree
    /// with the original lag dominate. Falls back to the seed lag when no
    /// candidate survives.
    pub fn refine(&self, lag: usize, autocorrelation: &[f32]) -> f32 {
        let acf_len = autocorrelation.len();
        let seed_lag = lag as f32;

        let mut candidate_lags: Vec<f32> = Vec::with_capacity(6);
        let mut candidate_peaks: Vec<f32> = Vec::with_capacity(6);
        let mut max_peak = 0.0f32;

        let mut multiple = 1usize;
        while multiple <= 16 {
            let (base, count) = Self::contributing_range(lag, multiple);
            if base + count > acf_len {
                break;
            }

            let mut peak = 0.0f32;
            let mut peak_index = base;
            for sample_index in base..(base + count).min(acf_len) {
                if sample_index == base || autocorrelation[sample_index] > peak {
                    peak = autocorrelation[sample_index];
                    peak_index = sample_index;
                }
            }

            if peak > 0.0 {
                let mut interpolated_peak_index = peak_index as f32;
                if peak_index > 0 && peak_index + 1 < acf_len {
                    let left = autocorrelation[peak_index - 1];
                    let center = autocorrelation[peak_index];
                    let right = autocorrelation[peak_index + 1];
                    if center > left && center > right {
                        let denominator = left - 2.0 * center + right;
                        if denominator != 0.0 {
                            interpolated_peak_index += ((left - right) / denominator) / 2.0;
                        }
                    }
                }

                candidate_lags.push(interpolated_peak_index / multiple as f32);
                candidate_peaks.push(peak);
                if peak > max_peak {
                    max_peak = peak;
                }
            }

            multiple = self.next_multiple(multiple);
        }

        if candidate_lags.is_empty() {
            return lag_to_bpm(seed_lag, self.hops_per_sec);
        }

        // Weighted consensus over strong harmonics reduces systematic
        // drift from single-window peak picks.
        let keep_threshold = max_peak * 0.9;
        let mut weighted_lag = 0.0f32;
        let mut total_weight = 0.0f32;

        for (candidate_lag, peak) in candidate_lags.iter().zip(candidate_peaks.iter()) {
            if *peak < keep_threshold {
                continue;
            }

            // Prefer consensus close to the seed lag from the comb peak.
            let distance_from_seed = (candidate_lag - seed_lag).abs();
            let proximity = 1.0 / (1.0 + distance_from_seed);
            let weight = peak * proximity;
            weighted_lag += candidate_lag * weight;
            total_weight += weight;
        }

        let refined_lag = if total_weight > 0.0 {
            weighted_lag / total_weight
        } else {
            seed_lag
        };

        lag_to_bpm(refined_lag, self.hops_per_sec)
    }
}
