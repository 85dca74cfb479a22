//! Streaming tempo detector
//!
//! Orchestrates the full estimation pipeline: buffers incoming samples into
//! overlapping analysis blocks, drives the Fourier filterbanks each block,
//! accumulates three onset-feature series (low-band flux, high-band flux,
//! RMS envelope), and on finalization combines FFT autocorrelation, comb
//! filtering, harmonic-template scoring, and parabolic peak refinement into
//! a ranked list of tempo candidates.
//!
//! The detector is single-threaded and synchronous. All buffers are
//! preallocated at construction and reused across blocks and
//! finalizations; the per-block hot path performs no allocation.

use crate::config::DetectorConfig;
use crate::features::filterbank::FourierFilterbank;
use crate::features::onset::{block_rms, positive_spectral_flux};
use crate::features::period::autocorrelation::{bpm_to_lag, lag_to_bpm, AutocorrelationFft};
use crate::features::period::comb_filter::AcfCombFilter;
use crate::features::period::TempoCandidate;

// Feature band layout. The low band carries most rhythmic energy; the high
// band is a single degenerate bin pair that tracks hi-hat style transients.
const LF_MIN_HZ: f32 = 0.0;
const LF_MAX_HZ: f32 = 550.0;
const HF_MIN_HZ: f32 = 9000.0;
const HF_MAX_HZ: f32 = 9001.0;
const LF_BIN_MAX: usize = 6;

// Per-feature autocorrelation weights: low flux, high flux, RMS envelope.
const ACF_WEIGHT_LOW_FLUX: f32 = 1.0;
const ACF_WEIGHT_HIGH_FLUX: f32 = 0.5;
const ACF_WEIGHT_RMS: f32 = 0.1;

/// Streaming BPM detector
///
/// Feed samples with [`process`](Self::process) (any chunking), then call
/// [`estimate_tempo`](Self::estimate_tempo) to finalize. Batch callers can
/// use [`estimate_tempo_of_samples`](Self::estimate_tempo_of_samples)
/// instead. [`reset`](Self::reset) returns the detector to a fresh state
/// while retaining buffer capacity.
pub struct TempoDetector {
    config: DetectorConfig,

    sample_rate: f32,
    block_size: usize,
    step_size: usize,

    low_filterbank: FourierFilterbank,
    high_filterbank: FourierFilterbank,
    autocorrelation: AutocorrelationFft,

    // Feature series, one value per processed block
    low_flux: Vec<f32>,
    high_flux: Vec<f32>,
    rms_envelope: Vec<f32>,

    tempo_candidates: Vec<TempoCandidate>,

    // Sliding block state
    input_block: Vec<f32>,
    pending_step: Vec<f32>,
    pending_fill: usize,

    // Spectrum snapshots for flux
    low_previous_spectrum: Vec<f32>,
    high_previous_spectrum: Vec<f32>,
    low_spectrum: Vec<f32>,
    high_spectrum: Vec<f32>,

    // Finalization scratch, grown on demand and reused
    acf_buffer: Vec<f32>,
    acf_scratch: Vec<f32>,
    comb_buffer: Vec<f32>,
    template_scores: Vec<f32>,
}

impl TempoDetector {
    /// Create a detector for audio at `sample_rate` Hz
    ///
    /// The analysis block size is derived from the low-band layout:
    /// `block_size = sample_rate * LF_BIN_MAX / LF_MAX_HZ`, with a 50%
    /// overlap step. Sample rates too low for that formula still get a
    /// minimal two-sample block so block processing never panics.
    pub fn new(sample_rate: f32, config: DetectorConfig) -> Self {
        let block_size = (((sample_rate * LF_BIN_MAX as f32) / LF_MAX_HZ) as usize).max(2);
        let step_size = (block_size / 2).max(1);

        let low_filterbank =
            FourierFilterbank::new(block_size, sample_rate, LF_MIN_HZ, LF_MAX_HZ, true);
        let high_filterbank =
            FourierFilterbank::new(block_size, sample_rate, HF_MIN_HZ, HF_MAX_HZ, true);

        let low_bins = low_filterbank.output_bin_count();
        let high_bins = high_filterbank.output_bin_count();

        Self {
            config,
            sample_rate,
            block_size,
            step_size,
            low_filterbank,
            high_filterbank,
            autocorrelation: AutocorrelationFft::new(),
            low_flux: Vec::new(),
            high_flux: Vec::new(),
            rms_envelope: Vec::new(),
            tempo_candidates: Vec::new(),
            input_block: vec![0.0; block_size],
            pending_step: vec![0.0; step_size],
            pending_fill: 0,
            low_previous_spectrum: vec![0.0; low_bins],
            high_previous_spectrum: vec![0.0; high_bins],
            low_spectrum: vec![0.0; low_bins],
            high_spectrum: vec![0.0; high_bins],
            acf_buffer: Vec::new(),
            acf_scratch: Vec::new(),
            comb_buffer: Vec::new(),
            template_scores: Vec::new(),
        }
    }

    /// Detector configuration
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Analysis block size in samples
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Block advance in samples (50% of the block size)
    pub fn step_size(&self) -> usize {
        self.step_size
    }

    /// Feature-series sample rate in hops per second
    pub fn hops_per_sec(&self) -> f32 {
        self.sample_rate / self.step_size as f32
    }

    /// Ingest a chunk of mono samples (streaming API)
    ///
    /// Samples are appended into a step-sized pending buffer; each time it
    /// fills, it is shifted into the tail of the sliding analysis block
    /// (overlap-save) and the block is processed. The resulting feature
    /// series are identical for any chunking of the same total samples.
    pub fn process(&mut self, samples: &[f32]) {
        self.reserve_for_incoming(samples.len());

        let hole = self.block_size - self.step_size;
        let mut consumed = 0usize;

        while consumed < samples.len() {
            let remaining = samples.len() - consumed;

            if self.pending_fill + remaining < self.step_size {
                self.pending_step[self.pending_fill..self.pending_fill + remaining]
                    .copy_from_slice(&samples[consumed..]);
                self.pending_fill += remaining;
                break;
            }

            self.input_block[hole..hole + self.pending_fill]
                .copy_from_slice(&self.pending_step[..self.pending_fill]);

            let to_consume = self.step_size - self.pending_fill;
            self.input_block[hole + self.pending_fill..]
                .copy_from_slice(&samples[consumed..consumed + to_consume]);

            consumed += to_consume;
            self.pending_fill = 0;

            self.process_input_block();

            self.input_block.copy_within(self.step_size.., 0);
        }
    }

    /// Analyze a whole buffer in one call (batch API)
    ///
    /// Slides a full analysis block directly over the input and finalizes.
    /// Equivalent to streaming the same samples through
    /// [`process`](Self::process) followed by
    /// [`estimate_tempo`](Self::estimate_tempo) within a small tolerance
    /// (the streaming path additionally flushes a zero-padded partial
    /// trailing block).
    pub fn estimate_tempo_of_samples(&mut self, samples: &[f32]) -> f64 {
        self.reserve_for_incoming(samples.len());

        let mut i = 0usize;
        while i + self.block_size < samples.len() {
            self.input_block
                .copy_from_slice(&samples[i..i + self.block_size]);
            self.process_input_block();
            i += self.step_size;
        }

        self.finish()
    }

    /// Finalize: flush any pending partial block (zero-padded) and analyze
    ///
    /// Returns the best tempo estimate in BPM, or 0.0 when no tempo was
    /// found. Idempotent when no samples are processed in between.
    pub fn estimate_tempo(&mut self) -> f64 {
        if self.pending_fill > 0 {
            let hole = self.block_size - self.step_size;
            self.input_block[hole..hole + self.pending_fill]
                .copy_from_slice(&self.pending_step[..self.pending_fill]);
            self.input_block[hole + self.pending_fill..].fill(0.0);
            self.pending_fill = 0;
            self.process_input_block();
        }
        self.finish()
    }

    /// Finalize without flushing the pending partial block
    ///
    /// Used for mid-stream rolling estimates: the pending samples stay
    /// queued so subsequent [`process`](Self::process) calls continue the
    /// stream without a synthetic zero-padded block in the middle.
    pub fn rolling_estimate(&mut self) -> f64 {
        self.finish()
    }

    /// Ranked tempo candidates from the last finalization
    pub fn tempo_candidates(&self) -> &[TempoCandidate] {
        &self.tempo_candidates
    }

    /// Ranked candidate BPM values from the last finalization
    pub fn tempo_candidate_bpms(&self) -> Vec<f64> {
        self.tempo_candidates.iter().map(|c| c.bpm).collect()
    }

    /// Clear all accumulated state, retaining buffer capacity
    pub fn reset(&mut self) {
        self.low_flux.clear();
        self.high_flux.clear();
        self.rms_envelope.clear();
        self.tempo_candidates.clear();
        self.pending_fill = 0;
        self.low_previous_spectrum.fill(0.0);
        self.high_previous_spectrum.fill(0.0);
    }

    fn reserve_for_incoming(&mut self, nsamples: usize) {
        let estimated_frames = nsamples / self.step_size.max(1);
        if estimated_frames > 0 {
            self.low_flux.reserve(estimated_frames);
            self.high_flux.reserve(estimated_frames);
            self.rms_envelope.reserve(estimated_frames);
        }
    }

    fn process_input_block(&mut self) {
        self.rms_envelope.push(block_rms(&self.input_block));

        self.low_filterbank
            .forward_magnitude(&self.input_block, &mut self.low_spectrum);
        self.low_flux.push(positive_spectral_flux(
            &self.low_spectrum,
            &self.low_previous_spectrum,
            self.config.flux_compression,
        ));
        self.low_previous_spectrum.copy_from_slice(&self.low_spectrum);

        self.high_filterbank
            .forward_magnitude(&self.input_block, &mut self.high_spectrum);
        self.high_flux.push(positive_spectral_flux(
            &self.high_spectrum,
            &self.high_previous_spectrum,
            self.config.flux_compression,
        ));
        self.high_previous_spectrum
            .copy_from_slice(&self.high_spectrum);
    }

    fn finish(&mut self) -> f64 {
        self.tempo_candidates.clear();

        let onset_frame_count = self.low_flux.len();
        if onset_frame_count == 0 {
            return 0.0;
        }

        let hops_per_sec = self.hops_per_sec();
        let min_bpm = self.config.min_bpm;
        let max_bpm = self.config.max_bpm;

        // Analysis length sized for the slowest tempo at four-bar scope,
        // halved until it fits the available feature frames.
        let bar_pm = min_bpm / (4 * self.config.beats_per_bar) as f32;
        let mut acf_length = bpm_to_lag(bar_pm, hops_per_sec);
        while acf_length > onset_frame_count {
            acf_length /= 2;
        }
        if acf_length == 0 {
            log::warn!(
                "Too few feature frames ({}) for BPM range [{:.1}, {:.1}]",
                onset_frame_count,
                min_bpm,
                max_bpm
            );
            return 0.0;
        }

        if self.acf_buffer.len() < acf_length {
            self.acf_buffer.resize(acf_length, 0.0);
        }
        if self.acf_scratch.len() < acf_length {
            self.acf_scratch.resize(acf_length, 0.0);
        }
        self.acf_buffer[..acf_length].fill(0.0);

        // Weighted sum of the three per-feature autocorrelations.
        for (series, weight) in [
            (&self.low_flux, ACF_WEIGHT_LOW_FLUX),
            (&self.high_flux, ACF_WEIGHT_HIGH_FLUX),
            (&self.rms_envelope, ACF_WEIGHT_RMS),
        ] {
            self.autocorrelation
                .acf_unity_normalised(series, acf_length, &mut self.acf_scratch);
            for i in 0..acf_length {
                self.acf_buffer[i] += self.acf_scratch[i] * weight;
            }
        }

        let min_lag = bpm_to_lag(max_bpm, hops_per_sec);
        let max_lag = bpm_to_lag(min_bpm, hops_per_sec);
        if acf_length < max_lag {
            log::debug!(
                "ACF length {} shorter than max lag {}; window too short",
                acf_length,
                max_lag
            );
            return 0.0;
        }

        let comb = AcfCombFilter::new(self.config.beats_per_bar, min_lag, max_lag, hops_per_sec);
        let comb_len = comb.filtered_len();
        if self.comb_buffer.len() < comb_len {
            self.comb_buffer.resize(comb_len, 0.0);
        }
        if self.template_scores.len() < comb_len {
            self.template_scores.resize(comb_len, 0.0);
        }

        comb.filter(&self.acf_buffer[..acf_length], &mut self.comb_buffer);
        unity_normalise(&mut self.comb_buffer[..comb_len]);

        self.apply_perceptual_weighting(min_lag, comb_len, hops_per_sec);
        self.compute_template_scores(min_lag, max_lag, comb_len);
        unity_normalise(&mut self.template_scores[..comb_len]);

        // Strict local maxima of the blended score, best first.
        let mut peaks: Vec<(f32, usize)> = Vec::with_capacity((comb_len / 8).max(8));
        if comb_len >= 3 {
            for i in 1..comb_len - 1 {
                if self.template_scores[i] > self.template_scores[i - 1]
                    && self.template_scores[i] > self.template_scores[i + 1]
                {
                    peaks.push((self.template_scores[i], i));
                }
            }
        }

        if peaks.is_empty() {
            return 0.0;
        }
        peaks.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen_buckets: Vec<i64> = Vec::with_capacity(peaks.len());

        for (score, peak_index) in peaks {
            let lag = peak_index + min_lag;
            let coarse_bpm = comb.refine(lag, &self.acf_buffer[..acf_length]);
            if coarse_bpm <= 0.0 {
                continue;
            }

            let lag_guess = (60.0 * hops_per_sec) / coarse_bpm;
            let refined_lag =
                self.refine_fundamental_lag(lag_guess, acf_length, min_lag, max_lag);
            // Sub-sample interpolation at the range edge can overshoot the
            // configured interval by a fraction of a BPM; clamp it back.
            let bpm = (lag_to_bpm(refined_lag, hops_per_sec) as f64)
                .clamp(min_bpm as f64, max_bpm as f64);

            // Dedupe to half-BPM buckets, first (highest score) wins.
            let gross = (bpm * 2.0).round() as i64;
            if !seen_buckets.contains(&gross) {
                seen_buckets.push(gross);
                self.tempo_candidates.push(TempoCandidate {
                    bpm,
                    strength: score,
                    lag: refined_lag,
                });
            }
        }

        let best = self.tempo_candidates.first().map(|c| c.bpm).unwrap_or(0.0);
        log::debug!(
            "Finalized {} frames into {} candidates (best {:.2} BPM)",
            onset_frame_count,
            self.tempo_candidates.len(),
            best
        );
        best
    }

    /// Optional mid-tempo bias: a bell curve centered at 130 BPM blended
    /// linearly with a neutral weighting by `perceptual_weighting_amount`.
    fn apply_perceptual_weighting(&mut self, min_lag: usize, comb_len: usize, hops_per_sec: f32) {
        let blend = self.config.perceptual_weighting_amount.clamp(0.0, 1.0);
        if blend <= 0.0 {
            return;
        }

        let center = 130.0f32;
        for i in 0..comb_len {
            let bpm = lag_to_bpm((min_lag + i) as f32, hops_per_sec);
            let deviation = (center - bpm).abs();
            let width = if bpm < center { 100.0 } else { 80.0 };
            let legacy_weight = (1.0 - (deviation / width).powf(2.4)).max(0.0);

            let weight = 1.0 + (legacy_weight - 1.0) * blend;
            self.comb_buffer[i] *= weight;
        }
    }

    /// Harmonic template score per lag, blended with the raw comb response
    fn compute_template_scores(&mut self, min_lag: usize, max_lag: usize, comb_len: usize) {
        let template_mix = self.config.template_blend.clamp(0.0, 1.0);
        let max_allowed_lag = min_lag + comb_len - 1;

        for i in 0..comb_len {
            let lag = min_lag + i;

            let at_lag = |l: usize| -> f32 {
                if l < min_lag || l > max_allowed_lag {
                    0.0
                } else {
                    self.comb_buffer[l - min_lag]
                }
            };

            let template_score = if lag > max_lag {
                0.0
            } else {
                // Reward consistency at integer multiples of the same
                // period, penalize strong subharmonics that cause
                // over-fast picks.
                let mut score = at_lag(lag) * self.config.harmonic_weight_1;
                score += at_lag(lag * 2) * self.config.harmonic_weight_2;
                score += at_lag(lag * 3) * self.config.harmonic_weight_3;
                score += at_lag(lag * 4) * self.config.harmonic_weight_4;
                score -= at_lag((lag / 2).max(1)) * self.config.subharmonic_penalty_2;
                score -= at_lag((lag / 3).max(1)) * self.config.subharmonic_penalty_3;
                score.max(0.0)
            };

            self.template_scores[i] =
                self.comb_buffer[i] * (1.0 - template_mix) + template_score * template_mix;
        }
    }

    /// Re-peak within +-2 samples of a lag guess and parabolically
    /// interpolate the sub-sample position.
    fn refine_fundamental_lag(
        &self,
        guess_lag: f32,
        acf_length: usize,
        min_lag: usize,
        max_lag: usize,
    ) -> f32 {
        let center = guess_lag.round() as isize;
        let low = (center - 2).max(min_lag as isize).max(1) as usize;
        let high = ((center + 2) as usize).min(max_lag).min(acf_length.saturating_sub(2));
        if low > high {
            return guess_lag;
        }

        let acf = &self.acf_buffer;
        let mut peak_index = low;
        let mut peak = acf[low];
        for i in low + 1..=high {
            if acf[i] > peak {
                peak = acf[i];
                peak_index = i;
            }
        }

        let mut interpolated = peak_index as f32;
        let left = acf[peak_index - 1];
        let center_value = acf[peak_index];
        let right = acf[peak_index + 1];
        if center_value > left && center_value > right {
            let denominator = left - 2.0 * center_value + right;
            if denominator != 0.0 {
                interpolated += ((left - right) / denominator) / 2.0;
            }
        }
        interpolated
    }
}

/// Rescale a slice to [0, 1] by its min/max; constant slices are untouched
fn unity_normalise(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }

    let mut max_value = values[0];
    let mut min_value = values[0];
    for &value in values.iter().skip(1) {
        if value > max_value {
            max_value = value;
        }
        if value < min_value {
            min_value = value;
        }
    }

    if max_value > min_value {
        let scale = 1.0 / (max_value - min_value);
        for value in values.iter_mut() {
            *value = (*value - min_value) * scale;
        }
    }
}
