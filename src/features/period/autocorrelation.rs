//! FFT-accelerated autocorrelation over onset-feature series
//!
//! Computes a normalized autocorrelation sequence of a 1-D feature series
//! over a bounded lag range using the identity `ACF = IFFT(|FFT(x)|^2)`,
//! giving O(n log n) instead of the O(n * lag_count) direct form. Also owns
//! the lag/BPM conversion used by every stage of the pipeline so that all
//! callers agree on the mapping.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

const EPSILON: f32 = 1e-10;

/// Reusable FFT autocorrelation engine
///
/// Holds the FFT planner and complex scratch so repeated finalizations of
/// the same detector perform no redundant plan setup.
pub struct AutocorrelationFft {
    planner: FftPlanner<f32>,
    scratch: Vec<Complex<f32>>,
}

impl Default for AutocorrelationFft {
    fn default() -> Self {
        Self::new()
    }
}

impl AutocorrelationFft {
    /// Create a new autocorrelation engine
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            scratch: Vec::new(),
        }
    }

    /// Compute a unity-normalized autocorrelation for lags `0..lag_count`
    ///
    /// The input series has its mean removed before correlation (onset
    /// features carry a large DC component that would otherwise flatten
    /// the lag peaks), then the sequence is rescaled so the zero-lag
    /// value is 1.
    ///
    /// Degenerate inputs (empty series, zero lag count, constant series)
    /// write zeros into `output` rather than erroring.
    ///
    /// # Panics
    ///
    /// Panics if `output.len() < lag_count`.
    pub fn acf_unity_normalised(&mut self, input: &[f32], lag_count: usize, output: &mut [f32]) {
        assert!(output.len() >= lag_count);

        if lag_count == 0 {
            return;
        }

        let n = input.len();
        if n == 0 {
            output[..lag_count].fill(0.0);
            return;
        }

        let mean = input.iter().sum::<f32>() / n as f32;

        // Zero-pad to the next power of two >= 2n so the circular
        // correlation becomes a linear one.
        let fft_size = (2 * n).next_power_of_two();
        self.scratch.clear();
        self.scratch
            .extend(input.iter().map(|&x| Complex::new(x - mean, 0.0)));
        self.scratch.resize(fft_size, Complex::new(0.0, 0.0));

        let fft = self.planner.plan_fft_forward(fft_size);
        fft.process(&mut self.scratch);

        for x in &mut self.scratch {
            *x = *x * x.conj();
        }

        let ifft = self.planner.plan_fft_inverse(fft_size);
        ifft.process(&mut self.scratch);

        // rustfft does not normalize; fold the 1/fft_size factor into the
        // unity rescale by the zero-lag value.
        let zero_lag = self.scratch[0].re;
        if zero_lag.abs() < EPSILON {
            output[..lag_count].fill(0.0);
            return;
        }

        let scale = 1.0 / zero_lag;
        for (lag, out) in output.iter_mut().take(lag_count).enumerate() {
            *out = if lag < fft_size {
                self.scratch[lag].re * scale
            } else {
                0.0
            };
        }
    }
}

/// Convert a tempo in BPM to a feature-series lag (rounded)
///
/// `hops_per_sec` is the feature-series sample rate, i.e.
/// `sample_rate / step_size`. Exact inverse of [`lag_to_bpm`] up to
/// rounding.
pub fn bpm_to_lag(bpm: f32, hops_per_sec: f32) -> usize {
    if bpm <= 0.0 {
        return 0;
    }
    ((60.0 * hops_per_sec) / bpm).round() as usize
}

/// Convert a (possibly fractional) feature-series lag to BPM
pub fn lag_to_bpm(lag: f32, hops_per_sec: f32) -> f32 {
    if lag <= 0.0 {
        return 0.0;
    }
    (60.0 * hops_per_sec) / lag
}
