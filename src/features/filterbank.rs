//! Sparse direct-frequency transform over a narrow band
//!
//! Projects a fixed-size audio block onto a small set of frequency bins
//! using precomputed sine/cosine weighting tables. This is not a general
//! FFT: for the handful of bins the onset features need, a direct
//! matrix-vector projection is cheaper and allocation-free per block.

use std::f32::consts::PI;

/// Fourier filterbank over a fixed frequency band
///
/// All weighting tables are computed once at construction; `forward_magnitude`
/// performs no allocation and is deterministic for a given input block.
pub struct FourierFilterbank {
    /// Input block length in samples
    frame_size: usize,

    /// Number of output frequency bins
    output_bin_count: usize,

    // Flattened [bin * frame_size + sample_index]
    sine_table: Vec<f32>,
    cosine_table: Vec<f32>,
}

impl FourierFilterbank {
    /// Create a filterbank for the band `[min_freq, max_freq]` Hz
    ///
    /// # Arguments
    ///
    /// * `n` - Input block length in samples
    /// * `fs` - Sample rate in Hz
    /// * `min_freq` - Lower band edge in Hz
    /// * `max_freq` - Upper band edge in Hz
    /// * `windowed` - Apply a raised-cosine (Hann) window to the tables
    pub fn new(n: usize, fs: f32, min_freq: f32, max_freq: f32, windowed: bool) -> Self {
        let minimum_bin = ((n as f32 * min_freq) / fs).floor() as usize;
        let maximum_bin = ((n as f32 * max_freq) / fs).ceil() as usize;
        let output_bin_count = maximum_bin - minimum_bin + 1;

        let mut sine_table = vec![0.0f32; output_bin_count * n];
        let mut cosine_table = vec![0.0f32; output_bin_count * n];

        let two_pi = 2.0 * PI;
        for output_bin_index in 0..output_bin_count {
            let bin = output_bin_index + minimum_bin;
            let bin_phase_delta = two_pi * bin as f32 / n as f32;
            let row_offset = output_bin_index * n;

            for sample_index in 0..n {
                let angle = sample_index as f32 * bin_phase_delta;
                let window_value = if windowed {
                    0.5 - 0.5 * (two_pi * sample_index as f32 / n as f32).cos()
                } else {
                    1.0
                };
                sine_table[row_offset + sample_index] = angle.sin() * window_value;
                cosine_table[row_offset + sample_index] = angle.cos() * window_value;
            }
        }

        Self {
            frame_size: n,
            output_bin_count,
            sine_table,
            cosine_table,
        }
    }

    /// Number of output frequency bins
    pub fn output_bin_count(&self) -> usize {
        self.output_bin_count
    }

    /// Project a block onto the band and write per-bin magnitudes
    ///
    /// For each output bin the real/imaginary projections are dot products
    /// of the block against the precomputed cosine/sine rows; the output is
    /// `sqrt(re^2 + im^2)` per bin.
    ///
    /// # Panics
    ///
    /// Panics if `input.len() < frame_size` or `output.len() < output_bin_count`.
    pub fn forward_magnitude(&self, input: &[f32], output: &mut [f32]) {
        assert!(input.len() >= self.frame_size);
        assert!(output.len() >= self.output_bin_count);

        let block = &input[..self.frame_size];

        for output_bin_index in 0..self.output_bin_count {
            let row_offset = output_bin_index * self.frame_size;
            let cosine_row = &self.cosine_table[row_offset..row_offset + self.frame_size];
            let sine_row = &self.sine_table[row_offset..row_offset + self.frame_size];

            let mut real_projection = 0.0f32;
            let mut imaginary_projection = 0.0f32;
            for (sample_index, &sample) in block.iter().enumerate() {
                real_projection += cosine_row[sample_index] * sample;
                imaginary_projection += sine_row[sample_index] * sample;
            }

            output[output_bin_index] = (real_projection * real_projection
                + imaginary_projection * imaginary_projection)
                .sqrt();
        }
    }
}
