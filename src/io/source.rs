//! Sample source abstraction
//!
//! The collaborator boundary for long-recording scans: something that
//! yields successive mono float sample chunks at a known sample rate and
//! reports scan progress. Decoding audio files into such chunks is out of
//! scope for this crate; hosts implement [`SampleSource`] over their own
//! decoder or capture pipeline.

/// A pull-based stream of mono sample chunks
///
/// Implementations must report a monotonically increasing unit-interval
/// progress value per chunk and signal exhaustion exactly once by
/// returning `None`. The scan driver checks cancellation between chunks,
/// never mid-chunk, so implementations stay free of concurrency concerns.
pub trait SampleSource {
    /// Sample rate of the yielded chunks in Hz
    fn sample_rate(&self) -> f32;

    /// Fill `chunk` with the next run of samples (replacing its contents)
    ///
    /// Returns the unit-interval progress after this chunk, or `None` once
    /// the stream is exhausted.
    fn next_chunk(&mut self, chunk: &mut Vec<f32>) -> Option<f64>;
}

/// In-memory [`SampleSource`] over a sample buffer
///
/// Yields fixed-size chunks (the final chunk may be shorter). Useful for
/// tests and for hosts that already hold decoded audio.
pub struct SliceSource<'a> {
    samples: &'a [f32],
    sample_rate: f32,
    chunk_len: usize,
    position: usize,
}

impl<'a> SliceSource<'a> {
    /// Create a source over `samples` yielding `chunk_len`-sized chunks
    pub fn new(samples: &'a [f32], sample_rate: f32, chunk_len: usize) -> Self {
        Self {
            samples,
            sample_rate,
            chunk_len: chunk_len.max(1),
            position: 0,
        }
    }
}

impl SampleSource for SliceSource<'_> {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn next_chunk(&mut self, chunk: &mut Vec<f32>) -> Option<f64> {
        if self.position >= self.samples.len() {
            return None;
        }

        let end = (self.position + self.chunk_len).min(self.samples.len());
        chunk.clear();
        chunk.extend_from_slice(&self.samples[self.position..end]);
        self.position = end;

        Some(self.position as f64 / self.samples.len() as f64)
    }
}
