//! Cross-window vote aggregation
//!
//! Tallies rounded BPM estimates sampled across many analysis windows of a
//! long recording and converges on one confident value, optionally
//! signalling early stop once enough windows agree.

/// Tally of repeated tempo estimates with optional early stop
///
/// Keys are BPM values rounded to the nearest whole number. The tally is
/// insertion-ordered so ties among equally frequent values resolve
/// deterministically to the first-seen value.
pub struct ResultAggregator {
    // (rounded BPM, occurrence count), in first-seen order
    tally: Vec<(i64, u32)>,
    matches_required: Option<u32>,
    latched: Option<f64>,
}

impl ResultAggregator {
    /// Create an aggregator; `matches_required` enables early stop once any
    /// single value has been appended that many times
    pub fn new(matches_required: Option<u32>) -> Self {
        Self {
            tally: Vec::new(),
            matches_required,
            latched: None,
        }
    }

    /// Record one estimate; returns true when the caller should stop scanning
    ///
    /// The estimate is rounded to the nearest whole BPM before tallying.
    /// When a threshold is configured and this value's count reaches it,
    /// the value is latched as the suggested result and `true` is returned.
    pub fn append(&mut self, bpm: f64) -> bool {
        let key = bpm.round() as i64;

        let count = match self.tally.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => {
                *count += 1;
                *count
            }
            None => {
                self.tally.push((key, 1));
                1
            }
        };

        if let Some(required) = self.matches_required {
            if count >= required {
                log::debug!("Early stop: {} BPM reached {} matches", key, count);
                self.latched = Some(key as f64);
                return true;
            }
        }

        false
    }

    /// Number of estimates appended so far
    pub fn len(&self) -> usize {
        self.tally.iter().map(|(_, count)| *count as usize).sum()
    }

    /// Whether no estimates have been appended
    pub fn is_empty(&self) -> bool {
        self.tally.is_empty()
    }

    /// Most likely tempo: the latched early-stop value if present, else the
    /// most frequent tally entry (first-seen wins among equal counts), else
    /// None when nothing was ever appended
    pub fn most_likely(&self) -> Option<f64> {
        if let Some(latched) = self.latched {
            return Some(latched);
        }

        let mut entries = self.tally.clone();
        // Stable sort keeps insertion order among equal counts.
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.first().map(|(key, _)| *key as f64)
    }
}
