//! Tempo analysis orchestration
//!
//! - Streaming detector (block buffering through candidate ranking)
//! - Cross-window vote aggregation with early stop
//! - Long-recording scan driver over a sample source

pub mod aggregator;
pub mod detector;
pub mod scan;
