//! Sample input boundary
//!
//! Audio decoding itself is out of scope; this module defines the
//! [`source::SampleSource`] trait hosts implement to feed the scan driver.

pub mod source;
