//! Feature extraction modules
//!
//! Low-level signal representations consumed by the tempo detector:
//! - Narrow-band magnitude spectra via a sparse Fourier filterbank
//! - Onset-strength features (positive spectral flux, RMS envelope)
//! - Periodicity analysis (FFT autocorrelation, comb filtering)

pub mod filterbank;
pub mod onset;
pub mod period;
