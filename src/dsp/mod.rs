//! Numeric building blocks owned by the crate: FFT, windows, filterbanks.

pub mod fft;
pub mod filterbank;
pub mod window;
