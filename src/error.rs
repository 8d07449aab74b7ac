//! Error types for the analysis pipeline

use thiserror::Error;

/// Errors surfaced by decoding and analysis.
///
/// A request either yields a complete result or one of these; there are no
/// partial results.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Malformed or unsupported audio container, passed through from the decoder
    #[error("Decode error: {0}")]
    Decode(String),

    /// The waveform has no samples after mono folding
    #[error("Audio contains no samples")]
    EmptyAudio,

    /// Sample rate must be a positive number of Hz
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// Channel count or buffer shape does not describe a valid signal
    #[error("Invalid channel layout: {0}")]
    InvalidChannelLayout(String),

    /// Decoder produced NaN or infinite samples
    #[error("Audio contains non-finite samples")]
    NonFiniteSamples,

    /// Analysis parameters out of range
    #[error("Invalid analysis configuration: {0}")]
    InvalidConfig(String),

    /// Feature series disagree on frame count. Always a pipeline bug.
    #[error("Internal consistency fault: {0}")]
    InternalConsistency(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
