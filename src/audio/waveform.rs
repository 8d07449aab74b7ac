use super::decode::DecodedAudio;
use crate::error::{AnalysisError, Result};

/// Validated mono signal owned by one analysis run.
#[derive(Clone, Debug)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Mono samples, validated as-is.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate(sample_rate));
        }
        if samples.is_empty() {
            return Err(AnalysisError::EmptyAudio);
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(AnalysisError::NonFiniteSamples);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Folds an interleaved buffer to mono by averaging each sample frame.
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(AnalysisError::InvalidChannelLayout("zero channels".to_string()));
        }
        if samples.len() % channels != 0 {
            return Err(AnalysisError::InvalidChannelLayout(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }

        let mono = if channels == 1 {
            samples.to_vec()
        } else {
            samples
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };
        Self::new(mono, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

impl TryFrom<DecodedAudio> for Waveform {
    type Error = AnalysisError;

    fn try_from(audio: DecodedAudio) -> Result<Self> {
        if audio.channels == 1 {
            return Self::new(audio.samples, audio.sample_rate);
        }
        Self::from_interleaved(&audio.samples, audio.channels, audio.sample_rate)
    }
}
