//! Per-frame feature extractors.
//!
//! Energy reads the raw frame samples; centroid, chroma and MFCC read the
//! shared spectrogram. No extractor depends on another's output.

use super::framing::Frames;
use super::spectrum::Spectrogram;
use crate::dsp::filterbank::{bin_frequency, ChromaMap, DctBasis, MelFilterbank, PITCH_CLASSES};

pub const MFCC_COEFFICIENTS: usize = 13;

/// Floor applied to mel energies before taking the log.
const MEL_ENERGY_FLOOR: f32 = 1e-10;

pub type Chroma = [f32; PITCH_CLASSES];
pub type Mfcc = [f32; MFCC_COEFFICIENTS];

/// Root-mean-square of unwindowed samples.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / frame.len() as f64).sqrt() as f32
}

/// Magnitude-weighted mean frequency in Hz; 0 for a silent frame.
pub fn spectral_centroid(magnitudes: &[f32], frame_length: usize, sample_rate: u32) -> f32 {
    let total: f64 = magnitudes.iter().map(|&m| m as f64).sum();
    if total == 0.0 {
        return 0.0;
    }
    let weighted: f64 = magnitudes
        .iter()
        .enumerate()
        .map(|(k, &m)| bin_frequency(k, frame_length, sample_rate) * m as f64)
        .sum();
    (weighted / total) as f32
}

pub fn energy_series(frames: &Frames) -> Vec<f32> {
    frames.iter().map(rms).collect()
}

pub fn centroid_series(spectrogram: &Spectrogram, frame_length: usize, sample_rate: u32) -> Vec<f32> {
    spectrogram
        .iter()
        .map(|mags| spectral_centroid(mags, frame_length, sample_rate))
        .collect()
}

/// Octave-folded magnitude per pitch class, C at index 0.
pub struct ChromaExtractor {
    map: ChromaMap,
}

impl ChromaExtractor {
    pub fn new(frame_length: usize, sample_rate: u32) -> Self {
        Self {
            map: ChromaMap::new(frame_length, sample_rate),
        }
    }

    pub fn extract(&self, magnitudes: &[f32]) -> Chroma {
        self.map.apply(magnitudes)
    }

    pub fn series(&self, spectrogram: &Spectrogram) -> Vec<Chroma> {
        spectrogram.iter().map(|mags| self.extract(mags)).collect()
    }
}

/// Mel power spectrum → dB → DCT-II, keeping the first 13 coefficients.
pub struct MfccExtractor {
    mel: MelFilterbank,
    dct: DctBasis,
}

impl MfccExtractor {
    pub fn new(n_mels: usize, frame_length: usize, sample_rate: u32) -> Self {
        let mel = MelFilterbank::new(n_mels, frame_length, sample_rate);
        let dct = DctBasis::new(mel.len(), MFCC_COEFFICIENTS);
        Self { mel, dct }
    }

    pub fn extract(&self, magnitudes: &[f32]) -> Mfcc {
        let power: Vec<f32> = magnitudes.iter().map(|m| m * m).collect();
        let log_mel: Vec<f32> = self
            .mel
            .apply(&power)
            .into_iter()
            .map(|e| 10.0 * e.max(MEL_ENERGY_FLOOR).log10())
            .collect();

        let mut mfcc = [0.0f32; MFCC_COEFFICIENTS];
        mfcc.copy_from_slice(&self.dct.apply(&log_mel));
        mfcc
    }

    pub fn series(&self, spectrogram: &Spectrogram) -> Vec<Mfcc> {
        spectrogram.iter().map(|mags| self.extract(mags)).collect()
    }
}
