//! Fixed projections applied to magnitude spectra: mel triangles, the
//! chroma bin-to-pitch-class map and the DCT-II basis used for MFCCs.

/// Number of pitch classes in a chroma vector. Class 0 is C, class 9 is A.
pub const PITCH_CLASSES: usize = 12;

/// Bins below this frequency carry no usable pitch and are left out of chroma.
pub const CHROMA_MIN_HZ: f64 = 20.0;

const A4_HZ: f64 = 440.0;
const A4_MIDI: f64 = 69.0;

pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Pitch class of a frequency, folded into one octave.
pub fn pitch_class(hz: f64) -> usize {
    let midi = A4_MIDI + 12.0 * (hz / A4_HZ).log2();
    (midi.round() as i64).rem_euclid(PITCH_CLASSES as i64) as usize
}

/// Centre frequency of FFT bin `k`.
pub fn bin_frequency(k: usize, frame_length: usize, sample_rate: u32) -> f64 {
    k as f64 * sample_rate as f64 / frame_length as f64
}

/// Triangular mel filterbank spanning 0 Hz to Nyquist.
pub struct MelFilterbank {
    /// One row per filter, `frame_length / 2 + 1` weights each
    weights: Vec<Vec<f32>>,
}

impl MelFilterbank {
    pub fn new(n_mels: usize, frame_length: usize, sample_rate: u32) -> Self {
        let n_bins = frame_length / 2 + 1;
        let max_mel = hz_to_mel(sample_rate as f64 / 2.0);
        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
            .collect();

        let weights = (0..n_mels)
            .map(|m| {
                let (lower, centre, upper) = (edges[m], edges[m + 1], edges[m + 2]);
                (0..n_bins)
                    .map(|k| {
                        let f = bin_frequency(k, frame_length, sample_rate);
                        let rising = (f - lower) / (centre - lower);
                        let falling = (upper - f) / (upper - centre);
                        rising.min(falling).max(0.0) as f32
                    })
                    .collect()
            })
            .collect();

        Self { weights }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weighted sum of `spectrum` under each filter.
    pub fn apply(&self, spectrum: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .map(|row| row.iter().zip(spectrum).map(|(w, s)| w * s).sum())
            .collect()
    }
}

/// Assigns every spectrum bin to at most one pitch class.
pub struct ChromaMap {
    bin_class: Vec<Option<usize>>,
}

impl ChromaMap {
    pub fn new(frame_length: usize, sample_rate: u32) -> Self {
        let bin_class = (0..=frame_length / 2)
            .map(|k| {
                let f = bin_frequency(k, frame_length, sample_rate);
                (f >= CHROMA_MIN_HZ).then(|| pitch_class(f))
            })
            .collect();
        Self { bin_class }
    }

    /// Sums magnitudes per pitch class.
    pub fn apply(&self, magnitudes: &[f32]) -> [f32; PITCH_CLASSES] {
        let mut chroma = [0.0f32; PITCH_CLASSES];
        for (class, &mag) in self.bin_class.iter().zip(magnitudes) {
            if let Some(c) = class {
                chroma[*c] += mag;
            }
        }
        chroma
    }
}

/// Orthonormal DCT-II, truncated to the first `n_outputs` coefficients.
pub struct DctBasis {
    rows: Vec<Vec<f32>>,
}

impl DctBasis {
    pub fn new(n_inputs: usize, n_outputs: usize) -> Self {
        let n = n_inputs as f64;
        let rows = (0..n_outputs)
            .map(|k| {
                let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
                (0..n_inputs)
                    .map(|i| {
                        let angle = std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n);
                        (scale * angle.cos()) as f32
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn apply(&self, input: &[f32]) -> Vec<f32> {
        self.rows
            .iter()
            .map(|row| row.iter().zip(input).map(|(b, x)| b * x).sum())
            .collect()
    }
}
