use super::spectrum::Spectrogram;

/// Half-wave rectified spectral flux between consecutive frames.
///
/// `onset[0]` is 0; each later entry sums the bins whose magnitude grew.
pub fn onset_strength(spectrogram: &Spectrogram) -> Vec<f32> {
    let mut onset = vec![0.0f32; spectrogram.len()];
    for i in 1..spectrogram.len() {
        onset[i] = spectrogram
            .frame(i)
            .iter()
            .zip(spectrogram.frame(i - 1))
            .map(|(cur, prev)| (cur - prev).max(0.0))
            .sum();
    }
    onset
}
