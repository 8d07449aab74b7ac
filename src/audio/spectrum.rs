use num_complex::Complex;

use super::framing::Frames;
use crate::dsp::fft::Fft;
use crate::dsp::window::hann_window;
use crate::error::Result;

/// Hann-windowed magnitude spectra, one row of `L/2 + 1` bins per frame.
pub struct Spectrogram {
    frames: Vec<Vec<f32>>,
}

impl Spectrogram {
    pub fn compute(frames: &Frames) -> Result<Self> {
        let frame_length = frames.grid().frame_length();
        let fft = Fft::new(frame_length)?;
        let hann = hann_window(frame_length);

        let mut windowed = vec![0.0f32; frame_length];
        let mut scratch: Vec<Complex<f32>> = Vec::with_capacity(frame_length);

        let spectra = frames
            .iter()
            .map(|frame| {
                for ((w, &s), &h) in windowed.iter_mut().zip(frame).zip(&hann) {
                    *w = s * h;
                }
                fft.real_magnitudes(&windowed, &mut scratch)
            })
            .collect();

        Ok(Self { frames: spectra })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn num_bins(&self) -> usize {
        self.frames.first().map_or(0, Vec::len)
    }

    pub fn frame(&self, index: usize) -> &[f32] {
        &self.frames[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.frames.iter().map(Vec::as_slice)
    }
}
