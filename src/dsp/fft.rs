//! In-place radix-2 FFT
//!
//! Twiddle factors and the bit-reversal table are built once per size and
//! reused for every frame of a clip.

use num_complex::Complex;

use crate::error::{AnalysisError, Result};

/// Forward FFT plan for one power-of-two size.
pub struct Fft {
    size: usize,
    twiddles: Vec<Complex<f32>>,
    bit_reverse: Vec<usize>,
}

impl Fft {
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(AnalysisError::InvalidConfig(format!(
                "FFT size must be a power of two >= 2, got {}",
                size
            )));
        }

        // Computed in f64 so large sizes keep full f32 accuracy
        let twiddles = (0..size / 2)
            .map(|k| {
                let angle = -2.0 * std::f64::consts::PI * k as f64 / size as f64;
                Complex::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();

        let bits = size.trailing_zeros();
        let bit_reverse = (0..size)
            .map(|i| i.reverse_bits() >> (usize::BITS - bits))
            .collect();

        Ok(Self {
            size,
            twiddles,
            bit_reverse,
        })
    }

    /// Forward transform, in place. `buffer.len()` must equal the plan size.
    pub fn process(&self, buffer: &mut [Complex<f32>]) {
        debug_assert_eq!(buffer.len(), self.size, "FFT buffer length mismatch");

        for i in 0..self.size {
            let j = self.bit_reverse[i];
            if i < j {
                buffer.swap(i, j);
            }
        }

        let mut len = 2;
        while len <= self.size {
            let half = len / 2;
            let stride = self.size / len;
            for start in (0..self.size).step_by(len) {
                for k in 0..half {
                    let w = self.twiddles[k * stride];
                    let u = buffer[start + k];
                    let v = buffer[start + k + half] * w;
                    buffer[start + k] = u + v;
                    buffer[start + k + half] = u - v;
                }
            }
            len <<= 1;
        }
    }

    /// Magnitudes of bins `0..=size/2` for a real input frame.
    ///
    /// `scratch` is resized as needed so callers can reuse one allocation
    /// across frames.
    pub fn real_magnitudes(&self, input: &[f32], scratch: &mut Vec<Complex<f32>>) -> Vec<f32> {
        scratch.clear();
        scratch.extend(input.iter().map(|&s| Complex::new(s, 0.0)));
        scratch.resize(self.size, Complex::new(0.0, 0.0));
        self.process(scratch);
        scratch[..=self.size / 2].iter().map(|c| c.norm()).collect()
    }
}
