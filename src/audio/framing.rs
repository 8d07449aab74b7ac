//! Centered framing with reflected edges.
//!
//! The waveform is padded by `L/2` mirrored samples on both sides, so frame
//! `i` is centered on original sample `i * H`. Every feature series in a run
//! has exactly `frame_count` entries.

use super::waveform::Waveform;
use crate::error::{AnalysisError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameGrid {
    frame_length: usize,
    hop_length: usize,
}

impl FrameGrid {
    pub fn new(frame_length: usize, hop_length: usize) -> Result<Self> {
        if frame_length < 2 || frame_length % 2 != 0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "frame length must be even and at least 2, got {}",
                frame_length
            )));
        }
        if hop_length == 0 {
            return Err(AnalysisError::InvalidConfig("hop length must be positive".to_string()));
        }
        Ok(Self {
            frame_length,
            hop_length,
        })
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// `floor(N / H) + 1`
    pub fn frame_count(&self, num_samples: usize) -> usize {
        num_samples / self.hop_length + 1
    }

    pub fn frames(&self, waveform: &Waveform) -> Frames {
        let samples = waveform.samples();
        let pad = self.frame_length / 2;
        let n = samples.len() as isize;

        let padded = (0..samples.len() + 2 * pad)
            .map(|p| samples[reflect_index(p as isize - pad as isize, n)])
            .collect();

        Frames {
            padded,
            grid: *self,
            count: self.frame_count(samples.len()),
        }
    }
}

/// Mirror an out-of-range index back into `0..n` without repeating the edge sample.
fn reflect_index(i: isize, n: isize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    (if m >= n { period - m } else { m }) as usize
}

/// The framed view of one waveform.
pub struct Frames {
    padded: Vec<f32>,
    grid: FrameGrid,
    count: usize,
}

impl Frames {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn grid(&self) -> FrameGrid {
        self.grid
    }

    pub fn get(&self, index: usize) -> &[f32] {
        let start = index * self.grid.hop_length;
        &self.padded[start..start + self.grid.frame_length]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.count).map(move |i| self.get(i))
    }
}
