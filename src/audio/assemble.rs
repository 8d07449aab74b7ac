//! Frame-to-time mapping and final record assembly.

use super::beat::BeatTracking;
use super::features::{Chroma, Mfcc};
use super::result::{AnalysisResult, FeatureRecord};
use crate::error::{AnalysisError, Result};

/// Every per-frame series produced by one run, before assembly.
pub struct FeatureSeries {
    pub energy: Vec<f32>,
    pub centroid: Vec<f32>,
    pub onset: Vec<f32>,
    pub chroma: Vec<Chroma>,
    pub mfcc: Vec<Mfcc>,
}

impl FeatureSeries {
    fn check_lengths(&self, frame_count: usize) -> Result<()> {
        let lengths = [
            ("energy", self.energy.len()),
            ("centroid", self.centroid.len()),
            ("onset", self.onset.len()),
            ("chroma", self.chroma.len()),
            ("mfcc", self.mfcc.len()),
        ];
        for (name, len) in lengths {
            if len != frame_count {
                return Err(AnalysisError::InternalConsistency(format!(
                    "{} series has {} frames, expected {}",
                    name, len, frame_count
                )));
            }
        }
        Ok(())
    }
}

/// `times[i] = i * H / sample_rate`
pub fn frame_times(frame_count: usize, hop_length: usize, sample_rate: u32) -> Vec<f64> {
    (0..frame_count)
        .map(|i| (i * hop_length) as f64 / sample_rate as f64)
        .collect()
}

/// Zips the series into records, attaching tempo and beat membership.
pub fn assemble(
    series: FeatureSeries,
    tracking: &BeatTracking,
    frame_count: usize,
    hop_length: usize,
    sample_rate: u32,
    num_samples: usize,
) -> Result<AnalysisResult> {
    series.check_lengths(frame_count)?;

    let mut is_beat = vec![false; frame_count];
    for &b in &tracking.beats {
        let slot = is_beat.get_mut(b).ok_or_else(|| {
            AnalysisError::InternalConsistency(format!(
                "beat at frame {} outside {} frames",
                b, frame_count
            ))
        })?;
        *slot = true;
    }

    let times = frame_times(frame_count, hop_length, sample_rate);

    let FeatureSeries {
        energy,
        centroid,
        onset,
        chroma,
        mfcc,
    } = series;

    let records = energy
        .into_iter()
        .zip(centroid)
        .zip(onset)
        .zip(chroma)
        .zip(mfcc)
        .enumerate()
        .map(|(i, ((((volume, centroid), onset), chroma), mfcc))| FeatureRecord {
            timestamp: times[i],
            volume,
            centroid,
            is_beat: is_beat[i],
            onset,
            chroma,
            mfcc,
            tempo: tracking.tempo,
        })
        .collect();

    let duration = num_samples as f64 / sample_rate as f64;
    Ok(AnalysisResult::new(duration, records, times))
}
