use serde::Serialize;

use super::features::{Chroma, Mfcc};

/// One frame of the output contract.
///
/// Serialized field names are part of the wire format consumed by the
/// visualization client.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureRecord {
    /// Seconds from the start of the clip; sent separately as `times`
    #[serde(skip)]
    pub timestamp: f64,
    /// Peak-normalized RMS
    #[serde(rename = "vol")]
    pub volume: f32,
    /// Peak-normalized spectral centroid
    #[serde(rename = "cent")]
    pub centroid: f32,
    #[serde(rename = "beat")]
    pub is_beat: bool,
    /// Peak-normalized onset strength
    pub onset: f32,
    pub chroma: Chroma,
    pub mfcc: Mfcc,
    /// Clip-wide tempo, repeated on every record
    pub tempo: f64,
}

/// Finished analysis of one clip. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisResult {
    duration: f64,
    #[serde(rename = "data")]
    records: Vec<FeatureRecord>,
    times: Vec<f64>,
}

impl AnalysisResult {
    pub(super) fn new(duration: f64, records: Vec<FeatureRecord>, times: Vec<f64>) -> Self {
        Self {
            duration,
            records,
            times,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn tempo(&self) -> f64 {
        self.records.first().map_or(0.0, |r| r.tempo)
    }

    pub fn beat_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_beat).count()
    }
}
