use std::time::Instant;

use super::assemble::{assemble, FeatureSeries};
use super::beat;
use super::decode::DecodedAudio;
use super::features::{self, ChromaExtractor, MfccExtractor};
use super::framing::FrameGrid;
use super::normalize::peak_normalize;
use super::onset::onset_strength;
use super::result::AnalysisResult;
use super::spectrum::Spectrogram;
use super::waveform::Waveform;
use crate::config::AnalysisConfig;
use crate::error::Result;

/// Runs the full pipeline on one clip.
///
/// Synchronous and self-contained: every buffer is owned by this call and
/// dropped when it returns.
pub fn analyze(waveform: &Waveform, config: &AnalysisConfig) -> Result<AnalysisResult> {
    config.validate()?;
    let started = Instant::now();

    let sample_rate = waveform.sample_rate();
    let frame_length = config.frame_length;
    let hop_length = config.hop_length;

    let grid = FrameGrid::new(frame_length, hop_length)?;
    let frames = grid.frames(waveform);
    let frame_count = frames.len();
    log::debug!(
        "Pass 1: Framing {:.2}s ({} samples) into {} frames (L={}, H={})",
        waveform.duration_secs(),
        waveform.len(),
        frame_count,
        frame_length,
        hop_length
    );

    log::debug!("Pass 2: Spectral transform...");
    let spectrogram = Spectrogram::compute(&frames)?;
    log::debug!("  {} bins per frame", spectrogram.num_bins());

    log::debug!("Pass 3: Feature extraction...");
    let mut energy = features::energy_series(&frames);
    let mut centroid = features::centroid_series(&spectrogram, frame_length, sample_rate);
    let chroma = ChromaExtractor::new(frame_length, sample_rate).series(&spectrogram);
    let mfcc = MfccExtractor::new(config.n_mels, frame_length, sample_rate).series(&spectrogram);
    let mut onset = onset_strength(&spectrogram);

    log::debug!("Pass 4: Tempo & beat tracking...");
    let frame_rate = sample_rate as f64 / hop_length as f64;
    let tracking = beat::track(&onset, frame_rate, &config.beat_tracker());

    log::debug!("Pass 5: Normalization & assembly...");
    peak_normalize(&mut energy);
    peak_normalize(&mut centroid);
    peak_normalize(&mut onset);

    let series = FeatureSeries {
        energy,
        centroid,
        onset,
        chroma,
        mfcc,
    };
    let result = assemble(
        series,
        &tracking,
        frame_count,
        hop_length,
        sample_rate,
        waveform.len(),
    )?;

    if log::log_enabled!(log::Level::Debug) {
        let beat_times: Vec<String> = result
            .records()
            .iter()
            .filter(|r| r.is_beat)
            .map(|r| format!("{:.2}", r.timestamp))
            .collect();
        log::debug!("Beat times (s): [{}]", beat_times.join(", "));
    }

    log::info!(
        "Analyzed {:.2}s clip: {} frames, tempo={:.1} BPM, beats={} ({} ms)",
        result.duration(),
        frame_count,
        tracking.tempo,
        tracking.beats.len(),
        started.elapsed().as_millis()
    );

    Ok(result)
}

/// Mono-folds decoder output and analyses it.
pub fn analyze_decoded(audio: DecodedAudio, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let waveform = Waveform::try_from(audio)?;
    analyze(&waveform, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;

    fn tone(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| amplitude * (2.0 * std::f32::consts::PI * freq * n as f32 / sample_rate as f32).sin())
            .collect()
    }

    /// Decaying 2 kHz blips, the first at 0.25 s.
    fn click_track(bpm: f64, sample_rate: u32, seconds: f64) -> Vec<f32> {
        let len = (sample_rate as f64 * seconds) as usize;
        let click_len = sample_rate as usize / 100;
        let mut samples = vec![0.0f32; len];
        let mut t = 0.25;
        while t < seconds {
            let start = (t * sample_rate as f64).round() as usize;
            for k in 0..click_len {
                if let Some(s) = samples.get_mut(start + k) {
                    let envelope = 1.0 - k as f32 / click_len as f32;
                    *s = 0.8 * envelope * (2.0 * std::f32::consts::PI * 2000.0 * k as f32 / sample_rate as f32).sin();
                }
            }
            t += 60.0 / bpm;
        }
        samples
    }

    fn run(samples: Vec<f32>, sample_rate: u32) -> AnalysisResult {
        let wave = Waveform::new(samples, sample_rate).unwrap();
        analyze(&wave, &AnalysisConfig::default()).unwrap()
    }

    fn assert_peak_normalized(values: &[f32]) {
        let peak = values.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(peak == 0.0 || (peak - 1.0).abs() < 1e-6, "peak {}", peak);
    }

    #[test]
    fn one_second_clip_has_87_aligned_frames() {
        let result = run(tone(440.0, 0.5, 44100, 44100), 44100);
        assert_eq!(result.records().len(), 87);
        assert_eq!(result.times().len(), 87);
        assert!((result.duration() - 1.0).abs() < 1e-12);

        for pair in result.times().windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert!(*result.times().last().unwrap() <= result.duration());
    }

    #[test]
    fn silence_yields_zero_series_and_no_beats() {
        let result = run(vec![0.0; 30000], 22050);
        assert_eq!(result.tempo(), 0.0);
        assert_eq!(result.beat_count(), 0);
        for r in result.records() {
            assert_eq!(r.volume, 0.0);
            assert_eq!(r.centroid, 0.0);
            assert_eq!(r.onset, 0.0);
            assert_eq!(r.tempo, 0.0);
            assert!(!r.is_beat);
        }
    }

    #[test]
    fn scalar_series_are_peak_normalized() {
        let result = run(click_track(120.0, 22050, 3.0), 22050);
        let vol: Vec<f32> = result.records().iter().map(|r| r.volume).collect();
        let cent: Vec<f32> = result.records().iter().map(|r| r.centroid).collect();
        let onset: Vec<f32> = result.records().iter().map(|r| r.onset).collect();
        assert_peak_normalized(&vol);
        assert_peak_normalized(&cent);
        assert_peak_normalized(&onset);
        assert!(vol.iter().any(|&v| v == 1.0));
    }

    #[test]
    fn chroma_and_mfcc_keep_natural_units() {
        let result = run(tone(440.0, 0.5, 44100, 44100), 44100);
        let mid = &result.records()[40];
        // Summed magnitudes of a half-amplitude tone are far above 1
        assert!(mid.chroma[9] > 10.0);
        assert!(mid.mfcc.iter().any(|c| c.abs() > 1.0));
    }

    #[test]
    fn sine_tone_has_stable_raw_centroid() {
        let sr = 44100;
        let wave = Waveform::new(tone(440.0, 0.5, sr, sr as usize), sr).unwrap();
        let frames = FrameGrid::new(2048, 512).unwrap().frames(&wave);
        let spec = Spectrogram::compute(&frames).unwrap();
        let centroid = features::centroid_series(&spec, 2048, sr);
        for c in &centroid[4..centroid.len() - 4] {
            assert!((c - 440.0).abs() < 25.0, "centroid {}", c);
        }
    }

    #[test]
    fn stereo_fold_halves_energy() {
        let sr = 22050;
        let tone_samples = tone(330.0, 0.6, sr, 11025);
        let interleaved: Vec<f32> = tone_samples.iter().flat_map(|&s| [0.0, s]).collect();

        let grid = FrameGrid::new(2048, 512).unwrap();
        let stereo = Waveform::from_interleaved(&interleaved, 2, sr).unwrap();
        let mono = Waveform::new(tone_samples, sr).unwrap();
        let stereo_energy = features::energy_series(&grid.frames(&stereo));
        let mono_energy = features::energy_series(&grid.frames(&mono));

        for (s, m) in stereo_energy.iter().zip(&mono_energy) {
            assert!((s - 0.5 * m).abs() < 1e-6, "{} vs {}", s, m);
        }
    }

    #[test]
    fn click_track_tempo_and_beats() {
        let sr = 44100;
        let result = run(click_track(120.0, sr, 10.0), sr);
        let tempo = result.tempo();
        assert!((tempo - 120.0).abs() <= 2.0, "tempo {}", tempo);

        let beats: Vec<usize> = result
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_beat)
            .map(|(i, _)| i)
            .collect();
        assert!(beats.len() >= 15, "only {} beats", beats.len());

        // 0.5 s at 44100 / 512 is about 43 frames
        for pair in beats.windows(2) {
            let gap = pair[1] - pair[0];
            assert!((40..=46).contains(&gap), "gap {}", gap);
        }
    }

    #[test]
    fn slower_click_track() {
        let sr = 44100;
        let result = run(click_track(90.0, sr, 12.0), sr);
        assert!((result.tempo() - 90.0).abs() <= 2.0, "tempo {}", result.tempo());
    }

    #[test]
    fn click_tempo_sweep() {
        let sr = 44100;
        for bpm in [60.0, 90.0, 120.0, 150.0, 170.0, 200.0, 240.0] {
            let result = run(click_track(bpm, sr, 10.0), sr);
            assert!((result.tempo() - bpm).abs() <= 2.0, "{} BPM clicks: {}", bpm, result.tempo());
        }
    }

    #[test]
    fn output_is_deterministic() {
        let samples = click_track(100.0, 22050, 4.0);
        let a = serde_json::to_vec(&run(samples.clone(), 22050)).unwrap();
        let b = serde_json::to_vec(&run(samples, 22050)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn beats_are_increasing_and_in_range() {
        let result = run(click_track(140.0, 22050, 6.0), 22050);
        let beats: Vec<usize> = result
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_beat)
            .map(|(i, _)| i)
            .collect();
        assert!(!beats.is_empty());
        assert!(beats.windows(2).all(|p| p[1] > p[0]));
        assert!(*beats.last().unwrap() < result.records().len());
    }

    #[test]
    fn tiny_clip_still_produces_one_frame() {
        let result = run(vec![0.1, -0.1, 0.2], 8000);
        assert_eq!(result.records().len(), 1);
        assert_eq!(result.tempo(), 0.0);
    }

    #[test]
    fn invalid_config_is_rejected_before_work() {
        let wave = Waveform::new(vec![0.0; 1000], 8000).unwrap();
        let config = AnalysisConfig {
            hop_length: 0,
            ..Default::default()
        };
        assert!(matches!(analyze(&wave, &config), Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn decoded_stereo_is_folded() {
        let audio = DecodedAudio {
            samples: vec![0.2; 4096],
            channels: 2,
            sample_rate: 16000,
        };
        let result = analyze_decoded(audio, &AnalysisConfig::default()).unwrap();
        assert_eq!(result.records().len(), 2048 / 512 + 1);
    }
}
