//! Global tempo estimation and dynamic-programming beat placement.
//!
//! # Algorithm
//!
//! 1. **Tempo**: autocorrelate the mean-removed onset envelope over the lags
//!    admitted by the BPM range. Each lag's strength is the sum over itself
//!    and its two neighbours, so a period that falls between two integer lags
//!    is not split in half. Strengths are weighted with a log-normal window
//!    centred on 120 BPM (one octave wide) and the highest local peak wins.
//!    The window favours whichever octave is nearer 120 BPM, so the pick is
//!    then halved while the unweighted strength near half its lag stays within
//!    `HALF_LAG_RATIO` of its own. The final lag is refined with parabolic
//!    interpolation on the raw autocorrelation.
//! 2. **Beats**: forward pass over frames keeping, per frame, the best
//!    cumulative score and a back-pointer. A frame may extend a chain from a
//!    predecessor `[P/2, 2P]` frames earlier, paying
//!    `tightness * ln(gap / P)^2`; otherwise it starts a new chain. The beat
//!    set is read back from the best-scoring frame.

/// Centre of the tempo weighting window.
const PRIOR_CENTRE_BPM: f64 = 120.0;
/// Width of the tempo weighting window, in octaves.
const PRIOR_OCTAVES: f64 = 1.0;
/// Share of a lag's strength its half lag needs to be taken as the true period.
const HALF_LAG_RATIO: f64 = 0.8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatTrackerConfig {
    pub min_bpm: f64,
    pub max_bpm: f64,
    /// Weight of the tempo-regularity penalty against onset strength
    pub tightness: f64,
}

impl Default for BeatTrackerConfig {
    fn default() -> Self {
        Self {
            min_bpm: 30.0,
            max_bpm: 300.0,
            tightness: 100.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BeatTracking {
    /// Beats per minute; 0 when no tempo could be established
    pub tempo: f64,
    /// Strictly increasing frame indices
    pub beats: Vec<usize>,
}

/// Tempo and beat frames from an onset envelope sampled at `frame_rate` Hz.
pub fn track(onset: &[f32], frame_rate: f64, config: &BeatTrackerConfig) -> BeatTracking {
    let tempo = match estimate_tempo(onset, frame_rate, config) {
        Some(t) => t,
        None => return BeatTracking::default(),
    };
    let beats = place_beats(onset, frame_rate, tempo, config.tightness);
    BeatTracking { tempo, beats }
}

/// `None` for an all-zero envelope or when no admissible lag fits the clip.
pub fn estimate_tempo(onset: &[f32], frame_rate: f64, config: &BeatTrackerConfig) -> Option<f64> {
    if onset.iter().all(|&o| o == 0.0) {
        return None;
    }

    let n = onset.len();
    let min_lag = ((60.0 * frame_rate / config.max_bpm).ceil() as usize).max(1);
    let max_lag = ((60.0 * frame_rate / config.min_bpm).floor() as usize).min(n - 1);
    if min_lag > max_lag {
        log::debug!("Clip too short for tempo: {} frames, min lag {}", n, min_lag);
        return None;
    }

    // One extra lag on the right for the peak test and interpolation
    let top = (max_lag + 1).min(n - 1);
    let raw = autocorrelation(onset, top);
    let strength = lag_strength(&raw);
    let weighted = tempo_weighted(&raw, &strength, frame_rate);

    let is_peak = |lag: usize| {
        weighted[lag] >= weighted[lag - 1] && (lag >= top || weighted[lag] >= weighted[lag + 1])
    };
    let mut best = strongest_lag(&weighted, (min_lag..=max_lag).filter(|&lag| is_peak(lag)))
        .or_else(|| strongest_lag(&weighted, min_lag..=max_lag))?;

    // A pulse train also correlates at every multiple of its period
    while strength[best] > 0.0 {
        let lo = (best / 2).saturating_sub(1).max(min_lag);
        let hi = ((best + 1) / 2 + 1).min(max_lag).min(best - 1);
        match strongest_lag(&strength, lo..=hi) {
            Some(half) if strength[half] >= HALF_LAG_RATIO * strength[best] => best = half,
            _ => break,
        }
    }

    let centre = strongest_lag(&raw, best.saturating_sub(1).max(1)..=(best + 1).min(top - 1))
        .unwrap_or(best);
    let mut lag = centre as f64;
    if centre >= 1 && centre < top {
        let (a, b, c) = (raw[centre - 1], raw[centre], raw[centre + 1]);
        let curvature = a - 2.0 * b + c;
        if curvature < 0.0 {
            lag += (0.5 * (a - c) / curvature).clamp(-0.5, 0.5);
        }
    }

    let tempo = (60.0 * frame_rate / lag).clamp(config.min_bpm, config.max_bpm);
    log::debug!("Tempo: lag {} ({:.2} refined) -> {:.2} BPM", best, lag, tempo);
    Some(tempo)
}

/// Highest-valued lag; the earlier lag wins ties.
fn strongest_lag(values: &[f64], lags: impl Iterator<Item = usize>) -> Option<usize> {
    lags.fold(None, |best, lag| match best {
        Some(b) if values[lag] <= values[b] => Some(b),
        _ => Some(lag),
    })
}

/// Autocorrelation of the mean-removed envelope for lags `0..=max_lag`.
fn autocorrelation(onset: &[f32], max_lag: usize) -> Vec<f64> {
    let n = onset.len();
    let mean = onset.iter().map(|&o| o as f64).sum::<f64>() / n as f64;
    let centred: Vec<f64> = onset.iter().map(|&o| o as f64 - mean).collect();

    (0..=max_lag)
        .map(|lag| {
            centred[..n - lag]
                .iter()
                .zip(&centred[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// Three-lag sum around each lag. Lag 0 is left out of every sum.
fn lag_strength(raw: &[f64]) -> Vec<f64> {
    let top = raw.len() - 1;
    (0..=top)
        .map(|lag| {
            if lag == 0 {
                return 0.0;
            }
            raw[(lag - 1).max(1)..=(lag + 1).min(top)].iter().sum()
        })
        .collect()
}

/// Strengths scaled by the log-normal tempo window. Lag 0 keeps the raw
/// energy so lag 1 is never a peak against it.
fn tempo_weighted(raw: &[f64], strength: &[f64], frame_rate: f64) -> Vec<f64> {
    strength
        .iter()
        .enumerate()
        .map(|(lag, &s)| {
            if lag == 0 {
                return raw[0];
            }
            let bpm = 60.0 * frame_rate / lag as f64;
            let octaves = (bpm / PRIOR_CENTRE_BPM).log2() / PRIOR_OCTAVES;
            s * (-0.5 * octaves * octaves).exp()
        })
        .collect()
}

/// Dynamic-programming beat placement for a known tempo.
pub fn place_beats(onset: &[f32], frame_rate: f64, tempo: f64, tightness: f64) -> Vec<usize> {
    let n = onset.len();
    let peak = onset.iter().copied().fold(0.0f32, f32::max);
    if n == 0 || peak <= 0.0 || tempo <= 0.0 {
        return Vec::new();
    }

    let period = 60.0 * frame_rate / tempo;
    let max_back = (2.0 * period).round() as usize;
    let min_back = ((period / 2.0).round() as usize).max(1);

    let mut score = vec![0.0f64; n];
    let mut back: Vec<Option<usize>> = vec![None; n];

    for i in 0..n {
        let local = (onset[i] / peak) as f64;

        let mut best: Option<(usize, f64)> = None;
        if i >= min_back {
            for j in i.saturating_sub(max_back)..=i - min_back {
                let deviation = ((i - j) as f64 / period).ln();
                let candidate = score[j] - tightness * deviation * deviation;
                // Strict comparison keeps the earlier predecessor on ties
                if best.map_or(true, |(_, s)| candidate > s) {
                    best = Some((j, candidate));
                }
            }
        }

        match best {
            Some((j, s)) if s > 0.0 => {
                score[i] = local + s;
                back[i] = Some(j);
            }
            _ => score[i] = local,
        }
    }

    let mut terminal = 0;
    for i in 1..n {
        if score[i] > score[terminal] {
            terminal = i;
        }
    }

    let mut beats = Vec::new();
    let mut cursor = Some(terminal);
    while let Some(i) = cursor {
        beats.push(i);
        cursor = back[i];
    }
    beats.reverse();
    beats
}
