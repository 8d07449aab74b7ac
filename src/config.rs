use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::beat::BeatTrackerConfig;
use crate::error::AnalysisError;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Pipeline parameters. Fixed per process; every clip is analysed with the same grid.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    #[serde(default = "default_frame_length")]
    pub frame_length: usize,
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
    #[serde(default = "default_n_mels")]
    pub n_mels: usize,
    #[serde(default = "default_min_bpm")]
    pub min_bpm: f64,
    #[serde(default = "default_max_bpm")]
    pub max_bpm: f64,
    #[serde(default = "default_tightness")]
    pub tightness: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_length: default_frame_length(),
            hop_length: default_hop_length(),
            n_mels: default_n_mels(),
            min_bpm: default_min_bpm(),
            max_bpm: default_max_bpm(),
            tightness: default_tightness(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: default_allowed_origins(),
            max_upload_bytes: default_max_upload_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.frame_length < 16 || !self.frame_length.is_power_of_two() {
            return Err(AnalysisError::InvalidConfig(format!(
                "frame_length must be a power of two >= 16, got {}",
                self.frame_length
            )));
        }
        if self.hop_length == 0 {
            return Err(AnalysisError::InvalidConfig("hop_length must be positive".to_string()));
        }
        if !(20..=128).contains(&self.n_mels) {
            return Err(AnalysisError::InvalidConfig(format!(
                "n_mels must be in 20..=128, got {}",
                self.n_mels
            )));
        }
        if !(self.min_bpm > 0.0 && self.max_bpm > self.min_bpm && self.max_bpm.is_finite()) {
            return Err(AnalysisError::InvalidConfig(format!(
                "invalid BPM range [{}, {}]",
                self.min_bpm, self.max_bpm
            )));
        }
        if !(self.tightness >= 0.0 && self.tightness.is_finite()) {
            return Err(AnalysisError::InvalidConfig(format!(
                "tightness must be a non-negative number, got {}",
                self.tightness
            )));
        }
        Ok(())
    }

    pub fn beat_tracker(&self) -> BeatTrackerConfig {
        BeatTrackerConfig {
            min_bpm: self.min_bpm,
            max_bpm: self.max_bpm,
            tightness: self.tightness,
        }
    }
}

fn default_frame_length() -> usize { 2048 }
fn default_hop_length() -> usize { 512 }
fn default_n_mels() -> usize { 40 }
fn default_min_bpm() -> f64 { 30.0 }
fn default_max_bpm() -> f64 { 300.0 }
fn default_tightness() -> f64 { 100.0 }
fn default_bind() -> String { "127.0.0.1:8000".into() }
fn default_allowed_origins() -> Vec<String> { vec!["http://localhost:5173".into()] }
fn default_max_upload_bytes() -> usize { 50 * 1024 * 1024 }
fn default_request_timeout_secs() -> u64 { 120 }
fn default_max_concurrent_jobs() -> usize { 4 }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Explicit path, else `beatscope.toml` in the working directory, else the
/// per-user config locations.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("beatscope.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("beatscope").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("beatscope").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
