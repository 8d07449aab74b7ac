mod api;
mod audio;
mod cli;
mod config;
mod dsp;
mod error;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};

use audio::result::AnalysisResult;
use cli::{Cli, Command};
use config::{AnalysisConfig, Config};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut cfg = match config::find_config_path(cli.config.as_deref()) {
        Some(path) => {
            let cfg = config::load_config(&path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };
    // CLI flags override the file
    if let Some(frame_length) = cli.frame_length {
        cfg.analysis.frame_length = frame_length;
    }
    if let Some(hop_length) = cli.hop_length {
        cfg.analysis.hop_length = hop_length;
    }
    cfg.analysis.validate()?;

    match cli.command {
        Command::Analyze {
            inputs,
            output,
            out_dir,
            pretty,
        } => run_analyze(&inputs, output.as_deref(), out_dir.as_deref(), pretty, &cfg.analysis),
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(api::server::run(cfg))
        }
    }
}

fn analyze_file(input: &Path, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let decoded = audio::decode::decode_file(input)
        .with_context(|| format!("Failed to decode {}", input.display()))?;
    audio::analysis::analyze_decoded(decoded, config)
        .with_context(|| format!("Failed to analyze {}", input.display()))
}

fn to_json(result: &AnalysisResult, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(json)
}

fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    let file_name = format!("{}.features.json", stem);
    match out_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

fn run_analyze(
    inputs: &[PathBuf],
    output: Option<&Path>,
    out_dir: Option<&Path>,
    pretty: bool,
    config: &AnalysisConfig,
) -> Result<()> {
    for input in inputs {
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
    }

    if let [input] = inputs {
        if out_dir.is_none() {
            log::info!("Analyzing {}", input.display());
            let json = to_json(&analyze_file(input, config)?, pretty)?;
            match output {
                Some(path) => std::fs::write(path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => {
                    let mut stdout = std::io::stdout().lock();
                    writeln!(stdout, "{}", json)?;
                }
            }
            return Ok(());
        }
    }

    if output.is_some() {
        anyhow::bail!("--output takes a single input; use --out-dir for several");
    }
    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    log::info!("Analyzing {} files", inputs.len());
    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta} remaining)")
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );

    let failures: Vec<String> = inputs
        .par_iter()
        .filter_map(|input| {
            let outcome = analyze_file(input, config).and_then(|result| {
                let path = output_path(input, out_dir);
                std::fs::write(&path, to_json(&result, pretty)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                Ok(path)
            });
            pb.inc(1);
            match outcome {
                Ok(path) => {
                    log::debug!("Wrote {}", path.display());
                    None
                }
                Err(e) => Some(format!("{:#}", e)),
            }
        })
        .collect();
    pb.finish_and_clear();

    for failure in &failures {
        log::error!("{}", failure);
    }
    log::info!(
        "Done: {} analyzed, {} failed",
        inputs.len() - failures.len(),
        failures.len()
    );
    if !failures.is_empty() {
        anyhow::bail!("{} of {} files failed", failures.len(), inputs.len());
    }
    Ok(())
}
