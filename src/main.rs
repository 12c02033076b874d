// src/main.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use rayon::prelude::*;
use serde_json::json;

use blackbox_tune::cli_dump;
use blackbox_tune::{AnalysisConfig, AnalysisError, CancelToken, Engine, Report, TuningPolicy, VehicleParams};

/// Analyse blackbox CSV logs and suggest PID and filter settings.
#[derive(Parser, Debug)]
#[command(name = "blackbox_tune", version)]
struct Args {
    /// Blackbox CSV exports to analyse
    #[arg(required = true)]
    logs: Vec<PathBuf>,

    /// All-up weight in grams
    #[arg(long, default_value = "")]
    weight: String,

    /// Frame size: 65mm, 75mm, 85mm, 2", 2.5", 3", 3.5", 4", 5", 6" or 7"
    #[arg(long, default_value = "")]
    size: String,

    /// Tuning style: freestyle, cinematic or racing
    #[arg(long, default_value = "freestyle")]
    style: String,

    /// TOML file overriding the built-in tuning policy
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Write one result file per log here instead of printing to stdout
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// Print Betaflight CLI commands instead of JSON
    #[arg(long, default_value_t = false)]
    cli: bool,

    /// Wall-clock budget per log in seconds
    #[arg(long, default_value_t = 60)]
    time_budget_secs: u64,
}

fn error_json(err: &AnalysisError) -> String {
    json!({ "error": err.to_string(), "kind": err.kind() }).to_string()
}

fn render(report: &Report, args: &Args) -> Result<String, AnalysisError> {
    if args.cli {
        Ok(cli_dump::render(report.recommendations(), Some(report.flown_pids())))
    } else {
        report.to_json(args.pretty)
    }
}

fn output_path(dir: &Path, log: &Path, cli: bool) -> PathBuf {
    let stem = log.file_stem().unwrap_or_default().to_string_lossy();
    let extension = if cli { "txt" } else { "json" };
    dir.join(format!("{stem}_tune.{extension}"))
}

/// Analyses one log. Returns the text to emit and whether the analysis succeeded.
fn run_one(engine: &Engine, params: &VehicleParams, log: &Path, args: &Args) -> Result<(String, bool)> {
    let bytes = fs::read(log).with_context(|| format!("reading {}", log.display()))?;
    let outcome = engine
        .analyze(&bytes, params, &CancelToken::new())
        .and_then(|report| render(&report, args));

    Ok(match outcome {
        Ok(text) => (text, true),
        Err(e) => {
            error!("{}: {e}", log.display());
            (error_json(&e), false)
        }
    })
}

fn run(args: &Args) -> Result<bool> {
    let params = match VehicleParams::from_form(&args.weight, &args.size, &args.style) {
        Ok(params) => params,
        Err(e) => {
            println!("{}", error_json(&AnalysisError::from(e)));
            return Ok(false);
        }
    };
    let policy = match &args.policy {
        Some(path) => TuningPolicy::from_file(path)?,
        None => TuningPolicy::default(),
    };
    info!("Using tuning policy {}", policy.version);

    let config = AnalysisConfig {
        time_budget: Duration::from_secs(args.time_budget_secs),
        ..AnalysisConfig::default()
    };
    let engine = Engine::new(config, policy);
    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    // Each log is an independent call; output keeps the input order.
    let results: Vec<Result<(String, bool)>> = args
        .logs
        .par_iter()
        .map(|log| run_one(&engine, &params, log, args))
        .collect();

    let mut all_ok = true;
    for (log, result) in args.logs.iter().zip(results) {
        let (text, ok) = result?;
        all_ok &= ok;
        match &args.output_dir {
            Some(dir) => {
                let path = output_path(dir, log, args.cli && ok);
                fs::write(&path, format!("{text}\n")).with_context(|| format!("writing {}", path.display()))?;
                info!("{} -> {}", log.display(), path.display());
            }
            None => println!("{text}"),
        }
    }
    Ok(all_ok)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{e:#}");
            println!("{}", json!({ "error": format!("{e:#}"), "kind": "internal_fault" }));
            ExitCode::from(1)
        }
    }
}
