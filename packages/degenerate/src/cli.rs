use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::EngineConfig;
use crate::headless::HeadlessHost;
use crate::run_job::{RunMetadata, RunSpec, RunStatus};
use crate::scripting;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script headlessly and record everything it sends
    Run {
        /// Rhai script to run
        script: PathBuf,

        /// Maximum number of frame ticks to deliver
        #[arg(long, default_value_t = 60)]
        frames: u64,

        /// Pause before each frame tick, in milliseconds
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,

        /// Transcript output (JSON lines). Defaults to stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Engine config JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run from a JSON run spec
    Job {
        spec: PathBuf,
    },

    /// Compile a script without running it and print diagnostics as JSON
    Check {
        script: PathBuf,

        /// Engine config JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::from_file(&path)?),
        None => Ok(EngineConfig::default()),
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            script,
            frames,
            interval_ms,
            out,
            config,
        } => {
            let mut spec = RunSpec::new(script);
            spec.frames = frames;
            spec.interval_ms = interval_ms;
            spec.output_path = out;
            spec.engine = load_config(config)?;
            run_spec(spec)
        }
        Commands::Job { spec } => {
            let spec = RunSpec::from_file(&spec).map_err(anyhow::Error::msg)?;
            run_spec(spec)
        }
        Commands::Check { script, config } => {
            let config = load_config(config)?;
            let source = std::fs::read_to_string(&script)
                .with_context(|| format!("failed to read script {:?}", script))?;
            let diagnostics = scripting::check(&source, &config);
            println!("{}", serde_json::to_string_pretty(&diagnostics)?);
            if !diagnostics.is_empty() {
                anyhow::bail!("{} compile error(s)", diagnostics.len());
            }
            Ok(())
        }
    }
}

fn run_spec(spec: RunSpec) -> Result<()> {
    spec.validate().map_err(anyhow::Error::msg)?;
    let source = std::fs::read_to_string(&spec.script_path)
        .with_context(|| format!("failed to read script {:?}", spec.script_path))?;

    let started_at = Utc::now();
    let mut host = HeadlessHost::new(spec.engine.clone(), spec.headless_config());
    let transcript = host.run(&source)?;
    let lines = transcript.to_json_lines()?;

    match &spec.output_path {
        Some(path) => {
            std::fs::write(path, &lines).with_context(|| format!("failed to write {:?}", path))?;
            log::info!("Transcript written to {:?}", path);
        }
        None => print!("{}", lines),
    }

    let metadata_path = spec.metadata_path();
    let metadata =
        RunMetadata::new(spec, started_at, &source, &transcript).map_err(anyhow::Error::msg)?;
    metadata.save(&metadata_path).map_err(anyhow::Error::msg)?;

    for diagnostic in &transcript.diagnostics {
        log::warn!("{}", serde_json::to_string(diagnostic)?);
    }
    if metadata.status == RunStatus::Failed {
        anyhow::bail!("script failed: {}", metadata.errors.join("; "));
    }
    Ok(())
}
