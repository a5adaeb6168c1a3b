//! Montage - command-line inspector for timeline projects
//!
//! Loads a project file and prints what a renderer would receive.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use montage_core::RationalTime;
use montage_timeline::{EngineConfig, ProjectFile, Timeline};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "montage", version, about = "Inspect Montage timeline projects")]
struct Cli {
    /// Engine configuration (JSON). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the composition plan as JSON.
    Plan { project: PathBuf },
    /// Print ruler split points, one per line, in seconds.
    Splits {
        project: PathBuf,
        #[arg(long, default_value_t = 1000)]
        step_ms: i64,
    },
    /// Show what plays at one instant.
    Inspect {
        project: PathBuf,
        #[arg(long)]
        at_ms: i64,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Plan { project } => {
            let timeline = open(&project, config)?;
            let plan = timeline.build_composition_plan();
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::Splits { project, step_ms } => {
            let timeline = open(&project, config)?;
            let plan = timeline.build_composition_plan();
            for point in plan.split_points(RationalTime::from_millis(step_ms))? {
                println!("{:.3}", point.to_seconds_f64());
            }
        }
        Command::Inspect { project, at_ms } => {
            let timeline = open(&project, config)?;
            inspect(&timeline, RationalTime::from_millis(at_ms));
        }
    }

    Ok(())
}

fn open(path: &Path, config: EngineConfig) -> Result<Timeline> {
    let file = ProjectFile::load_from_file(path)
        .with_context(|| format!("Failed to read project {}", path.display()))?;
    let timeline = file
        .into_timeline(config)
        .with_context(|| format!("Project {} is inconsistent", path.display()))?;
    info!(
        segments = timeline.len(),
        total = %timeline.total_duration(),
        "Opened project"
    );
    Ok(timeline)
}

fn inspect(timeline: &Timeline, at: RationalTime) {
    println!("time:      {at} of {}", timeline.total_duration());
    match timeline.source_time_at(at) {
        Some(hit) => println!(
            "segment:   {} ({} @ {})",
            hit.segment, hit.source, hit.time
        ),
        None => println!("segment:   none"),
    }
    let effects = timeline.effects_at(at);
    println!(
        "effects:   brightness={} saturation={} contrast={} blur={}",
        effects.brightness, effects.saturation, effects.contrast, effects.blur
    );
    match timeline.caption_at(at) {
        Some(caption) => println!("caption:   {:?}", caption.text()),
        None => println!("caption:   none"),
    }
}
