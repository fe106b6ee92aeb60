//! Levelgen - command-line level generator
//!
//! Usage:
//!   levelgen generate --config cave --seed 42 --ascii
//!   levelgen batch --config levels/maze.ron --count 100 --output results/maze.json
//!   levelgen inspect --config overworld

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use levelgen_core::pipeline::LevelPipeline;
use levelgen_core::random::Seed;
use levelgen_tools::{
    ascii::{render_level, AsciiConfig},
    batch::{run_batch, BatchConfig},
    config_file::{config_to_ron, resolve_config, save_json, ConfigFileError},
};

#[derive(Parser)]
#[command(name = "levelgen")]
#[command(about = "Procedural 2D level generator")]
#[command(version)]
struct Cli {
    /// Enable debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a single level
    Generate {
        /// RON config file or preset name (cave, maze, overworld)
        #[arg(short, long, default_value = "cave")]
        config: String,

        /// Override the config seed
        #[arg(long, allow_hyphen_values = true)]
        seed: Option<Seed>,

        /// Print an ASCII preview
        #[arg(long)]
        ascii: bool,

        /// Disable colored ASCII output
        #[arg(long)]
        no_color: bool,

        /// Write the full report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate many levels in parallel
    Batch {
        /// RON config file or preset name
        #[arg(short, long, default_value = "cave")]
        config: String,

        /// Number of levels
        #[arg(short = 'n', long, default_value = "10")]
        count: u32,

        /// First seed
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        seed_start: Seed,

        /// Seeds tried per level while unplayable
        #[arg(long, default_value = "5")]
        max_attempts: u32,

        /// Output report path
        #[arg(short, long, default_value = "batch_report.json")]
        output: PathBuf,
    },

    /// Print a config as RON
    Inspect {
        /// RON config file or preset name
        #[arg(short, long, default_value = "cave")]
        config: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries level output.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Generate {
            config,
            seed,
            ascii,
            no_color,
            output,
        } => cmd_generate(&config, seed, ascii, no_color, output),
        Commands::Batch {
            config,
            count,
            seed_start,
            max_attempts,
            output,
        } => cmd_batch(&config, count, seed_start, max_attempts, &output),
        Commands::Inspect { config } => cmd_inspect(&config),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigFileError),
    #[error("Generation failed: {0}")]
    Generation(#[from] levelgen_core::error::GenerationError),
}

fn cmd_generate(
    source: &str,
    seed: Option<Seed>,
    ascii: bool,
    no_color: bool,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut config = resolve_config(source)?;
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }

    let report = LevelPipeline::new().run(&config)?;
    let validation = &report.validation;

    if ascii {
        let preview = render_level(
            &report.level,
            &AsciiConfig {
                use_color: !no_color,
                ..AsciiConfig::default()
            },
        );
        print!("{preview}");
    }

    println!(
        "{} {}x{} seed {}: playable={} quality={:.3} entities={}",
        config.algorithm,
        config.width,
        config.height,
        config.seed,
        validation.playable,
        validation.quality_score,
        report.level.entities().len()
    );
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    for issue in &validation.issues {
        println!("  issue: {issue}");
    }

    if let Some(path) = output {
        save_json(&report, &path)?;
        tracing::info!("Report written to {}", path.display());
    }
    Ok(())
}

fn cmd_batch(
    source: &str,
    count: u32,
    seed_start: Seed,
    max_attempts: u32,
    output: &std::path::Path,
) -> Result<(), CliError> {
    let config = resolve_config(source)?;
    let batch = BatchConfig::new(count)
        .with_seed(seed_start)
        .with_max_attempts(max_attempts);

    let report = run_batch(&config, &batch);
    report.save(output)?;

    let summary = &report.summary;
    println!(
        "{} levels ({} failed): {:.1}% playable, mean quality {:.3}, mean attempts {:.2}",
        summary.completed,
        report.errors.len(),
        summary.playable_ratio * 100.0,
        summary.mean_quality,
        summary.mean_attempts
    );
    println!("Report written to {}", output.display());
    Ok(())
}

fn cmd_inspect(source: &str) -> Result<(), CliError> {
    let config = resolve_config(source)?;
    println!("{}", config_to_ron(&config)?);
    println!(
        "// {} entities requested across {} specs",
        config.requested_entities(),
        config.placement_specs.len()
    );
    Ok(())
}
