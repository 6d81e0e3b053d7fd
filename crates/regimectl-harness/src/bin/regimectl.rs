//! CLI entrypoint for the regimectl sweep harness.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use regimectl_harness::config::parse_seed;
use regimectl_harness::report::{self, ReportFormat};
use regimectl_harness::structured_log::{LogEmitter, validate_log_file};
use regimectl_harness::{HarnessConfig, HarnessError, Sweep, SweepOutcome};

/// Windowed regime-control harness.
#[derive(Debug, Parser)]
#[command(name = "regimectl")]
#[command(about = "Run, sweep and compare regime controllers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one controller on one seed.
    Run {
        /// Sweep config JSON path.
        #[arg(long)]
        config: PathBuf,
        /// Controller label from the config.
        #[arg(long)]
        controller: String,
        /// Seed (decimal or 0x...).
        #[arg(long, default_value = "0")]
        seed: String,
        /// Output format: `json` (default), `markdown`, or `csv`.
        #[arg(long, default_value = "json")]
        format: String,
        /// Output file path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run every configured controller on every configured seed.
    Sweep {
        #[arg(long)]
        config: PathBuf,
        /// Structured JSONL log output path (`-` for stderr).
        #[arg(long, default_value = "target/regimectl/sweep.log.jsonl")]
        log: PathBuf,
        #[arg(long, default_value = "json")]
        format: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Compare two controllers window by window on one seed.
    Compare {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        left: String,
        #[arg(long)]
        right: String,
        #[arg(long, default_value = "0")]
        seed: String,
        #[arg(long, default_value = "json")]
        format: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Rank the configured seeds by how much two controllers disagree on them.
    RankSeeds {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        left: String,
        #[arg(long)]
        right: String,
        #[arg(long, default_value = "json")]
        format: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate a structured JSONL log.
    ValidateLog {
        #[arg(long)]
        log: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            controller,
            seed,
            format,
            output,
        } => {
            let format = parse_format(&format)?;
            let seed = parse_seed_arg(&seed)?;
            let config = narrowed(&config, &[controller.as_str()], Some(vec![seed]))?;
            let run = Sweep::new(&config)?.run_one(&controller, seed)?;
            write_output(output.as_deref(), &report::render_run(&run, format)?)?;
        }
        Command::Sweep {
            config,
            log,
            format,
            output,
        } => {
            let format = parse_format(&format)?;
            let config = HarnessConfig::load(&config)?;
            let sweep = Sweep::new(&config)?;
            let outcome = if log.as_os_str() == "-" {
                sweep.run_logged(&mut LogEmitter::to_stderr(&sweep_id()))?
            } else {
                let mut emitter = LogEmitter::to_file(&log, &sweep_id())?;
                let outcome = sweep.run_logged(&mut emitter)?;
                eprintln!("Wrote structured log to {}", log.display());
                outcome
            };
            write_output(output.as_deref(), &report::render_sweep(&outcome, format)?)?;
            if !outcome.all_passed() {
                return Err(
                    format!("Sweep failed: {} run(s) abandoned", outcome.failures.len()).into(),
                );
            }
        }
        Command::Compare {
            config,
            left,
            right,
            seed,
            format,
            output,
        } => {
            let format = parse_format(&format)?;
            let seed = parse_seed_arg(&seed)?;
            let config = narrowed(&config, &[left.as_str(), right.as_str()], Some(vec![seed]))?;
            let outcome = run_sweep(&config)?;
            let ranked: Vec<_> = outcome.compare(&left, &right, seed)?.into_iter().collect();
            if ranked.is_empty() {
                return Err(format!("no comparable runs for seed {seed}").into());
            }
            write_output(output.as_deref(), &report::render_ranking(&ranked, format)?)?;
        }
        Command::RankSeeds {
            config,
            left,
            right,
            format,
            output,
        } => {
            let format = parse_format(&format)?;
            let config = narrowed(&config, &[left.as_str(), right.as_str()], None)?;
            let outcome = run_sweep(&config)?;
            let ranked = outcome.rank_seeds(&left, &right)?;
            write_output(output.as_deref(), &report::render_ranking(&ranked, format)?)?;
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            for err in &errors {
                eprintln!("{err}");
            }
            if !errors.is_empty() {
                return Err(format!(
                    "Log validation failed: {} error(s) in {lines} line(s)",
                    errors.len()
                )
                .into());
            }
            eprintln!("{}: {lines} valid line(s)", log.display());
        }
    }

    Ok(())
}

/// Load `path` keeping only the controllers labelled in `labels`, and only
/// `seeds` when given.
fn narrowed(
    path: &Path,
    labels: &[&str],
    seeds: Option<Vec<i64>>,
) -> Result<HarnessConfig, HarnessError> {
    let mut config = HarnessConfig::load(path)?;
    for label in labels {
        if !config.controllers.iter().any(|c| c.label() == *label) {
            return Err(HarnessError::UnknownController((*label).to_string()));
        }
    }
    config.controllers.retain(|c| labels.contains(&c.label()));
    if let Some(seeds) = seeds {
        config.seeds = seeds;
    }
    Ok(config)
}

fn run_sweep(config: &HarnessConfig) -> Result<SweepOutcome, Box<dyn std::error::Error>> {
    let outcome = Sweep::new(config)?.run();
    if let Some(failure) = outcome.failures.first() {
        return Err(format!(
            "controller '{}' seed {}: {}",
            failure.label, failure.seed, failure.error
        )
        .into());
    }
    Ok(outcome)
}

fn parse_format(raw: &str) -> Result<ReportFormat, Box<dyn std::error::Error>> {
    ReportFormat::from_str_loose(raw)
        .ok_or_else(|| format!("Unsupported format '{raw}', expected json|markdown|csv").into())
}

fn parse_seed_arg(raw: &str) -> Result<i64, Box<dyn std::error::Error>> {
    parse_seed(raw).ok_or_else(|| format!("invalid seed '{raw}'").into())
}

fn sweep_id() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("sweep-{secs}")
}

fn write_output(path: Option<&Path>, body: &str) -> std::io::Result<()> {
    if let Some(path) = path {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, body)?;
        eprintln!("Wrote report to {}", path.display());
    } else {
        print!("{body}");
    }
    Ok(())
}
