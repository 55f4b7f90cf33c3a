//! Lochist - local file history.
//!
//! This is the main entry point for the lochist CLI.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lochist_core::Config;
use lochist_util::LogConfig;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lochist")]
#[command(author, version, about = "Local file history with baseline snapshots and unified diffs", long_about = None)]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record history until interrupted
    Watch {
        /// Seconds between passes (overrides config)
        #[arg(short, long)]
        interval: Option<u64>,
        /// Continue from the latest stored baseline
        #[arg(long)]
        resume: bool,
    },
    /// Create a new baseline
    Snapshot,
    /// Run one detection pass against the latest baseline
    Check,
    /// List baselines and diff cycles
    History {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the content a diff file reconstructs
    Show {
        /// Diff file
        diff: PathBuf,
        /// Print the parsed diff instead
        #[arg(long = "diff")]
        print_diff: bool,
    },
    /// Diff reconstructed content against the current file
    Compare {
        /// Diff file
        diff: PathBuf,
    },
    /// Write the content a diff file reconstructs
    Restore {
        /// Diff file
        diff: PathBuf,
        /// Write here instead of the original location
        #[arg(long)]
        to: Option<PathBuf>,
    },
    /// Show configuration
    Config,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir()?;
    let root = match &cli.root {
        Some(root) => absolute(&cwd, root),
        None => cwd.clone(),
    };

    if let Commands::Version = cli.command {
        print_version();
        return Ok(());
    }

    let root = root
        .canonicalize()
        .with_context(|| format!("project root {} is not accessible", root.display()))?;
    let (config, sources) = Config::load(Some(&root)).await?;

    init_logging(cli.verbose, &config);
    tracing::debug!(root = %root.display(), "Loaded {} config file(s)", sources.len());

    match cli.command {
        Commands::Watch { interval, resume } => {
            commands::watch(&root, &config, interval, resume).await
        }
        Commands::Snapshot => commands::snapshot(&root, &config).await,
        Commands::Check => commands::check(&root, &config).await,
        Commands::History { json } => commands::history(&root, &config, json).await,
        Commands::Show { diff, print_diff } => {
            commands::show(&root, &absolute(&cwd, &diff), print_diff).await
        }
        Commands::Compare { diff } => {
            commands::compare(&root, &config, &absolute(&cwd, &diff)).await
        }
        Commands::Restore { diff, to } => {
            let to = to.map(|path| absolute(&cwd, &path));
            commands::restore(&root, &absolute(&cwd, &diff), to.as_deref()).await
        }
        Commands::Config => show_config(&config, &sources),
        Commands::Version => Ok(()),
    }
}

/// Initialize logging on stderr. `--verbose` wins over the configured level.
fn init_logging(verbose: bool, config: &Config) {
    lochist_util::log::init(LogConfig::resolve(verbose, config.log_level()));
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Show the effective configuration.
fn show_config(config: &Config, sources: &[PathBuf]) -> anyhow::Result<()> {
    println!("Configuration sources:");
    if sources.is_empty() {
        println!("  (none)");
    } else {
        for source in sources {
            println!("  {}", source.display());
        }
    }
    println!();

    println!("Current configuration:");
    println!("{}", serde_json::to_string_pretty(&config.resolved())?);

    Ok(())
}

/// Print version information.
fn print_version() {
    println!("lochist {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Local file history: periodic baselines plus unified-diff increments.");
}
