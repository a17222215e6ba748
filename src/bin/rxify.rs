//! CLI for the rxify migration tool.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rxify::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rxify")]
#[command(author, version, about = "Migrate AsyncTask classes to RxJava pipelines", long_about = None)]
struct Cli {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks with their safety verdict without changing anything
    Scan {
        /// Source root to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Migrate every safe task
    Migrate {
        /// Source root to migrate
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Preview changes without writing them
        #[arg(long)]
        dry_run: bool,

        /// Print a unified diff of every change
        #[arg(long)]
        diff: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        #[arg(long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => MigrationConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MigrationConfig::default(),
    };

    match cli.command {
        Commands::Scan { path, json } => cmd_scan(&config, &path, json),
        Commands::Migrate {
            path,
            dry_run,
            diff,
            json,
        } => cmd_migrate(&config, &path, dry_run, diff, json),
        Commands::Config { format } => cmd_config(&config, format),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "rxify=debug" } else { "rxify=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_scan(config: &MigrationConfig, path: &Path, json: bool) -> Result<()> {
    let host = FsHost::new(path, config);
    let resolver = NameResolver::new();
    let entries = Migrator::new(config, &host, &resolver)
        .scan()
        .context("Scan failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    for entry in &entries {
        let status = match (&entry.verdict, &entry.note) {
            (Some(Verdict::Accept), _) => "safe".to_string(),
            (Some(Verdict::Reject(reason)), _) => format!("unsafe: {reason}"),
            (None, Some(note)) => note.clone(),
            (None, None) => "unknown".to_string(),
        };
        println!(
            "{}: {} [{}] task '{}': {}",
            entry.unit.display(),
            entry.name,
            entry.variant,
            entry.task_name,
            status
        );
    }
    Ok(())
}

fn cmd_migrate(
    config: &MigrationConfig,
    path: &Path,
    dry_run: bool,
    diff: bool,
    json: bool,
) -> Result<()> {
    let mut host = FsHost::new(path, config);
    if dry_run {
        host = host.dry_run();
    }
    let resolver = NameResolver::new();
    let report = Migrator::new(config, &host, &resolver)
        .run()
        .context("Migration failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if diff || dry_run {
        for change in host.changes() {
            println!("{}", change.colorized_diff());
        }
    }

    for candidate in &report.candidates {
        println!(
            "{}: {} ({}) {}",
            candidate.unit.display(),
            candidate.name,
            candidate.variant,
            candidate.outcome
        );
    }
    println!("\n{}", report.summary);

    let changes = host.summary();
    if dry_run {
        println!("Dry run: {changes}. No files written.");
    } else {
        println!("{changes}");
    }
    Ok(())
}

fn cmd_config(config: &MigrationConfig, format: Format) -> Result<()> {
    let text = match format {
        Format::Yaml => config.to_yaml_string()?,
        Format::Json => config.to_json_string()?,
    };
    println!("{text}");
    Ok(())
}
