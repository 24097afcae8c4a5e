//! lsr - main entry point
//!
//! Lists a directory tree with sizes, mtimes and SHA-256 digests and reports
//! what changed since the last run.

use anyhow::Result;
use clap::Parser;
use lsr::config::{Config, WalkErrorPolicy};
use lsr::executor::{list_tree, ScanExecutor, ScanJob, ScanMode};
use lsr::utils;
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to scan
    #[arg(short = 'C', long, value_name = "DIR", default_value = ".")]
    directory: PathBuf,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Manifest file name inside the scanned directory (overrides config)
    #[arg(short, long, value_name = "NAME")]
    manifest: Option<String>,

    /// Reuse previous digests for files whose size and mtime are unchanged
    #[arg(long)]
    trust: bool,

    /// Report changes without updating the manifest
    #[arg(long, conflicts_with = "list")]
    check: bool,

    /// Print the full listing instead of comparing
    #[arg(long)]
    list: bool,

    /// Report unreadable entries and continue instead of failing
    #[arg(long)]
    skip_unreadable: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    if let Some(name) = args.manifest {
        config.scan.manifest_name = name;
    }
    if args.trust {
        config.scan.trust = true;
    }
    if args.skip_unreadable {
        config.scan.on_walk_error = WalkErrorPolicy::Skip;
    }
    config.validate()?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::debug!("lsr v{} with {:?}", env!("CARGO_PKG_VERSION"), config);

    let mode = if args.check {
        ScanMode::Check
    } else {
        ScanMode::Update
    };
    let job = ScanJob::new(&args.directory, &config, mode);
    let stdout = BufWriter::new(io::stdout().lock());

    if args.list {
        list_tree(&job, stdout)?;
    } else {
        ScanExecutor::new(stdout).execute(&job)?;
    }

    Ok(())
}
