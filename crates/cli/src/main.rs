//! assetmap - generate asset manifests from recorded bundler builds

mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "assetmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t)]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Generate the manifest for a recorded build
  Emit {
    /// Path to the build record (JSON)
    build: PathBuf,

    /// Path to a manifest options file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
  },

  /// Validate a manifest options file and print the effective configuration
  Check {
    /// Path to the manifest options file (JSON)
    config: PathBuf,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Emit { build, config } => cmd::cmd_emit(&build, config.as_deref(), cli.format),
    Commands::Check { config } => cmd::cmd_check(&config, cli.format),
  }
}
