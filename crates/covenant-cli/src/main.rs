//! Covenant contract CLI.
//!
//! Provides the `covenant` binary for checking documented function contracts
//! without any host code: `lint` compiles every contract in a manifest, and
//! `verify` also replays the manifest's recorded calls through the enforcer.
//!
//! Exit codes: 0 = no violations, 1 = violations found, 2 = the manifest
//! could not be loaded.

mod manifest;
mod report;
mod runner;
mod schema;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use covenant_core::{config, EnforcementConfig, Enforcer};

use crate::manifest::Manifest;
use crate::report::Report;
use crate::runner::Runner;

/// Check docstring-declared function contracts.
#[derive(Parser)]
#[command(name = "covenant", version, about = "Check docstring-declared function contracts")]
struct Cli {
    /// Report format.
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    /// Decorate without enforcement, as a build with checks turned off would.
    #[arg(long, global = true)]
    no_checks: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every contract in a manifest and report malformed ones.
    Lint {
        /// Manifest file (.yaml, .yml or .json).
        manifest: PathBuf,
    },
    /// Replay the recorded calls of a manifest and report violations.
    Verify {
        /// Manifest file (.yaml, .yml or .json).
        manifest: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    match run(&cli) {
        Ok(report) => {
            let exit_code = match emit(&report, cli.format) {
                Ok(()) if report.has_violations() => 1,
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    2
                }
            };
            process::exit(exit_code);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<Report> {
    let enforcement = if cli.no_checks {
        EnforcementConfig::disabled()
    } else {
        EnforcementConfig::from_env()
    };
    config::init(enforcement).context("failed to configure enforcement")?;
    let enforcer = Enforcer::from_global();

    match &cli.command {
        Commands::Lint { manifest } => {
            let loaded = load(manifest)?;
            let functions = Runner::new(&loaded, enforcer).lint()?;
            Ok(Report::new("lint", display(manifest), config::checks_enabled(), functions))
        }
        Commands::Verify { manifest } => {
            let loaded = load(manifest)?;
            let functions = Runner::new(&loaded, enforcer).verify()?;
            Ok(Report::new("verify", display(manifest), config::checks_enabled(), functions))
        }
    }
}

fn load(path: &Path) -> anyhow::Result<Manifest> {
    let manifest = Manifest::from_file(path)
        .with_context(|| format!("failed to load manifest '{}'", path.display()))?;
    tracing::info!(
        manifest = %path.display(),
        functions = manifest.functions.len(),
        "Loaded manifest"
    );
    Ok(manifest)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn emit(report: &Report, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Text => print!("{}", report.to_text()),
        Format::Json => println!("{}", report.to_json().context("failed to serialize report")?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["covenant", "verify", "calc.yaml", "--format", "json", "--no-checks"])
            .unwrap();
        assert_eq!(cli.format, Format::Json);
        assert!(cli.no_checks);
        assert!(matches!(cli.command, Commands::Verify { ref manifest } if manifest == Path::new("calc.yaml")));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["covenant", "lint", "calc.json"]).unwrap();
        assert_eq!(cli.format, Format::Text);
        assert!(!cli.no_checks);
    }

    #[test]
    fn test_cli_requires_manifest() {
        assert!(Cli::try_parse_from(["covenant", "lint"]).is_err());
    }
}
