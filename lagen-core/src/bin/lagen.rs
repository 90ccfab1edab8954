//! lagen CLI
//!
//! Reads `<path>/.lagen/main.yml` and generates every configured entry.
//! Exits non-zero if the configuration is bad, the run was aborted, or any
//! entry failed.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Mutex, PoisonError};
use tracing_subscriber::EnvFilter;

use lagen_core::output::{header, print_status, Status};
use lagen_core::{
    DependencyInstaller, EntryOutcome, EntryState, GlobalConfig, Orchestrator, Progress,
    RunReport, ShellInstaller, SkipInstall,
};

#[derive(Parser)]
#[command(name = "lagen")]
#[command(version, about = "lagen - Makefile and manifest scaffolding for serverless entries")]
struct Cli {
    /// Project directory containing .lagen/main.yml
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Entries generated in parallel
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Install dependencies without asking
    #[arg(short, long)]
    yes: bool,

    /// Never run the dependency install step
    #[arg(long, conflicts_with = "yes")]
    no_install: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Prints each entry's block in one piece once it finishes, so blocks from
/// parallel workers never interleave.
#[derive(Default)]
struct TerminalProgress {
    lock: Mutex<()>,
}

impl Progress for TerminalProgress {
    fn entry_finished(&self, outcome: &EntryOutcome) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        println!("{}", header(&outcome.name.to_uppercase()));
        for (status, message) in entry_lines(outcome) {
            print_status(status, &message);
        }
    }
}

/// Status lines for a finished entry, each tagged with the entry name.
fn entry_lines(outcome: &EntryOutcome) -> Vec<(Status, String)> {
    let name = &outcome.name;
    let mut lines: Vec<(Status, String)> = outcome
        .warnings
        .iter()
        .map(|warning| (Status::Warning, tagged(name, warning)))
        .collect();
    lines.extend(
        outcome
            .files
            .iter()
            .filter(|f| !f.changed)
            .map(|f| (Status::Info, format!("[{name}] {} unchanged", f.path.display()))),
    );
    lines.push(match &outcome.state {
        EntryState::Failed { reason, .. } => (Status::Error, tagged(name, reason)),
        EntryState::Reached { .. } => (
            Status::Success,
            format!("[{name}] Entry successfully generated !\n"),
        ),
    });
    lines
}

fn tagged(name: &str, message: &str) -> String {
    let tag = format!("[{name}]");
    if message.starts_with(&tag) {
        message.to_string()
    } else {
        format!("{tag} {message}")
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "off" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            print_status(Status::Error, &e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = GlobalConfig::load(&cli.path)?;

    let installer: Box<dyn DependencyInstaller> = if cli.no_install {
        Box::new(SkipInstall)
    } else {
        Box::new(ShellInstaller::new(cli.yes))
    };

    let progress = TerminalProgress::default();
    let mut orchestrator = Orchestrator::new(&config, installer.as_ref()).with_jobs(cli.jobs);
    if cli.format == OutputFormat::Text {
        orchestrator = orchestrator.with_progress(&progress);
    }
    let report = orchestrator.run();

    match cli.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{json}");
        }
        OutputFormat::Text => print_summary(&report),
    }

    Ok(ExitCode::from(report.exit_code()))
}

fn print_summary(report: &RunReport) {
    if let Some(reason) = &report.aborted {
        print_status(Status::Error, reason);
    }

    let failed = report.failed().count();
    let done = report.outcomes.len() - failed;
    if report.success() {
        print_status(Status::Success, &format!("{done} entries generated"));
    } else {
        print_status(
            Status::Error,
            &format!("{done} entries generated, {failed} failed"),
        );
    }
}
