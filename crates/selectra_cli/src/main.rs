//! Selectra CLI
//!
//! Replay combobox interaction scenarios and inspect the resulting state.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod scenario;

use scenario::{Scenario, StepRecord, Transcript};

#[derive(Parser)]
#[command(name = "selectra")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Headless combobox scenario runner", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log filter (overrides RUST_LOG), e.g. `selectra_combobox=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario and print a transcript
    Run {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Replay a scenario and verify its `[expect]` table
    Check {
        /// Scenario file (TOML)
        scenario: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match &cli.log_level {
        Some(directives) => EnvFilter::new(directives),
        None if cli.verbose => EnvFilter::new("debug"),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { scenario, format } => cmd_run(&scenario, format),
        Commands::Check { scenario } => cmd_check(&scenario),
    }
}

fn cmd_run(path: &Path, format: Format) -> Result<()> {
    let scenario = Scenario::load(path)?;
    info!("Replaying {} step(s) against #{}", scenario.steps.len(), scenario.id);

    let transcript = scenario.run()?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&transcript)?),
        Format::Text => print_transcript(&scenario, &transcript),
    }
    Ok(())
}

fn cmd_check(path: &Path) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let transcript = scenario.run()?;

    let Some(expect) = &scenario.expect else {
        info!("No [expect] table in {}; replay succeeded", path.display());
        println!("ok: {} ({} steps, nothing to verify)", scenario.id, transcript.steps.len());
        return Ok(());
    };

    let mismatches = expect.verify(&transcript);
    if mismatches.is_empty() {
        println!("ok: {} ({} steps)", scenario.id, transcript.steps.len());
        return Ok(());
    }

    for mismatch in &mismatches {
        eprintln!("  - {}", mismatch);
    }
    anyhow::bail!(
        "{} expectation(s) failed for {}",
        mismatches.len(),
        path.display()
    )
}

fn print_transcript(scenario: &Scenario, transcript: &Transcript) {
    println!("combobox #{}", transcript.id);
    if let Some(description) = &scenario.description {
        println!("{}", description);
    }
    println!("{}", "=".repeat(40));
    println!(
        "initial   value={:?} text={:?}",
        transcript.initial.value, transcript.initial.text
    );
    println!();

    for record in &transcript.steps {
        print_step(record);
    }

    let aria = &transcript.aria;
    println!();
    println!(
        "aria      expanded={} activedescendant={:?} visible={}/{}",
        aria.combobox.expanded,
        aria.combobox.activedescendant,
        aria.listbox.visible_options().count(),
        aria.listbox.options.len()
    );
    if aria.listbox.no_matches.visible {
        println!("          {:?}", aria.listbox.no_matches.message);
    }
}

fn print_step(record: &StepRecord) {
    let state = &record.state;
    println!("{:>3}. {}", record.index, record.step.describe());
    if let Some(note) = &record.note {
        println!("     -> {}", note);
    }
    if !record.events.is_empty() {
        let names: Vec<_> = record.events.iter().map(|k| k.as_str()).collect();
        println!("     events: {}", names.join(", "));
    }
    println!(
        "     value={:?} text={:?} expanded={} active={:?} matching={}{}",
        state.value,
        state.text,
        state.expanded,
        state.active,
        state.matching,
        if state.valid { "" } else { " INVALID" }
    );
}
