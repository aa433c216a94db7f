use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hutch::config::Settings;
use hutch::reader;
use hutch::reconcile::{Mode, Reconciler};
use hutch::report::{Report, Reporter};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hutch", version)]
#[command(about = "Declarative RabbitMQ topology management", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create every resource in the topology that the broker is missing
    Apply(Settings),

    /// Check the broker against the topology without changing anything
    Verify(Settings),
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let (mode, settings) = match cli.cmd {
        Commands::Apply(settings) => (Mode::Apply, settings),
        Commands::Verify(settings) => (Mode::Verify, settings),
    };

    match run(mode, &settings) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
}

fn run(mode: Mode, settings: &Settings) -> Result<ExitCode> {
    let topology = reader::read_file(&settings.config)?;
    let client = settings
        .client()
        .context("failed to set up the management API client")?;

    let reconciler = Reconciler::new(client);
    if let Some(wait) = settings.wait() {
        reconciler.wait_for_broker(wait);
    }

    let outcome = reconciler.reconcile(mode, &topology);
    Reporter
        .report(mode, &outcome)
        .context("failed to write report")?;

    Ok(match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    })
}
