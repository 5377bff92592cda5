pub mod ai;
pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod history;
pub mod models;
pub mod organize;
pub mod services;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Set up the global subscriber from `RUST_LOG`
pub fn init_tracing() {
    // Default: warn for most crates, info for ours (run summaries visible)
    // Use RUST_LOG=debug for per-file logs
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,auto_organize_lib=info")),
        )
        .init();
}

pub fn run() -> ExitCode {
    // Load .env from the working directory, then its parent
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path("../.env");
    }

    init_tracing();

    let args = cli::Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::run_cli(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Organize run failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
