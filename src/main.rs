use clap::Parser;
use std::process::ExitCode;
use tracing::info;

use client_board::cli::commands::{dispatch, show_overview};
use client_board::cli::Cli;
use client_board::config::ClientBoardConfig;
use client_board::observability::remote_metrics;
use client_board::telemetry::init_telemetry;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_loaded = match ClientBoardConfig::load_env_file() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("⚠️  Could not read .env: {e}");
            false
        }
    };
    let config = match ClientBoardConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {e}");
            eprintln!("   → Check client-board.toml and CLIENT_BOARD_* variables");
            return ExitCode::FAILURE;
        }
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    let json = cli.json_logs || config.observability.json_logs;
    if let Err(e) = init_telemetry(&level, json) {
        eprintln!("⚠️  Logging disabled: {e}");
    }
    if env_loaded {
        info!("Loaded environment variables from .env file");
    }

    let Some(command) = cli.command else {
        show_overview();
        return ExitCode::SUCCESS;
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("❌ Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(dispatch(command, config));
    remote_metrics().log_stats();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.guidance());
            ExitCode::FAILURE
        }
    }
}
