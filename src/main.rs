//! sqlpod binary: serves the pod protocol on stdin/stdout.
//!
//! Logs go to stderr; stdout carries only response envelopes.

use std::process::ExitCode;

use sqlpod::executor::SqliteExecutor;
use sqlpod::{Pod, PodBuilder, PodConfig};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const ENV_LOG: &str = "SQLPOD_LOG";

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = match PodConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        let pod: Pod<SqliteExecutor> = PodBuilder::from_config(config).build(SqliteExecutor)?;
        pod.serve(tokio::io::stdin(), tokio::io::stdout()).await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("pod stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}
