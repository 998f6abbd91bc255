//! `toolproxy` binary

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use toolproxy_core::ProxyConfig;
use toolproxy_server::telemetry::init_telemetry;
use toolproxy_server::{router, AppState, ServerError, ServerResult};

/// Policy-enforcing tool-call proxy for chat-completion backends
#[derive(Parser, Debug)]
#[command(name = "toolproxy", version)]
struct Cli {
    /// YAML configuration file (defaults to `<config dir>/toolproxy/config.yaml` when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Listen address, overriding configuration
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Log at debug level when RUST_LOG is unset
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_telemetry(cli.json_logs, cli.verbose) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "toolproxy exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let mut config = ProxyConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    let state = AppState::from_config(&config)?;
    let app = router(state);

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.server.bind.clone(),
            source,
        })?;
    tracing::info!(bind = %config.server.bind, "toolproxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    tracing::info!("toolproxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
