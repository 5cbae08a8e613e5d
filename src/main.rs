use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use hardened_demo::config::{AppConfig, Environment};
use hardened_demo::store::UserStore;
use hardened_demo::web::{self, AppState};
use hardened_demo::{init_tracing, PolicyError};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            // Names only; values are never read into the error.
            init_tracing(Environment::Development);
            tracing::error!(error = %err, "refusing to start");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.environment());

    match run(Arc::new(config)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Arc<AppConfig>) -> Result<(), PolicyError> {
    tokio::fs::create_dir_all(config.uploads_dir()).await?;

    let store = match &config.database().path {
        Some(path) => UserStore::open(path)?,
        None => UserStore::open_in_memory()?,
    };
    let state = AppState::new(Arc::clone(&config), store.clone())?;

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = %config.environment(),
        "server listening"
    );

    axum::serve(
        listener,
        web::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    store.close()?;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received, draining in-flight requests");
}
