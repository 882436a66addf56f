use log::*;
use service::{config::Config, logging::Logger};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
        std::process::exit(1);
    }

    let listen_addr = config.listen_addr();
    let grace = config.shutdown_grace();

    let shutdown = CancellationToken::new();
    let service_state = service::AppState::new(config);
    let app_state = web::AppState::new(service_state, shutdown.clone());
    let router = web::define_routes(app_state);

    let listener = match TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {listen_addr}: {e}");
            std::process::exit(1);
        }
    };
    info!("Server starting... listening for connections on http://{listen_addr}");

    tokio::spawn(watch_for_shutdown_signal(shutdown.clone()));

    // No request timeout is applied: streams stay open until they end on their own.
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned());

    tokio::select! {
        result = async { server.await } => {
            if let Err(e) = result {
                error!("Server error: {e}");
                std::process::exit(1);
            }
        }
        _ = drain_deadline(&shutdown, grace) => {
            warn!("Open connections did not drain within {grace:?}, exiting anyway");
        }
    }

    info!("Server stopped");
}

/// Cancels `shutdown` on SIGINT or SIGTERM. Every open stream session is a
/// child of this token.
async fn watch_for_shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received, closing open streams");
    shutdown.cancel();
}

/// Resolves `grace` after shutdown has started.
async fn drain_deadline(shutdown: &CancellationToken, grace: Duration) {
    shutdown.cancelled().await;
    tokio::time::sleep(grace).await;
}
