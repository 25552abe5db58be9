// ABOUTME: nostr-file service binary: loads config, builds the authorization directory, serves the file API
// ABOUTME: Also runs the NIP-05 refresh task and shuts both down on Ctrl+C or SIGTERM

use axum::http::{header, Method};
use dotenv::dotenv;
use nostr_file_api::{api_routes, AppState, LocalFileStore};
use nostr_file_core::{
    spawn_refresh_task, AuthorizationDirectory, Nip05Client, RefreshSchedule, ServerConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

fn init_tracing() {
    let is_production = std::env::var("NODE_ENV").unwrap_or_default() == "production";
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if is_production {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    println!("\n================================================");
    println!("📁 nostr-file starting...");
    println!("================================================\n");

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Configuration Error:\n{}\n", e);
            std::process::exit(1);
        }
    };

    init_tracing();

    // Validate the cron expression before anything touches the network
    let schedule = RefreshSchedule::from_config(&config.authorization)?;

    let resolver = Arc::new(Nip05Client::new(config.authorization.nip05_timeout)?);
    let directory = Arc::new(AuthorizationDirectory::new(&config.authorization, resolver));

    let report = directory.initialize().await;
    let snapshot = directory.snapshot();
    tracing::info!(
        authorized = snapshot.authorized.len(),
        admins = snapshot.admins.len(),
        failures = report.failures.len(),
        "✔︎ Authorization directory initialized"
    );
    if !config.authorization.enabled {
        tracing::warn!("AUTH_ENABLED=false: write and admin routes accept unauthenticated requests");
    }

    let cancel = CancellationToken::new();
    let refresh_handle = match schedule {
        Some(schedule) => Some(spawn_refresh_task(directory.clone(), schedule, cancel.clone())),
        None => {
            tracing::info!("NIP-05 disabled, username entries will not be resolved");
            None
        }
    };

    let store = Arc::new(LocalFileStore::new(config.storage_path.clone()));
    tracing::info!(path = %store.root().display(), "Using local file storage");

    let state = Arc::new(AppState::new(&config, directory, store));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = api_routes(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 API server listening on {}", addr);

    let shutdown = cancel.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
            })
            .await
    });

    wait_for_shutdown_signal().await;
    cancel.cancel();

    tracing::info!("Shutting down gracefully...");

    match tokio::time::timeout(Duration::from_secs(25), server_handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::warn!("API server error: {}", e),
        Ok(Err(e)) => tracing::warn!("API server task error: {:?}", e),
        Err(_) => tracing::warn!("API server shutdown timed out after 25s"),
    }

    if let Some(handle) = refresh_handle {
        if let Err(e) = handle.await {
            tracing::warn!("Refresh task error: {:?}", e);
        }
    }

    tracing::info!("Graceful shutdown complete");

    Ok(())
}
