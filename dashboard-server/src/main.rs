use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use dashboard_core::ProblemCatalog;
use dashboard_types::Difficulty;
use dashboard_persistence::{DocumentRepository, connection::connect_and_migrate};
use dashboard_server::{auth::AuthService, config::Config, create_routes, dashboard_context};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Learn Buddy dashboard server...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let catalog = match &config.problems_file {
        Some(path) => {
            info!("Loading problems from {}", path);
            ProblemCatalog::from_file(path)
        }
        None => ProblemCatalog::bundled(),
    };
    let catalog = match catalog {
        Ok(catalog) => {
            info!(
                "Loaded {} practice problems ({} easy, {} medium, {} hard)",
                catalog.len(),
                catalog.by_difficulty(Difficulty::Easy).count(),
                catalog.by_difficulty(Difficulty::Medium).count(),
                catalog.by_difficulty(Difficulty::Hard).count(),
            );
            catalog
        }
        Err(e) => {
            tracing::error!("Failed to load practice problems: {}", e);
            std::process::exit(1);
        }
    };

    let db = match connect_and_migrate(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };
    let store = Arc::new(DocumentRepository::new(db));

    let auth_service = if config.auth_dev_mode {
        info!("Starting in development authentication mode - token verification disabled");
        Arc::new(AuthService::new_dev_mode())
    } else {
        Arc::new(AuthService::new(config.firebase_project_id.clone()))
    };

    let context = dashboard_context(auth_service, store, catalog, config.signin_path.clone())
        .with_auth_grace_period(Duration::from_secs(config.auth_grace_seconds));
    let session_manager = context.session_manager.clone();
    let routes = create_routes(context);

    // Reap idle sessions
    let connection_timeout = Duration::from_secs(config.connection_timeout_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let removed = session_manager
                .cleanup_inactive_sessions(connection_timeout)
                .await;
            if removed > 0 {
                info!(
                    "Closed {} idle sessions, {} still open ({} signed in)",
                    removed,
                    session_manager.session_count().await,
                    session_manager.signed_in_count().await
                );
            }
        }
    });

    let host = match config.host.parse::<std::net::IpAddr>() {
        Ok(host) => host,
        Err(e) => {
            tracing::error!("Invalid HOST '{}': {}", config.host, e);
            std::process::exit(1);
        }
    };

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown((host, config.port), async {
        shutdown_signal().await;
    });

    info!("Server started successfully on {}. Press Ctrl+C to stop.", addr);
    server.await;
    info!("Server shutdown complete.");
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let (Ok(mut sigint), Ok(mut sigterm)) = (
            signal::unix::signal(signal::unix::SignalKind::interrupt()),
            signal::unix::signal(signal::unix::SignalKind::terminate()),
        ) else {
            tracing::error!("Failed to install signal handlers, running until killed");
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
        }
    }

    #[cfg(not(unix))]
    {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }
}
