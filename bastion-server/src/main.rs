use bastion::directory::{
    GroupMembershipProvider, HostModeProvider, KerberosHostEnvironment, StaticGroupMembership,
};
use bastion::AccessDecisionEngine;
use bastion_server::{build_router, AppState};
use shared::config::Config;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Bastion HTTP Server...");

    // Load environment variables from .env file (if exists)
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();
    info!(
        capacity = config.lookup.capacity,
        ttl_secs = config.lookup.ttl.as_secs(),
        failure_ttl_secs = config.lookup.failure_ttl.as_secs(),
        anonymous_access = %config.anonymous_access,
        "Admin lookup cache configured"
    );

    let provider = init_directory(&config);
    let engine = Arc::new(AccessDecisionEngine::from_config(&config, provider));
    let state = AppState::new(engine, config.anonymous_access);

    let router = build_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("Failed to bind HTTP listener");

    info!("HTTP Server listening on http://{}", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");

    info!("Server shutdown complete.");
}

/// Domain and local group tables, picked per host at first lookup
fn init_directory(config: &Config) -> Arc<dyn GroupMembershipProvider> {
    let domain = load_groups("domain directory", config.directory_file.as_deref(), config);
    let local = load_groups("local groups", config.local_groups_file.as_deref(), config);

    Arc::new(HostModeProvider::new(
        Arc::new(KerberosHostEnvironment::default()),
        domain,
        local,
    ))
}

fn load_groups(
    label: &str,
    path: Option<&str>,
    config: &Config,
) -> Arc<dyn GroupMembershipProvider> {
    let admin_groups = config.admin_groups.iter();

    let Some(path) = path else {
        warn!("No {} file configured, every lookup will deny", label);
        return Arc::new(StaticGroupMembership::new(admin_groups));
    };

    match StaticGroupMembership::from_file(path, admin_groups) {
        Ok(directory) => {
            info!("Loaded {} from {}", label, path);
            Arc::new(directory)
        }
        Err(e) => {
            warn!("Failed to load {} from {}: {}. Every lookup will deny.", label, path, e);
            Arc::new(StaticGroupMembership::new(config.admin_groups.iter()))
        }
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
