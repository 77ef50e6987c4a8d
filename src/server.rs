//!
//! inventory-gate HTTP server
//! --------------------------
//! Axum router for the check-in pages and JSON API.
//!
//! Responsibilities:
//! - Build the backend client once and inject it through `AppState`.
//! - Run the authorization gate (`gate::gate`) before every handler.
//! - Serve the protected check-in page, the public sign-in page and the API routes.
//! - Shut down gracefully on Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::backend::BackendClient;
use crate::catalog::RoleCatalog;
use crate::checkin::RecordStore;
use crate::config::Config;
use crate::identity::{IdentityProvider, PageAccessPolicy, RoutePolicy, SessionResolver, SIGN_IN_PATH};

pub mod extract;
pub mod gate;
pub mod handlers;

pub const CHECK_IN_PAGE: &str = "/inventory/check-in";
pub const ROLES_API: &str = "/api/roles";
pub const CHECK_IN_API: &str = "/api/check-in";
pub const ROLE_REQUESTS_API: &str = "/api/role-requests";
pub const HEALTH: &str = "/healthz";

/// Shared server state injected into all handlers. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub policy: Arc<PageAccessPolicy>,
    pub resolver: SessionResolver,
    pub catalog: Arc<dyn RoleCatalog>,
    pub records: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        identity: Arc<dyn IdentityProvider>,
        catalog: Arc<dyn RoleCatalog>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let policy = access_policy(&config);
        Self {
            config: Arc::new(config),
            policy: Arc::new(policy),
            resolver: SessionResolver::new(identity),
            catalog,
            records,
        }
    }

    /// All three backend seams served by one client.
    pub fn with_backend(config: Config, backend: Arc<BackendClient>) -> Self {
        Self::new(config, backend.clone(), backend.clone(), backend)
    }
}

/// Route table for the gate. Anything not listed is public; the router 404s it anyway.
pub fn access_policy(config: &Config) -> PageAccessPolicy {
    let roles = if config.roles_require_auth { RoutePolicy::protected_api() } else { RoutePolicy::public_api() };
    PageAccessPolicy::default()
        .route(CHECK_IN_PAGE, RoutePolicy::protected_page())
        .route(SIGN_IN_PATH, RoutePolicy::public_page())
        .route(HEALTH, RoutePolicy::public_api())
        .route(ROLES_API, roles)
        .route(CHECK_IN_API, RoutePolicy::protected_api())
        .route(ROLE_REQUESTS_API, RoutePolicy::protected_api())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH, get(handlers::healthz))
        .route(SIGN_IN_PATH, get(handlers::sign_in_page))
        .route(CHECK_IN_PAGE, get(handlers::check_in_page))
        .route(ROLES_API, get(handlers::list_roles))
        .route(CHECK_IN_API, post(handlers::create_check_in))
        .route(ROLE_REQUESTS_API, post(handlers::create_role_request))
        .layer(middleware::from_fn_with_state(state.clone(), gate::gate))
        .with_state(state)
}

pub async fn run_with_config(config: Config) -> anyhow::Result<()> {
    let backend = BackendClient::new(
        &config.backend_url,
        &config.backend_anon_key,
        config.backend_service_key.as_deref(),
        config.backend_timeout,
    )
    .context("While building the backend client")?;
    let port = config.http_port;
    info!(
        target: "startup",
        "inventory-gate starting: http_port={}, backend_url={}, privileged_role={}, roles_require_auth={}",
        port, config.backend_url, config.privileged_role, config.roles_require_auth
    );
    let app = router(AppState::with_backend(config, Arc::new(backend)));

    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    let listener = TcpListener::bind(addr).await.with_context(|| format!("While binding {}", addr))?;
    info!("Server running on {}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => { s.recv().await; }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
