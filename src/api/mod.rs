use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::state::{Providers, SharedState};

pub mod auth;
mod content;
mod error;
mod health;
mod images;
mod observability;
mod subscription;
mod types;
mod usage;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Same as [`create_app_state_from_config`] with caller-supplied providers.
pub async fn create_app_state_with_providers(
    config: Config,
    providers: Providers,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::with_providers(config, providers).await?);
    Ok(create_app_state(shared, None))
}

pub fn router(state: Arc<AppState>) -> Router {
    let server = &state.config().server;
    let cors_origins = server.cors_allowed_origins.clone();

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_inactivity_minutes,
        )));

    let api_router = Router::new()
        .merge(create_entitled_router(state.clone()))
        .merge(create_protected_router())
        .merge(create_public_router())
        .layer(session_layer)
        .with_state(state);

    // Credentials cannot be combined with a wildcard origin.
    let cors_layer = if cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(true)
    }
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer)
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/content/insurance-types", get(content::list_insurance_types))
        .route("/content/tones", get(content::list_tones))
        .route("/subscription/pricing", get(subscription::pricing))
        .route("/subscription/webhook", post(subscription::webhook))
        .route("/health", get(health::health_live))
        .route("/health/ready", get(health::health_ready))
        .route("/metrics", get(observability::get_metrics))
}

/// Routes that need a signed-in agent.
fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/profile", put(auth::update_profile))
        .route("/content/schedules", get(content::list_schedules))
        .route(
            "/content/schedules/{id}",
            get(content::get_schedule).delete(content::delete_schedule),
        )
        .route("/content/current-week", get(content::current_week))
        .route("/images/download/{post_id}", get(images::download))
        .route("/subscription/status", get(subscription::status))
        .route("/subscription/checkout", post(subscription::checkout))
        .route("/subscription/portal", post(subscription::portal))
        .route("/subscription/cancel", post(subscription::cancel))
        .route("/subscription/reactivate", post(subscription::reactivate))
        .route("/usage", get(usage::summary))
        .route_layer(middleware::from_fn(auth::require_agent))
}

/// Routes that call a paid provider: signed in and entitled.
fn create_entitled_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/content/generate", post(content::generate))
        .route("/images/generate/{post_id}", post(images::generate))
        .route("/images/regenerate/{post_id}", post(images::regenerate))
        .route(
            "/images/generate-all/{schedule_id}",
            post(images::generate_all),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_entitlement,
        ))
        .route_layer(middleware::from_fn(auth::require_agent))
}
