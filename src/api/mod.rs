use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, StatusCode},
    middleware,
    routing::{get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::Config;
use crate::domain::PromotionOutcome;
use crate::state::SharedState;

mod accounts;
mod api_keys;
pub mod auth;
mod brand_components;
mod error;
mod events;
mod integrations;
mod logs;
mod observability;
mod templates;
mod types;

pub use auth::{Caller, ENVIRONMENT_HEADER};
pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
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

/// 201 when promotion inserted the production row, 200 when it overwrote one.
pub(crate) const fn promotion_status(outcome: PromotionOutcome) -> StatusCode {
    match outcome {
        PromotionOutcome::Created => StatusCode::CREATED,
        PromotionOutcome::Updated => StatusCode::OK,
    }
}

/// Builds the HTTP router. Sessions live in the same `SQLite` database as
/// everything else, so logins survive a restart.
pub async fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let (cors_origins, secure_cookies, idle_minutes) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
            config.server.session_idle_minutes,
        )
    };

    let pool = state.store().conn.get_sqlite_connection_pool().clone();
    let session_store = SqliteStore::new(pool);
    session_store
        .migrate()
        .await
        .context("Failed to create session table")?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(idle_minutes)));

    let api_router = Router::new()
        .merge(create_protected_router(state.clone()))
        .merge(create_trigger_router(state.clone()))
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/set-password", post(accounts::set_password))
        .route("/auth/forgot-password", post(accounts::forgot_password))
        .route("/auth/reset-password", post(accounts::reset_password))
        .route("/health", get(observability::health))
        .layer(session_layer)
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Ok(Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware)))
}

fn create_trigger_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/events/trigger", post(events::trigger_event))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::api_key_middleware,
        ))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route(
            "/auth/api-keys",
            get(api_keys::list_keys).post(api_keys::create_key),
        )
        .route("/auth/api-keys/{id}/revoke", post(api_keys::revoke_key))
        .route(
            "/auth/api-keys/{id}",
            axum::routing::delete(api_keys::delete_key),
        )
        .route("/auth/users", get(accounts::list_users))
        .route("/auth/users/invite", post(accounts::invite_user))
        .route(
            "/auth/users/{id}",
            put(accounts::update_user).delete(accounts::delete_user),
        )
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/templates/{id}",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/templates/{id}/promote", post(templates::promote_template))
        .route("/templates/{id}/preview", post(templates::preview_template))
        .route(
            "/templates/{id}/placeholders",
            post(templates::set_placeholders),
        )
        .route(
            "/integrations",
            get(integrations::list_integrations).post(integrations::create_integration),
        )
        .route(
            "/integrations/{id}",
            get(integrations::get_integration)
                .put(integrations::update_integration)
                .delete(integrations::delete_integration),
        )
        .route(
            "/integrations/{id}/promote",
            post(integrations::promote_integration),
        )
        .route(
            "/events/definitions",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/events/definitions/{id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/events/definitions/{id}/promote",
            post(events::promote_event),
        )
        .route("/events/definitions/{id}/test", post(events::test_event))
        .route("/logs", get(logs::list_logs))
        .route("/logs/stats", get(logs::log_stats))
        .route(
            "/brand-components",
            get(brand_components::list_components).post(brand_components::create_component),
        )
        .route(
            "/brand-components/{id}",
            get(brand_components::get_component)
                .put(brand_components::update_component)
                .delete(brand_components::delete_component),
        )
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
