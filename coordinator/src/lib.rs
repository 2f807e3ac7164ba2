//! Coordinator: HTTP API gateway in front of the tank supervisor.
//!
//! Dashboards poll these endpoints; every handler calls straight into
//! `tank_supervisor` and returns its plain data as JSON.

pub mod handlers;
pub mod models;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use tank_supervisor::reading_source::ReadingSource;
use tank_supervisor::scope::ScopeDirectory;
use tank_supervisor::{ControlRegistry, ParameterRegistry};

// ------------------------------------------------------------------ //
//  Shared application state                                           //
// ------------------------------------------------------------------ //

/// Shared state injected into every Axum handler via `State`.
pub struct AppState {
    /// Active parameter catalog (hot-reloadable).
    pub registry: Arc<ParameterRegistry>,
    /// Per-scope control state and calibration.
    pub controls: ControlRegistry,
    /// Lines and tanks shown on dashboards.
    pub scopes: ScopeDirectory,
    /// External reading store.
    pub source: Arc<dyn ReadingSource>,
    /// Catalog file backing `POST /parameters/reload`, if any.
    pub catalog_path: Option<PathBuf>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Parameter catalog
        .route("/parameters", get(handlers::list_parameters))
        .route("/parameters/reload", post(handlers::reload_parameters))
        // Scopes & live status
        .route("/lines", get(handlers::list_lines))
        .route("/lines/:line_id/tanks", get(handlers::list_tanks))
        .route("/status/:scope_id", get(handlers::get_status))
        .route("/dashboard/lines/:line_id", get(handlers::line_dashboard))
        // History
        .route("/trend/:scope_id/:parameter_id", get(handlers::get_trend))
        // Remote control
        .route("/control", get(handlers::list_controls))
        .route("/control/:scope_id", get(handlers::get_control))
        .route("/control/:scope_id/settings", put(handlers::put_settings))
        .route("/control/:scope_id/feed/propose", post(handlers::propose_feed))
        .route("/control/:scope_id/feed/confirm", post(handlers::confirm_feed))
        .route("/control/:scope_id/current/propose", post(handlers::propose_current))
        .route("/control/:scope_id/current/confirm", post(handlers::confirm_current))
        .route("/control/:scope_id/toggle/:field", post(handlers::toggle))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
