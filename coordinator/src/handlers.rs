//! Axum HTTP handlers for the coordinator service.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, warn};

use tank_supervisor::{
    status_report, trend_chart, worst_of, CalibrationSettings, ControlField, EngineError, Reading,
    TimeRange,
};

use crate::{
    models::{LineDashboard, ReloadResponse, SetpointRequest, TankStatus, TrendParams},
    AppState,
};

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(serde_json::json!({"error": message.to_string()}))).into_response()
}

fn engine_error(e: EngineError) -> Response {
    warn!(error = %e, "rejected control request");
    error_response(StatusCode::UNPROCESSABLE_ENTITY, e)
}

async fn fetch_readings(state: &AppState, scope_id: &str) -> Result<Vec<Reading>, Response> {
    state.source.readings(scope_id).await.map_err(|e| {
        error!(error = %e, scope_id, "reading source failed");
        error_response(StatusCode::BAD_GATEWAY, e)
    })
}

// ------------------------------------------------------------------ //
//  Parameter catalog                                                  //
// ------------------------------------------------------------------ //

/// GET /parameters
pub async fn list_parameters(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let catalog = state.registry.snapshot();
    Json(catalog.iter().cloned().collect::<Vec<_>>())
}

/// POST /parameters/reload
pub async fn reload_parameters(State(state): State<Arc<AppState>>) -> Response {
    let Some(path) = state.catalog_path.as_deref() else {
        return error_response(StatusCode::CONFLICT, "no catalog file configured");
    };
    match state.registry.reload_from_file(path) {
        Ok(report) => {
            info!(loaded = report.loaded.len(), "catalog reloaded on request");
            Json(ReloadResponse::from(report)).into_response()
        }
        Err(e) => {
            error!(error = %e, "catalog reload failed");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e)
        }
    }
}

// ------------------------------------------------------------------ //
//  Scopes & status                                                    //
// ------------------------------------------------------------------ //

/// GET /lines
pub async fn list_lines(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scopes.active_lines().into_iter().cloned().collect::<Vec<_>>())
}

/// GET /lines/:line_id/tanks
pub async fn list_tanks(
    State(state): State<Arc<AppState>>,
    Path(line_id): Path<String>,
) -> impl IntoResponse {
    Json(state.scopes.active_tanks(&line_id).into_iter().cloned().collect::<Vec<_>>())
}

/// GET /status/:scope_id
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(scope_id): Path<String>,
) -> Response {
    let readings = match fetch_readings(&state, &scope_id).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let catalog = state.registry.snapshot();
    Json(status_report(&scope_id, &readings, &catalog)).into_response()
}

/// GET /dashboard/lines/:line_id
///
/// The line's own status plus each active tank's, with a worst-of rollup
/// per tank and for the whole line.
pub async fn line_dashboard(
    State(state): State<Arc<AppState>>,
    Path(line_id): Path<String>,
) -> Response {
    // One catalog snapshot for the whole page so every tile agrees.
    let catalog = state.registry.snapshot();

    let line_readings = match fetch_readings(&state, &line_id).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let line = status_report(&line_id, &line_readings, &catalog);

    let mut tanks = Vec::new();
    for tank in state.scopes.active_tanks(&line_id) {
        let readings = match fetch_readings(&state, &tank.id).await {
            Ok(r) => r,
            Err(resp) => return resp,
        };
        let status = status_report(&tank.id, &readings, &catalog);
        let worst = worst_of(status.statuses.values().copied());
        tanks.push(TankStatus {
            tank: tank.clone(),
            status,
            worst,
        });
    }

    let worst = worst_of(
        line.statuses
            .values()
            .copied()
            .chain(tanks.iter().map(|t| t.worst)),
    );

    Json(LineDashboard {
        line_id,
        line,
        tanks,
        worst,
    })
    .into_response()
}

/// GET /trend/:scope_id/:parameter_id?from=..&to=..
pub async fn get_trend(
    State(state): State<Arc<AppState>>,
    Path((scope_id, parameter_id)): Path<(String, String)>,
    Query(params): Query<TrendParams>,
) -> Response {
    let readings = match fetch_readings(&state, &scope_id).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let catalog = state.registry.snapshot();
    let range = TimeRange::new(params.from, params.to);
    match trend_chart(&parameter_id, &scope_id, &readings, range, &catalog) {
        Some(chart) => Json(chart).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("unknown parameter '{parameter_id}'"),
        ),
    }
}

// ------------------------------------------------------------------ //
//  Remote control                                                     //
// ------------------------------------------------------------------ //

/// GET /control
///
/// Snapshots of every scope an operator has changed, sorted by scope id.
pub async fn list_controls(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshots: Vec<_> = state
        .controls
        .scope_ids()
        .iter()
        .map(|id| state.controls.snapshot(id))
        .collect();
    Json(snapshots)
}

/// GET /control/:scope_id
pub async fn get_control(
    State(state): State<Arc<AppState>>,
    Path(scope_id): Path<String>,
) -> impl IntoResponse {
    Json(state.controls.snapshot(&scope_id))
}

/// PUT /control/:scope_id/settings
pub async fn put_settings(
    State(state): State<Arc<AppState>>,
    Path(scope_id): Path<String>,
    Json(settings): Json<CalibrationSettings>,
) -> Response {
    match state.controls.update_settings(&scope_id, settings) {
        Ok(preview) => Json(preview).into_response(),
        Err(e) => engine_error(e),
    }
}

/// POST /control/:scope_id/feed/propose
pub async fn propose_feed(
    State(state): State<Arc<AppState>>,
    Path(scope_id): Path<String>,
    Json(req): Json<SetpointRequest>,
) -> Response {
    match state.controls.propose_feed_amount(&scope_id, req.value) {
        Ok(preview) => Json(preview).into_response(),
        Err(e) => engine_error(e),
    }
}

/// POST /control/:scope_id/feed/confirm
pub async fn confirm_feed(
    State(state): State<Arc<AppState>>,
    Path(scope_id): Path<String>,
    Json(req): Json<SetpointRequest>,
) -> Response {
    match state.controls.confirm_feed_amount(&scope_id, req.value) {
        Ok(control) => Json(control).into_response(),
        Err(e) => engine_error(e),
    }
}

/// POST /control/:scope_id/current/propose
pub async fn propose_current(
    State(state): State<Arc<AppState>>,
    Path(scope_id): Path<String>,
    Json(req): Json<SetpointRequest>,
) -> Response {
    match state.controls.propose_current(&scope_id, req.value) {
        Ok(preview) => Json(preview).into_response(),
        Err(e) => engine_error(e),
    }
}

/// POST /control/:scope_id/current/confirm
pub async fn confirm_current(
    State(state): State<Arc<AppState>>,
    Path(scope_id): Path<String>,
    Json(req): Json<SetpointRequest>,
) -> Response {
    match state.controls.confirm_current(&scope_id, req.value) {
        Ok(control) => Json(control).into_response(),
        Err(e) => engine_error(e),
    }
}

/// POST /control/:scope_id/toggle/:field
pub async fn toggle(
    State(state): State<Arc<AppState>>,
    Path((scope_id, field)): Path<(String, String)>,
) -> Response {
    match field.parse::<ControlField>() {
        Ok(field) => Json(state.controls.toggle(&scope_id, field)).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e),
    }
}

// ------------------------------------------------------------------ //
//  Health                                                             //
// ------------------------------------------------------------------ //

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}
