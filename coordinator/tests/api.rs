use std::io::Write;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use coordinator::{router, AppState};
use tank_supervisor::reading_source::MemoryReadingSource;
use tank_supervisor::scope::{Line, ScopeDirectory, Tank, TankKind};
use tank_supervisor::{ControlRegistry, ParameterRegistry, Reading};

fn at(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(1_714_550_400 + secs, 0).unwrap()
}

fn directory() -> ScopeDirectory {
    ScopeDirectory::new(
        vec![Line { id: "line-1".into(), name: "Line 1".into(), order: 1, active: true }],
        vec![
            Tank {
                id: "tank-1".into(),
                name: "Tank 1".into(),
                line_id: "line-1".into(),
                kind: TankKind::Breeding,
                order: 1,
                active: true,
            },
            Tank {
                id: "tank-2".into(),
                name: "Tank 2".into(),
                line_id: "line-1".into(),
                kind: TankKind::Filter,
                order: 2,
                active: false,
            },
        ],
    )
}

fn readings() -> Vec<Reading> {
    vec![
        Reading::new("tank-1", at(0)).with("ph", 7.4).with("temperature", 20.0),
        Reading::new("tank-1", at(60)).with("ph", 8.7).with("temperature", 20.5),
        Reading::new("line-1", at(30)).with("current", 12.1).with("polarity", "A"),
    ]
}

fn app_with(catalog_path: Option<std::path::PathBuf>) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        registry: Arc::new(ParameterRegistry::builtin()),
        controls: ControlRegistry::default(),
        scopes: directory(),
        source: Arc::new(MemoryReadingSource::with_readings(readings())),
        catalog_path,
    });
    (router(Arc::clone(&state)), state)
}

fn app() -> Router {
    app_with(None).0
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send(app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn status_uses_latest_reading() {
    let (status, body) = send(app(), "GET", "/status/tank-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statuses"]["ph"], "warning");
    assert_eq!(body["statuses"]["temperature"], "normal");
    assert_eq!(body["values"]["ph"], 8.7);
}

#[tokio::test]
async fn unknown_scope_is_empty_not_an_error() {
    let (status, body) = send(app(), "GET", "/status/tank-404", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statuses"], json!({}));
    assert_eq!(body["observed_at"], Value::Null);
}

#[tokio::test]
async fn line_dashboard_lists_active_tanks_with_rollup() {
    let (status, body) = send(app(), "GET", "/dashboard/lines/line-1", None).await;
    assert_eq!(status, StatusCode::OK);
    let tanks = body["tanks"].as_array().unwrap();
    assert_eq!(tanks.len(), 1);
    assert_eq!(tanks[0]["tank"]["id"], "tank-1");
    assert_eq!(tanks[0]["worst"], "warning");
    assert_eq!(body["line"]["statuses"]["current"], "normal");
    assert_eq!(body["worst"], "warning");
}

#[tokio::test]
async fn lines_and_tanks_are_listed() {
    let (_, lines) = send(app(), "GET", "/lines", None).await;
    assert_eq!(lines.as_array().unwrap().len(), 1);

    let (_, tanks) = send(app(), "GET", "/lines/line-1/tanks", None).await;
    assert_eq!(tanks.as_array().unwrap().len(), 1);
    assert_eq!(tanks[0]["kind"], "breeding");
}

#[tokio::test]
async fn trend_is_ascending_with_bounds() {
    let (status, body) = send(app(), "GET", "/trend/tank-1/ph", None).await;
    assert_eq!(status, StatusCode::OK);
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["value"], 7.4);
    assert_eq!(points[1]["value"], 8.7);
    assert_eq!(body["parameter"]["warning_max"], 8.5);
}

#[tokio::test]
async fn trend_respects_range() {
    let uri = "/trend/tank-1/ph?from=2024-05-01T08:00:30Z";
    let (status, body) = send(app(), "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["points"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn trend_for_unknown_parameter_is_404() {
    let (status, _) = send(app(), "GET", "/trend/tank-1/salinity", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn settings_update_previews_without_committing() {
    let (app, state) = app_with(None);
    let (status, preview) = send(
        app,
        "PUT",
        "/control/line-1/settings",
        Some(json!({"coefficient": 0.01, "adjustment": 5.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["current"], 11.5);
    assert_eq!(preview["feed_amount"], 650.0);
    assert_eq!(state.controls.snapshot("line-1").state.current, 12.1);
}

#[tokio::test]
async fn feed_confirm_commits_current_too() {
    let (app, state) = app_with(None);

    let (_, preview) = send(
        app.clone(),
        "POST",
        "/control/line-1/feed/propose",
        Some(json!({"value": 700.0})),
    )
    .await;
    assert_eq!(preview["current"], 12.4);
    assert_eq!(state.controls.snapshot("line-1").state.feed_amount, 650.0);

    let (status, control) = send(
        app,
        "POST",
        "/control/line-1/feed/confirm",
        Some(json!({"value": 700.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(control["feed_amount"], 700.0);
    assert_eq!(control["current"], 12.4);
}

#[tokio::test]
async fn current_confirm_and_toggles() {
    let (app, _) = app_with(None);

    let (_, control) = send(
        app.clone(),
        "POST",
        "/control/tank-1/current/confirm",
        Some(json!({"value": 9.5})),
    )
    .await;
    assert_eq!(control["current"], 9.5);
    assert_eq!(control["feed_amount"], 650.0);

    let (_, control) = send(app.clone(), "POST", "/control/tank-1/toggle/polarity", None).await;
    assert_eq!(control["polarity"], "B");

    let (_, control) = send(app.clone(), "POST", "/control/tank-1/toggle/filter_system", None).await;
    assert_eq!(control["filter_system_on"], false);

    let (status, _) = send(app, "POST", "/control/tank-1/toggle/current", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn control_snapshot_reports_pending_proposal() {
    let (app, _) = app_with(None);
    send(
        app.clone(),
        "POST",
        "/control/line-1/current/propose",
        Some(json!({"value": 10.0})),
    )
    .await;

    let (_, snap) = send(app, "GET", "/control/line-1", None).await;
    assert_eq!(snap["pending"]["field"], "current");
    assert_eq!(snap["pending"]["value"], 10.0);
    assert_eq!(snap["state"]["current"], 12.1);
}

#[tokio::test]
async fn control_reads_do_not_register_scopes() {
    let (app, state) = app_with(None);
    for i in 0..20 {
        let (status, snap) = send(app.clone(), "GET", &format!("/control/ghost-{i}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snap["state"]["current"], 12.1);
    }
    assert!(state.controls.scope_ids().is_empty());

    send(app.clone(), "POST", "/control/tank-1/toggle/polarity", None).await;
    let (_, all) = send(app, "GET", "/control", None).await;
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["scope_id"], "tank-1");
    assert_eq!(all[0]["state"]["polarity"], "B");
}

#[tokio::test]
async fn reload_without_catalog_file_conflicts() {
    let (status, _) = send(app(), "POST", "/parameters/reload", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn reload_swaps_catalog_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [[parameter]]
        id = "ph"
        name = "pH"
        normal_min = 7.0
        normal_max = 9.0
        warning_min = 6.5
        warning_max = 9.0
        danger_min = 6.0
        danger_max = 9.5

        [[parameter]]
        id = "broken"
        name = "Broken"
        normal_min = 0.0
        normal_max = 1.0
        warning_min = 5.0
        warning_max = 1.0
        danger_min = 0.0
        danger_max = 10.0
        "#
    )
    .unwrap();

    let (app, _) = app_with(Some(file.path().to_path_buf()));
    let (status, report) = send(app.clone(), "POST", "/parameters/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["loaded"], json!(["ph"]));
    assert_eq!(report["rejected"].as_array().unwrap().len(), 1);

    let (_, params) = send(app.clone(), "GET", "/parameters", None).await;
    assert_eq!(params.as_array().unwrap().len(), 1);

    let (_, status_body) = send(app, "GET", "/status/tank-1", None).await;
    assert_eq!(status_body["statuses"]["ph"], "normal");
}
