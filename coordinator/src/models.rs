//! HTTP request/response models for the coordinator's public REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tank_supervisor::scope::Tank;
use tank_supervisor::{LoadReport, Severity, StatusReport};

// ------------------------------------------------------------------ //
//  Inbound (client → coordinator)                                     //
// ------------------------------------------------------------------ //

/// Body of every numeric propose/confirm call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SetpointRequest {
    pub value: f64,
}

/// Query string of `GET /trend/:scope_id/:parameter_id`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrendParams {
    pub from: Option<DateTime<Utc>>,
    pub to:   Option<DateTime<Utc>>,
}

// ------------------------------------------------------------------ //
//  Outbound (coordinator → client)                                    //
// ------------------------------------------------------------------ //

/// Status of one tank on a line dashboard.
#[derive(Debug, Serialize)]
pub struct TankStatus {
    pub tank:   Tank,
    pub status: StatusReport,
    /// Worst parameter severity, for the tile colour.
    pub worst:  Severity,
}

/// Response for `GET /dashboard/lines/:line_id`.
#[derive(Debug, Serialize)]
pub struct LineDashboard {
    pub line_id: String,
    pub line:    StatusReport,
    pub tanks:   Vec<TankStatus>,
    pub worst:   Severity,
}

/// Response for `POST /parameters/reload`.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub loaded:   Vec<String>,
    pub rejected: Vec<String>,
}

impl From<LoadReport> for ReloadResponse {
    fn from(report: LoadReport) -> Self {
        Self {
            loaded: report.loaded,
            rejected: report.rejected.iter().map(ToString::to_string).collect(),
        }
    }
}
