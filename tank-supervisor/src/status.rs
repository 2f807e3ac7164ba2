//! Per-scope status aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::reading::{latest, Reading};
use crate::registry::Catalog;
use crate::threshold::{classify, Severity};

/// Severity of every catalog parameter present in the scope's latest reading.
///
/// Parameters the latest reading does not carry, or carries as text, are left
/// out. A scope without readings yields an empty map.
pub fn aggregate_statuses(
    scope_id: &str,
    readings: &[Reading],
    catalog: &Catalog,
) -> BTreeMap<String, Severity> {
    aggregate_statuses_for(scope_id, readings, catalog, catalog.ids())
}

/// Same as [`aggregate_statuses`], restricted to `parameter_ids`. Ids that
/// are not in the catalog are skipped.
pub fn aggregate_statuses_for<'a>(
    scope_id: &str,
    readings: &[Reading],
    catalog: &Catalog,
    parameter_ids: impl IntoIterator<Item = &'a str>,
) -> BTreeMap<String, Severity> {
    match latest(readings, scope_id) {
        Some(reading) => classify_reading(reading, catalog, parameter_ids),
        None => BTreeMap::new(),
    }
}

fn classify_reading<'a>(
    reading: &Reading,
    catalog: &Catalog,
    parameter_ids: impl IntoIterator<Item = &'a str>,
) -> BTreeMap<String, Severity> {
    let mut statuses = BTreeMap::new();
    for id in parameter_ids {
        let Some(def) = catalog.get(id) else { continue };
        let Some(value) = reading.number(id) else { continue };
        // `number` only yields finite values, so classification cannot fail
        if let Ok(severity) = classify(value, def) {
            statuses.insert(id.to_string(), severity);
        }
    }
    statuses
}

/// Dashboard view of one scope: the latest reading's time, its numeric
/// values and their severities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub scope_id:    String,
    pub observed_at: Option<DateTime<Utc>>,
    pub values:      BTreeMap<String, f64>,
    pub statuses:    BTreeMap<String, Severity>,
}

pub fn status_report(scope_id: &str, readings: &[Reading], catalog: &Catalog) -> StatusReport {
    let Some(reading) = latest(readings, scope_id) else {
        return StatusReport {
            scope_id: scope_id.to_string(),
            observed_at: None,
            values: BTreeMap::new(),
            statuses: BTreeMap::new(),
        };
    };

    let statuses = classify_reading(reading, catalog, catalog.ids());
    let values = statuses
        .keys()
        .filter_map(|id| reading.number(id).map(|v| (id.clone(), v)))
        .collect();

    StatusReport {
        scope_id: scope_id.to_string(),
        observed_at: Some(reading.timestamp),
        values,
        statuses,
    }
}
