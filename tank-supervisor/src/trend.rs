//! Historical trend extraction for charts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reading::Reading;
use crate::registry::Catalog;
use crate::threshold::ParameterDefinition;

/// Inclusive time window; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to:   Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| t >= from) && self.to.map_or(true, |to| t <= to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub value:     f64,
}

/// Matching records for one parameter of one scope, oldest first.
///
/// Holds borrowed records only; [`Trend::iter`] can be called any number of
/// times and always yields the same points.
#[derive(Debug, Clone)]
pub struct Trend<'a> {
    parameter_id: String,
    records:      Vec<&'a Reading>,
}

impl<'a> Trend<'a> {
    pub fn iter(&self) -> impl Iterator<Item = TrendPoint> + Clone + '_ {
        let id = self.parameter_id.as_str();
        self.records.iter().filter_map(move |r| {
            r.number(id).map(|value| TrendPoint {
                timestamp: r.timestamp,
                value,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Records of `scope_id` carrying a numeric `parameter_id` inside `range`,
/// ascending by timestamp. Equal timestamps keep their input order.
pub fn trend<'a>(
    parameter_id: &str,
    scope_id: &str,
    records: &'a [Reading],
    range: TimeRange,
) -> Trend<'a> {
    let mut matching: Vec<&Reading> = records
        .iter()
        .filter(|r| r.scope_id == scope_id && range.contains(r.timestamp))
        .filter(|r| r.number(parameter_id).is_some())
        .collect();
    matching.sort_by_key(|r| r.timestamp);

    Trend {
        parameter_id: parameter_id.to_string(),
        records: matching,
    }
}

/// A trend annotated with the parameter's bands, ready to plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendChart {
    pub scope_id:  String,
    pub parameter: ParameterDefinition,
    pub points:    Vec<TrendPoint>,
}

/// `None` when the parameter is not in the catalog.
pub fn trend_chart(
    parameter_id: &str,
    scope_id: &str,
    records: &[Reading],
    range: TimeRange,
    catalog: &Catalog,
) -> Option<TrendChart> {
    let parameter = catalog.get(parameter_id)?.clone();
    let points = trend(parameter_id, scope_id, records, range).iter().collect();
    Some(TrendChart {
        scope_id: scope_id.to_string(),
        parameter,
        points,
    })
}
