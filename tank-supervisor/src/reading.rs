//! Time-stamped sensor readings and latest-reading resolution.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single field of a reading: numeric for measured parameters, text for
/// enum-like fields such as polarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Number(f64),
    Text(String),
}

impl ReadingValue {
    /// The value as a finite number, if it is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ReadingValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ReadingValue::Text(s) => Some(s),
            ReadingValue::Number(_) => None,
        }
    }
}

impl From<f64> for ReadingValue {
    fn from(v: f64) -> Self {
        ReadingValue::Number(v)
    }
}

impl From<&str> for ReadingValue {
    fn from(s: &str) -> Self {
        ReadingValue::Text(s.to_string())
    }
}

/// One record from the external reading store. Not every reading carries
/// every parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub scope_id:  String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub values:    BTreeMap<String, ReadingValue>,
}

impl Reading {
    pub fn new(scope_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            scope_id: scope_id.into(),
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style setter, mostly for fixtures.
    pub fn with(mut self, parameter: impl Into<String>, value: impl Into<ReadingValue>) -> Self {
        self.values.insert(parameter.into(), value.into());
        self
    }

    pub fn get(&self, parameter: &str) -> Option<&ReadingValue> {
        self.values.get(parameter)
    }

    /// Numeric value of `parameter`; `None` when absent or non-numeric.
    pub fn number(&self, parameter: &str) -> Option<f64> {
        self.get(parameter).and_then(ReadingValue::as_number)
    }
}

/// Most recent reading for `scope_id`, or `None` when the scope has no
/// records.
///
/// When several records share the newest timestamp the one that appears
/// first in `records` wins, so identical inputs always resolve identically.
pub fn latest<'a>(records: &'a [Reading], scope_id: &str) -> Option<&'a Reading> {
    let mut newest: Option<&Reading> = None;
    for r in records.iter().filter(|r| r.scope_id == scope_id) {
        match newest {
            Some(current) if r.timestamp <= current.timestamp => {}
            _ => newest = Some(r),
        }
    }
    newest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn none_for_unknown_scope() {
        let records = vec![Reading::new("tank-1", at(0))];
        assert!(latest(&records, "tank-9").is_none());
        assert!(latest(&[], "tank-1").is_none());
    }

    #[test]
    fn picks_chronological_max_regardless_of_order() {
        let records = vec![
            Reading::new("tank-1", at(20)).with("ph", 7.1),
            Reading::new("tank-1", at(60)).with("ph", 7.3),
            Reading::new("tank-2", at(90)).with("ph", 6.0),
            Reading::new("tank-1", at(40)).with("ph", 7.2),
        ];
        let r = latest(&records, "tank-1").unwrap();
        assert_eq!(r.timestamp, at(60));
        assert_eq!(r.number("ph"), Some(7.3));
    }

    #[test]
    fn ties_resolve_to_first_in_input_order() {
        let records = vec![
            Reading::new("tank-1", at(10)).with("ph", 7.0),
            Reading::new("tank-1", at(10)).with("ph", 8.0),
        ];
        assert_eq!(latest(&records, "tank-1").unwrap().number("ph"), Some(7.0));
        assert_eq!(latest(&records, "tank-1").unwrap().number("ph"), Some(7.0));
    }

    #[test]
    fn untagged_values_deserialize() {
        let r: Reading = serde_json::from_value(serde_json::json!({
            "scope_id": "line-1",
            "timestamp": "2024-05-01T08:00:00Z",
            "values": { "current": 12.1, "polarity": "B" }
        }))
        .unwrap();
        assert_eq!(r.number("current"), Some(12.1));
        assert_eq!(r.get("polarity").and_then(ReadingValue::as_text), Some("B"));
        assert_eq!(r.number("polarity"), None);
        assert_eq!(r.number("ph"), None);
    }
}
