//! Parameter threshold classification.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::reading::ReadingValue;

// ------------------------------------------------------------------ //
//  Types                                                              //
// ------------------------------------------------------------------ //

/// Severity state of a single parameter reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Normal  => "normal",
            Severity::Warning => "warning",
            Severity::Error   => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity '{0}'")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    /// Accepts the canonical names plus the labels older dashboards emit
    /// ("success" and "正常" both mean normal).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "success" | "正常"      => Ok(Severity::Normal),
            "warning" | "warn"                 => Ok(Severity::Warning),
            "error" | "danger" | "critical"    => Ok(Severity::Error),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

/// Threshold definition for a single monitored parameter.
///
/// The normal band is informational only; classification uses the warning
/// and danger bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub id:   String,
    pub name: String,
    #[serde(default)]
    pub unit: String,
    pub normal_min:  f64,
    pub normal_max:  f64,
    pub warning_min: f64,
    pub warning_max: f64,
    pub danger_min:  f64,
    pub danger_max:  f64,
}

impl ParameterDefinition {
    /// Check `danger_min <= warning_min <= warning_max <= danger_max`.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |reason: String| EngineError::InvalidDefinition {
            id: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id is empty".into()));
        }

        let bounds = [
            ("normal_min", self.normal_min),
            ("normal_max", self.normal_max),
            ("warning_min", self.warning_min),
            ("warning_max", self.warning_max),
            ("danger_min", self.danger_min),
            ("danger_max", self.danger_max),
        ];
        if let Some((name, v)) = bounds.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(format!("{name} is not finite ({v})")));
        }

        if self.danger_min > self.warning_min {
            return Err(invalid(format!(
                "danger_min {} exceeds warning_min {}",
                self.danger_min, self.warning_min
            )));
        }
        if self.warning_min > self.warning_max {
            return Err(invalid(format!(
                "warning_min {} exceeds warning_max {}",
                self.warning_min, self.warning_max
            )));
        }
        if self.warning_max > self.danger_max {
            return Err(invalid(format!(
                "warning_max {} exceeds danger_max {}",
                self.warning_max, self.danger_max
            )));
        }
        Ok(())
    }
}

// ------------------------------------------------------------------ //
//  Evaluation                                                         //
// ------------------------------------------------------------------ //

/// Classify a single reading against its definition.
///
/// Bounds are inclusive: a value sitting exactly on a bound belongs to the
/// safer band.
pub fn classify(value: f64, def: &ParameterDefinition) -> EngineResult<Severity> {
    if !value.is_finite() {
        return Err(EngineError::NonNumericValue {
            parameter: def.id.clone(),
        });
    }
    if value < def.danger_min || value > def.danger_max {
        return Ok(Severity::Error);
    }
    if value < def.warning_min || value > def.warning_max {
        return Ok(Severity::Warning);
    }
    Ok(Severity::Normal)
}

/// Classify a raw reading field. Text fields (e.g. polarity) are rejected.
pub fn classify_value(value: &ReadingValue, def: &ParameterDefinition) -> EngineResult<Severity> {
    match value.as_number() {
        Some(v) => classify(v, def),
        None => Err(EngineError::NonNumericValue {
            parameter: def.id.clone(),
        }),
    }
}

/// Worst severity across a set of parameters. Presentation helper only;
/// the aggregator keeps severities per parameter.
pub fn worst_of(severities: impl IntoIterator<Item = Severity>) -> Severity {
    let mut overall = Severity::Normal;
    for s in severities {
        if s > overall {
            overall = s;
        }
    }
    overall
}

// ------------------------------------------------------------------ //
//  Tests                                                              //
// ------------------------------------------------------------------ //
