//! Tank supervisor: parameter threshold evaluation and feed/current
//! calibration for aquaculture lines and tanks.
//!
//! Everything here is synchronous and returns plain data, except the
//! [`reading_source`] seam and the catalog [`watcher`] task.

pub mod calibration;
pub mod config;
pub mod error;
pub mod reading;
pub mod reading_source;
pub mod registry;
pub mod scope;
pub mod status;
pub mod threshold;
pub mod trend;
pub mod watcher;

pub use calibration::{
    derive_current, round_tenth, CalibrationSettings, ControlDefaults, ControlField,
    ControlRegistry, ControlSnapshot, ControlState, Polarity, Preview, Proposal, ScopeControl,
    UnknownControlField,
};
pub use error::{EngineError, EngineResult};
pub use reading::{latest, Reading, ReadingValue};
pub use registry::{Catalog, LoadReport, ParameterRegistry};
pub use status::{aggregate_statuses, aggregate_statuses_for, status_report, StatusReport};
pub use threshold::{
    classify, classify_value, worst_of, ParameterDefinition, Severity, UnknownSeverity,
};
pub use trend::{trend, trend_chart, TimeRange, Trend, TrendChart, TrendPoint};
