//! Feed-to-current calibration and operator control state.
//!
//! Numeric setpoints go through a propose/confirm cycle: a proposal is only a
//! preview, nothing reaches [`ControlState`] until the matching confirm call.
//! Toggles apply immediately. Each scope owns its own [`ScopeControl`] behind
//! its own lock inside [`ControlRegistry`].

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, EngineResult};

// ------------------------------------------------------------------ //
//  Linear model                                                       //
// ------------------------------------------------------------------ //

/// `current = coefficient * feed_amount + adjustment`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    pub coefficient: f64,
    pub adjustment:  f64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            coefficient: 0.0072,
            adjustment: 7.391,
        }
    }
}

impl CalibrationSettings {
    pub fn validate(&self) -> EngineResult<()> {
        finite("coefficient", self.coefficient)?;
        finite("adjustment", self.adjustment)?;
        Ok(())
    }
}

/// Round to one decimal place, halves away from zero.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn derive_current(feed_amount: f64, settings: &CalibrationSettings) -> f64 {
    round_tenth(settings.coefficient * feed_amount + settings.adjustment)
}

fn finite(field: &'static str, value: f64) -> EngineResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::InvalidSetpoint { field, value })
    }
}

// ------------------------------------------------------------------ //
//  Control state                                                      //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    #[default]
    A,
    B,
}

impl Polarity {
    pub fn flipped(self) -> Self {
        match self {
            Polarity::A => Polarity::B,
            Polarity::B => Polarity::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    pub filter_system_on: bool,
    pub current:          f64,
    pub feed_amount:      f64,
    pub polarity:         Polarity,
}

/// Fields that flip without a confirm step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlField {
    FilterSystem,
    Polarity,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown control field '{0}'")]
pub struct UnknownControlField(pub String);

impl FromStr for ControlField {
    type Err = UnknownControlField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filter_system" | "filter_system_on" | "filterSystemOn" => Ok(ControlField::FilterSystem),
            "polarity" => Ok(ControlField::Polarity),
            other => Err(UnknownControlField(other.to_string())),
        }
    }
}

/// Starting point for a scope seen for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlDefaults {
    pub calibration:      CalibrationSettings,
    pub filter_system_on: bool,
    pub feed_amount:      f64,
    pub polarity:         Polarity,
}

impl Default for ControlDefaults {
    fn default() -> Self {
        Self {
            calibration: CalibrationSettings::default(),
            filter_system_on: true,
            feed_amount: 650.0,
            polarity: Polarity::A,
        }
    }
}

impl ControlDefaults {
    /// Every scope starts from these values, so they must be committable.
    pub fn validate(&self) -> EngineResult<()> {
        self.calibration.validate()?;
        let feed_amount = finite("feed_amount", self.feed_amount)?;
        finite("current", derive_current(feed_amount, &self.calibration))?;
        Ok(())
    }

    fn initial_state(&self) -> ControlState {
        ControlState {
            filter_system_on: self.filter_system_on,
            current: derive_current(self.feed_amount, &self.calibration),
            feed_amount: self.feed_amount,
            polarity: self.polarity,
        }
    }
}

// ------------------------------------------------------------------ //
//  Per-scope controller                                               //
// ------------------------------------------------------------------ //

/// An operator entry that has not been confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum Proposal {
    FeedAmount(f64),
    Current(f64),
}

/// What the operator is asked to confirm, computed from the settings in
/// force at the time of the call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preview {
    pub feed_amount: f64,
    pub current:     f64,
}

#[derive(Debug, Clone)]
pub struct ScopeControl {
    state:    ControlState,
    settings: CalibrationSettings,
    pending:  Option<Proposal>,
}

impl ScopeControl {
    pub fn new(state: ControlState, settings: CalibrationSettings) -> Self {
        Self {
            state,
            settings,
            pending: None,
        }
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    pub fn pending(&self) -> Option<Proposal> {
        self.pending
    }

    /// Values to show for confirmation. A pending feed proposal (or, without
    /// one, the committed feed amount) is always re-derived here, so a
    /// settings change can never leave a stale current on screen.
    pub fn preview(&self) -> Preview {
        match self.pending {
            Some(Proposal::Current(current)) => Preview {
                feed_amount: self.state.feed_amount,
                current,
            },
            Some(Proposal::FeedAmount(feed_amount)) => Preview {
                feed_amount,
                current: derive_current(feed_amount, &self.settings),
            },
            None => Preview {
                feed_amount: self.state.feed_amount,
                current: derive_current(self.state.feed_amount, &self.settings),
            },
        }
    }

    /// Swap both calibration terms at once. Committed state is untouched.
    pub fn update_settings(&mut self, settings: CalibrationSettings) -> EngineResult<Preview> {
        settings.validate()?;
        self.settings = settings;
        Ok(self.preview())
    }

    pub fn propose_feed_amount(&mut self, feed_amount: f64) -> EngineResult<Preview> {
        let feed_amount = finite("feed_amount", feed_amount)?;
        finite("current", derive_current(feed_amount, &self.settings))?;
        self.pending = Some(Proposal::FeedAmount(feed_amount));
        Ok(self.preview())
    }

    pub fn propose_current(&mut self, current: f64) -> EngineResult<Preview> {
        let current = finite("current", current)?;
        self.pending = Some(Proposal::Current(current));
        Ok(self.preview())
    }

    pub fn confirm_current(&mut self, current: f64) -> EngineResult<ControlState> {
        let current = finite("current", current)?;
        self.state.current = current;
        self.pending = None;
        Ok(self.state)
    }

    /// Commit a feed amount together with the current it implies under the
    /// present settings. Both fields change or neither does.
    pub fn confirm_feed_amount(&mut self, feed_amount: f64) -> EngineResult<ControlState> {
        let feed_amount = finite("feed_amount", feed_amount)?;
        let current = finite("current", derive_current(feed_amount, &self.settings))?;
        self.state = ControlState {
            feed_amount,
            current,
            ..self.state
        };
        self.pending = None;
        Ok(self.state)
    }

    pub fn toggle(&mut self, field: ControlField) -> ControlState {
        match field {
            ControlField::FilterSystem => self.state.filter_system_on = !self.state.filter_system_on,
            ControlField::Polarity => self.state.polarity = self.state.polarity.flipped(),
        }
        self.state
    }
}

// ------------------------------------------------------------------ //
//  Registry of scopes                                                 //
// ------------------------------------------------------------------ //

/// Everything a control panel needs for one scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlSnapshot {
    pub scope_id: String,
    pub state:    ControlState,
    pub settings: CalibrationSettings,
    pub pending:  Option<Proposal>,
    pub preview:  Preview,
}

/// Control state for every line/tank, created from `defaults` on the
/// first write.
///
/// Calls for one scope are serialized on that scope's mutex; the outer map
/// lock is only held for lookup/insert.
#[derive(Default)]
pub struct ControlRegistry {
    defaults: ControlDefaults,
    scopes:   Mutex<HashMap<String, Arc<Mutex<ScopeControl>>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ControlRegistry {
    pub fn new(defaults: ControlDefaults) -> Self {
        Self {
            defaults,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, scope_id: &str) -> Arc<Mutex<ScopeControl>> {
        let mut scopes = lock(&self.scopes);
        scopes
            .entry(scope_id.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(ScopeControl::new(
                    self.defaults.initial_state(),
                    self.defaults.calibration,
                )))
            })
            .clone()
    }

    fn existing(&self, scope_id: &str) -> Option<Arc<Mutex<ScopeControl>>> {
        lock(&self.scopes).get(scope_id).cloned()
    }

    /// Read one scope's controller. Scopes never written to are answered
    /// from `defaults` and are not added to the registry.
    fn read_scope<R>(&self, scope_id: &str, f: impl FnOnce(&ScopeControl) -> R) -> R {
        match self.existing(scope_id) {
            Some(entry) => {
                let control = lock(&entry);
                f(&control)
            }
            None => f(&ScopeControl::new(
                self.defaults.initial_state(),
                self.defaults.calibration,
            )),
        }
    }

    /// Run `f` with exclusive access to one scope's controller.
    pub fn with_scope<R>(&self, scope_id: &str, f: impl FnOnce(&mut ScopeControl) -> R) -> R {
        let entry = self.entry(scope_id);
        let mut control = lock(&entry);
        f(&mut control)
    }

    pub fn snapshot(&self, scope_id: &str) -> ControlSnapshot {
        self.read_scope(scope_id, |c| ControlSnapshot {
            scope_id: scope_id.to_string(),
            state: c.state,
            settings: c.settings,
            pending: c.pending,
            preview: c.preview(),
        })
    }

    /// Scopes changed by an operator so far, sorted.
    pub fn scope_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock(&self.scopes).keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Current implied by `feed_amount` under the scope's settings.
    pub fn derive_current(&self, scope_id: &str, feed_amount: f64) -> f64 {
        self.read_scope(scope_id, |c| derive_current(feed_amount, &c.settings))
    }

    pub fn update_settings(&self, scope_id: &str, settings: CalibrationSettings) -> EngineResult<Preview> {
        let preview = self.with_scope(scope_id, |c| c.update_settings(settings))?;
        info!(
            scope_id,
            coefficient = settings.coefficient,
            adjustment = settings.adjustment,
            "calibration settings updated"
        );
        Ok(preview)
    }

    pub fn propose_feed_amount(&self, scope_id: &str, feed_amount: f64) -> EngineResult<Preview> {
        self.with_scope(scope_id, |c| c.propose_feed_amount(feed_amount))
    }

    pub fn propose_current(&self, scope_id: &str, current: f64) -> EngineResult<Preview> {
        self.with_scope(scope_id, |c| c.propose_current(current))
    }

    pub fn confirm_current(&self, scope_id: &str, current: f64) -> EngineResult<ControlState> {
        let state = self.with_scope(scope_id, |c| c.confirm_current(current))?;
        info!(scope_id, current = state.current, "current confirmed");
        Ok(state)
    }

    pub fn confirm_feed_amount(&self, scope_id: &str, feed_amount: f64) -> EngineResult<ControlState> {
        let state = self.with_scope(scope_id, |c| c.confirm_feed_amount(feed_amount))?;
        info!(
            scope_id,
            feed_amount = state.feed_amount,
            current = state.current,
            "feed amount confirmed"
        );
        Ok(state)
    }

    pub fn toggle(&self, scope_id: &str, field: ControlField) -> ControlState {
        let state = self.with_scope(scope_id, |c| c.toggle(field));
        info!(
            scope_id,
            filter_system_on = state.filter_system_on,
            polarity = ?state.polarity,
            "control toggled"
        );
        state
    }
}
