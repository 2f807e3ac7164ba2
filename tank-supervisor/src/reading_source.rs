//! ReadingSource trait and implementations.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::reading::Reading;

// ------------------------------------------------------------------ //
//  Trait                                                              //
// ------------------------------------------------------------------ //

/// Read-only access to the external reading store.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Every stored reading for `scope_id`, in store order. An unknown scope
    /// is an empty vector, not an error.
    async fn readings(&self, scope_id: &str) -> Result<Vec<Reading>>;
}

// ------------------------------------------------------------------ //
//  MemoryReadingSource                                                //
// ------------------------------------------------------------------ //

/// In-process store, used by tests and for replaying a JSON snapshot.
#[derive(Debug, Default, Clone)]
pub struct MemoryReadingSource {
    pub readings: Arc<Mutex<Vec<Reading>>>,
}

impl MemoryReadingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_readings(readings: Vec<Reading>) -> Self {
        Self {
            readings: Arc::new(Mutex::new(readings)),
        }
    }

    /// Load a JSON array of readings.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read readings file {}", path.display()))?;
        let readings: Vec<Reading> = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse readings file {}", path.display()))?;
        Ok(Self::with_readings(readings))
    }

    pub fn insert(&self, reading: Reading) {
        self.readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reading);
    }

    pub fn extend(&self, readings: impl IntoIterator<Item = Reading>) {
        self.readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(readings);
    }

    /// Non-destructive copy of everything stored.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ReadingSource for MemoryReadingSource {
    async fn readings(&self, scope_id: &str) -> Result<Vec<Reading>> {
        Ok(self
            .readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.scope_id == scope_id)
            .cloned()
            .collect())
    }
}
