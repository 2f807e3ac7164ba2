//! Parameter definition registry.
//!
//! A [`Catalog`] is an immutable, validated set of [`ParameterDefinition`]s.
//! [`ParameterRegistry`] holds the active catalog behind an [`ArcSwap`] so the
//! master data can be reloaded at runtime while readers keep working on the
//! snapshot they already hold.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::threshold::ParameterDefinition;

// ------------------------------------------------------------------ //
//  Catalog                                                            //
// ------------------------------------------------------------------ //

/// Validated parameter definitions keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    definitions: BTreeMap<String, ParameterDefinition>,
}

/// Outcome of loading a batch of definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Ids that made it into the catalog.
    pub loaded: Vec<String>,
    /// Definitions that were dropped, one error each.
    pub rejected: Vec<EngineError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl Catalog {
    /// Build a catalog, skipping definitions that fail validation or reuse
    /// an id that was already accepted. One bad entry never blocks the rest.
    pub fn load(definitions: impl IntoIterator<Item = ParameterDefinition>) -> (Self, LoadReport) {
        let mut catalog = Catalog::default();
        let mut report = LoadReport::default();

        for def in definitions {
            if let Err(e) = def.validate() {
                warn!(parameter = %def.id, error = %e, "rejecting parameter definition");
                report.rejected.push(e);
                continue;
            }
            if catalog.definitions.contains_key(&def.id) {
                let e = EngineError::InvalidDefinition {
                    id: def.id.clone(),
                    reason: "duplicate id".into(),
                };
                warn!(parameter = %def.id, error = %e, "rejecting parameter definition");
                report.rejected.push(e);
                continue;
            }
            report.loaded.push(def.id.clone());
            catalog.definitions.insert(def.id.clone(), def);
        }

        (catalog, report)
    }

    /// Catalog shipped with the engine, used when no catalog file is set.
    pub fn builtin() -> Self {
        Catalog::load(builtin_definitions()).0
    }

    pub fn get(&self, id: &str) -> Option<&ParameterDefinition> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Definitions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterDefinition> {
        self.definitions.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

// ------------------------------------------------------------------ //
//  Catalog file                                                       //
// ------------------------------------------------------------------ //

#[derive(Debug, Deserialize, Serialize)]
struct CatalogFile {
    #[serde(default, rename = "parameter")]
    parameters: Vec<ParameterDefinition>,
}

/// Parse a TOML catalog (`[[parameter]]` tables). Definitions are not
/// validated here; that happens in [`Catalog::load`].
pub fn parse_catalog(toml_src: &str) -> EngineResult<Vec<ParameterDefinition>> {
    let file: CatalogFile =
        toml::from_str(toml_src).map_err(|e| EngineError::Catalog(e.to_string()))?;
    Ok(file.parameters)
}

pub fn read_catalog_file(path: &Path) -> EngineResult<Vec<ParameterDefinition>> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| EngineError::Catalog(format!("{}: {e}", path.display())))?;
    parse_catalog(&src)
}

// ------------------------------------------------------------------ //
//  Registry                                                           //
// ------------------------------------------------------------------ //

/// Shared handle to the active catalog.
pub struct ParameterRegistry {
    current: ArcSwap<Catalog>,
}

impl ParameterRegistry {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: ArcSwap::from_pointee(catalog),
        }
    }

    pub fn builtin() -> Self {
        Self::new(Catalog::builtin())
    }

    /// Load the initial catalog from a TOML file.
    pub fn from_file(path: &Path) -> EngineResult<(Self, LoadReport)> {
        let (catalog, report) = Catalog::load(read_catalog_file(path)?);
        Ok((Self::new(catalog), report))
    }

    /// The catalog in force right now. Holders keep a consistent view even
    /// if a reload happens meanwhile.
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.current.load_full()
    }

    /// Replace the whole catalog in one step.
    pub fn reload(&self, definitions: impl IntoIterator<Item = ParameterDefinition>) -> LoadReport {
        let (catalog, report) = Catalog::load(definitions);
        info!(
            loaded = report.loaded.len(),
            rejected = report.rejected.len(),
            "parameter catalog reloaded"
        );
        self.current.store(Arc::new(catalog));
        report
    }

    /// Re-read `path` and swap it in. On a read/parse failure the previous
    /// catalog stays active.
    pub fn reload_from_file(&self, path: &Path) -> EngineResult<LoadReport> {
        let definitions = read_catalog_file(path)?;
        Ok(self.reload(definitions))
    }
}

impl Default for ParameterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn definition(
    id: &str,
    name: &str,
    unit: &str,
    normal: (f64, f64),
    warning: (f64, f64),
    danger: (f64, f64),
) -> ParameterDefinition {
    ParameterDefinition {
        id: id.to_string(),
        name: name.to_string(),
        unit: unit.to_string(),
        normal_min: normal.0,
        normal_max: normal.1,
        warning_min: warning.0,
        warning_max: warning.1,
        danger_min: danger.0,
        danger_max: danger.1,
    }
}

pub fn builtin_definitions() -> Vec<ParameterDefinition> {
    vec![
        definition("ph", "pH", "", (7.0, 8.0), (6.5, 8.5), (6.0, 9.0)),
        definition("oxygen_saturation", "Oxygen saturation", "%", (90.0, 110.0), (80.0, 120.0), (60.0, 140.0)),
        definition("temperature", "Temperature", "°C", (18.0, 24.0), (15.0, 27.0), (10.0, 30.0)),
        definition("chlorine", "Chlorine", "mg/L", (0.0, 0.02), (0.0, 0.05), (0.0, 0.1)),
        definition("ammonia", "Ammonia", "mg/L", (0.0, 0.5), (0.0, 1.0), (0.0, 2.0)),
        definition("current", "Current", "A", (10.0, 14.0), (8.0, 16.0), (5.0, 20.0)),
        definition("flow_rate", "Flow rate", "L/min", (40.0, 60.0), (30.0, 70.0), (20.0, 80.0)),
    ]
}
