//! Coordinator service entry point.
//!
//! # Configuration
//! Settings come from `aquamon.toml` (or the file named by `AQUAMON_CONFIG`)
//! overlaid with `AQUAMON_*` environment variables.
//!
//! | Var                          | Default              |
//! |------------------------------|----------------------|
//! | `AQUAMON_BIND_ADDR`          | `0.0.0.0:8080`       |
//! | `AQUAMON_CATALOG_PATH`       | built-in catalog     |
//! | `AQUAMON_READINGS_PATH`      | empty store          |
//! | `AQUAMON_CATALOG_POLL_SECS`  | `2`                  |

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use coordinator::{router, AppState};
use tank_supervisor::config::SupervisorConfig;
use tank_supervisor::reading_source::{MemoryReadingSource, ReadingSource};
use tank_supervisor::watcher::run_catalog_watcher;
use tank_supervisor::{ControlRegistry, ParameterRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coordinator=info".parse()?)
                .add_directive("tank_supervisor=info".parse()?),
        )
        .json()
        .init();

    let cfg = SupervisorConfig::load()?;

    let registry = match &cfg.catalog_path {
        Some(path) => {
            let (registry, report) = ParameterRegistry::from_file(path)
                .with_context(|| format!("failed to load catalog {}", path.display()))?;
            for e in &report.rejected {
                warn!(error = %e, "parameter definition skipped");
            }
            info!(path = %path.display(), loaded = report.loaded.len(), "catalog loaded");
            registry
        }
        None => {
            info!("No catalog_path; using built-in parameter catalog");
            ParameterRegistry::builtin()
        }
    };
    let registry = Arc::new(registry);

    let source: Arc<dyn ReadingSource> = match &cfg.readings_path {
        Some(path) => {
            let source = MemoryReadingSource::from_json_file(path)?;
            info!(path = %path.display(), readings = source.snapshot().len(), "readings snapshot loaded");
            Arc::new(source)
        }
        None => {
            info!("No readings_path; serving an empty reading store");
            Arc::new(MemoryReadingSource::new())
        }
    };

    if let Some(path) = cfg.catalog_path.clone() {
        tokio::spawn(run_catalog_watcher(
            path,
            Arc::clone(&registry),
            cfg.catalog_poll_interval(),
        ));
    }

    let state = Arc::new(AppState {
        registry,
        controls: ControlRegistry::new(cfg.control),
        scopes: cfg.scope_directory(),
        source,
        catalog_path: cfg.catalog_path.clone(),
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    info!(addr = %cfg.bind_addr, "coordinator listening");

    axum::serve(listener, app).await?;

    Ok(())
}
