//! Shared services for the forecast front ends.
//!
//! `ForecastServices` owns the tokio runtime and everything built from
//! `Config` at startup. Startup problems with the region taxonomy or the
//! history database are recorded instead of aborting, so the front end can
//! still run and report them.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use tenki_core::Config;
use tenki_forecast::{HistoryStore, RegionCatalog, SqliteHistoryStore, WeatherClient};

use crate::services::ForecastError;

/// Extra time granted to a blocking wait beyond the HTTP timeout.
const FETCH_WAIT_MARGIN: Duration = Duration::from_secs(5);

pub struct ForecastServices {
    /// Tokio runtime for async operations
    runtime: tokio::runtime::Runtime,

    /// JMA forecast client
    client: Arc<WeatherClient>,

    /// Region/prefecture catalog (empty if the taxonomy failed to load)
    catalog: RegionCatalog,

    /// Forecast history, `None` when disabled or unavailable
    history: Option<Arc<dyn HistoryStore>>,

    /// Upper bound for waiting on one fetch
    fetch_timeout: Duration,

    /// Non-fatal problems found while starting up
    startup_errors: Vec<ForecastError>,
}

impl ForecastServices {
    /// Build all services from configuration.
    ///
    /// # Errors
    /// Fails only if the runtime or HTTP client cannot be created.
    pub fn init(config: &Config) -> Result<Arc<Self>> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("tenki-tokio")
            .build()
            .context("Failed to create tokio runtime")?;

        let client = WeatherClient::new(
            &config.forecast.api_base_url,
            config.forecast.request_timeout(),
        )
        .context("Failed to create forecast client")?;

        let mut startup_errors = Vec::new();

        let catalog = match RegionCatalog::load(&config.regions.taxonomy_path) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!("Region catalog unavailable, continuing without regions: {}", e);
                startup_errors.push(ForecastError::from(e));
                RegionCatalog::default()
            }
        };

        let history: Option<Arc<dyn HistoryStore>> = if config.history.enabled {
            match SqliteHistoryStore::open(&config.history.database_path) {
                Ok(store) => Some(Arc::new(store)),
                Err(e) => {
                    tracing::error!("Forecast history unavailable, continuing without it: {}", e);
                    startup_errors.push(ForecastError::from(e));
                    None
                }
            }
        } else {
            tracing::info!("Forecast history disabled by configuration");
            None
        };

        tracing::info!(
            "Forecast services ready: {} regions, {} offices",
            catalog.len(),
            catalog.office_count()
        );

        Ok(Arc::new(Self {
            runtime,
            client: Arc::new(client),
            catalog,
            history,
            fetch_timeout: config.forecast.request_timeout() + FETCH_WAIT_MARGIN,
            startup_errors,
        }))
    }

    /// Get a handle to the tokio runtime
    pub fn runtime_handle(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }

    pub fn client(&self) -> Arc<WeatherClient> {
        self.client.clone()
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    pub fn history(&self) -> Option<Arc<dyn HistoryStore>> {
        self.history.clone()
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn startup_errors(&self) -> &[ForecastError] {
        &self.startup_errors
    }
}
