//! Forecast backend: async forecast fetching.
//! Network work runs on the services runtime; results are sent via mpsc.

use std::sync::Arc;

use tenki_core::{DatabaseError, NetworkError, RegionError, ReqwestErrorExt, RusqliteErrorExt};
use tenki_forecast::{CatalogError, FetchError, HistoryError, WeatherClient};

/// Error type for forecast operations
#[derive(Debug, Clone)]
pub enum ForecastError {
    Network(NetworkError),
    InvalidOfficeCode(String),
    Api(String),
    TimedOut,
    Catalog(RegionError),
    History(DatabaseError),
}

impl std::fmt::Display for ForecastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastError::Network(e) => write!(f, "Forecast error: {}", e),
            ForecastError::InvalidOfficeCode(code) => write!(f, "Invalid office code: {}", code),
            ForecastError::Api(msg) => write!(f, "Unusable forecast response: {}", msg),
            ForecastError::TimedOut => write!(f, "Timed out waiting for forecast"),
            ForecastError::Catalog(e) => write!(f, "Region catalog error: {}", e),
            ForecastError::History(e) => write!(f, "History error: {}", e),
        }
    }
}

impl std::error::Error for ForecastError {}

impl From<FetchError> for ForecastError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::InvalidOfficeCode(code) => ForecastError::InvalidOfficeCode(code),
            FetchError::Network(e) => ForecastError::Network(e.into_network_error()),
            FetchError::Status { status, body } => ForecastError::Network(NetworkError::ServerError {
                status,
                message: body,
            }),
            FetchError::Decode(msg) => ForecastError::Api(msg),
            FetchError::Empty => ForecastError::Api(FetchError::Empty.to_string()),
        }
    }
}

impl From<HistoryError> for ForecastError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::Database(e) => ForecastError::History(e.into_database_error()),
            HistoryError::Io(e) => ForecastError::History(DatabaseError::ConnectionFailed(e.to_string())),
        }
    }
}

impl From<CatalogError> for ForecastError {
    fn from(e: CatalogError) -> Self {
        let region_error = match &e {
            CatalogError::Read { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                RegionError::NotFound(path.display().to_string())
            }
            CatalogError::Read { .. } => RegionError::Unreadable(e.to_string()),
            CatalogError::Parse(_) => RegionError::Malformed(e.to_string()),
        };
        ForecastError::Catalog(region_error)
    }
}

/// Messages sent from async operations back to the model
#[derive(Debug)]
pub enum ForecastServiceMessage {
    /// Result of fetching the forecast document for an office
    FetchDone {
        office_code: String,
        result: Result<serde_json::Value, ForecastError>,
    },
}

/// Request to fetch an office's forecast asynchronously.
/// Sends `FetchDone` on the channel when complete.
pub fn request_fetch(
    tx: &std::sync::mpsc::Sender<ForecastServiceMessage>,
    runtime: &tokio::runtime::Handle,
    client: Arc<WeatherClient>,
    office_code: String,
) {
    let tx = tx.clone();

    runtime.spawn(async move {
        let result = client.fetch_forecast(&office_code).await.map_err(|e| {
            tracing::warn!("Forecast fetch for {} failed: {}", office_code, e);
            ForecastError::from(e)
        });
        let _ = tx.send(ForecastServiceMessage::FetchDone {
            office_code,
            result,
        });
    });
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn forecast_error_display() {
        assert!(format!("{}", ForecastError::Network(NetworkError::Timeout)).contains("Forecast"));
        assert!(format!("{}", ForecastError::InvalidOfficeCode("x".into())).contains("office code"));
        assert!(format!("{}", ForecastError::TimedOut).contains("Timed out"));
    }

    #[test]
    fn status_maps_to_server_error() {
        let err = ForecastError::from(FetchError::Status {
            status: 404,
            body: "Not Found".into(),
        });
        assert!(matches!(
            err,
            ForecastError::Network(NetworkError::ServerError { status: 404, .. })
        ));
    }

    #[test]
    fn empty_body_maps_to_api_error() {
        assert!(matches!(ForecastError::from(FetchError::Empty), ForecastError::Api(_)));
        assert!(matches!(
            ForecastError::from(FetchError::Decode("eof".into())),
            ForecastError::Api(_)
        ));
    }

    #[test]
    fn missing_taxonomy_maps_to_not_found() {
        let err = ForecastError::from(CatalogError::Read {
            path: "area.json".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert!(matches!(err, ForecastError::Catalog(RegionError::NotFound(_))));
    }

    #[test]
    fn malformed_taxonomy_maps_to_malformed() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ForecastError::from(CatalogError::Parse(parse));
        assert!(matches!(err, ForecastError::Catalog(RegionError::Malformed(_))));
    }

    #[test]
    fn history_io_failure_maps_to_connection_failed() {
        let err = ForecastError::from(HistoryError::Io(std::io::Error::from(
            std::io::ErrorKind::PermissionDenied,
        )));
        assert!(matches!(err, ForecastError::History(DatabaseError::ConnectionFailed(_))));
    }
}
