use crate::services::forecast_service::ForecastError as UiForecastError;
use tenki_core::{AppError, ForecastError, NetworkError};

impl From<UiForecastError> for AppError {
    fn from(e: UiForecastError) -> Self {
        match e {
            UiForecastError::Network(e) => AppError::Network(e),
            UiForecastError::InvalidOfficeCode(code) => {
                AppError::Forecast(ForecastError::InvalidOfficeCode(code))
            }
            UiForecastError::Api(msg) => AppError::Forecast(ForecastError::ApiError(msg)),
            UiForecastError::TimedOut => AppError::Network(NetworkError::Timeout),
            UiForecastError::Catalog(e) => AppError::Region(e),
            UiForecastError::History(e) => AppError::Database(e),
        }
    }
}
