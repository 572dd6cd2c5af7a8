pub mod forecast_service;

pub use forecast_service::{
    request_fetch as request_forecast_fetch, ForecastError, ForecastServiceMessage,
};
