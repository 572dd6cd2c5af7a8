pub mod forecast_model;

pub use forecast_model::{DropdownOption, ForecastModel, FETCH_FAILED_MESSAGE};
