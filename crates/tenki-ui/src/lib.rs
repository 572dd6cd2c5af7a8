//! Presentation layer for Tenki: shared services, the forecast view model
//! and a terminal front end.

pub mod app_services;
mod error_mapping;
pub mod models;
pub mod services;
pub mod terminal;

pub use app_services::ForecastServices;
pub use models::{DropdownOption, ForecastModel};
