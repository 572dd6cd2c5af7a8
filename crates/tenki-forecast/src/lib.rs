//! Forecast core for Tenki
//!
//! Builds the region catalog from the JMA area taxonomy, fetches forecast
//! documents, formats them for display, and keeps a local history.

pub mod catalog;
pub mod client;
pub mod format;
pub mod history;
pub mod types;

pub use catalog::{Center, Office, RegionCatalog};
pub use client::{WeatherClient, JMA_API_BASE};
pub use format::summarize;
pub use history::{HistoryStore, SqliteHistoryStore};
pub use types::*;
