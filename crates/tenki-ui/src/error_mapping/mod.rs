//! Maps UI service errors to tenki_core::AppError for consistent user-facing messages.

mod forecast;
