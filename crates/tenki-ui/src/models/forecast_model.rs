//! Presentation state for the forecast screen.
//!
//! Holds the two selection lists, the forecast panel and the history panel.
//! Fetches run on the services runtime and report back over an mpsc
//! channel drained by `poll_channel` or `wait_for_fetch`.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use tenki_core::AppError;
use tenki_forecast::summarize;

use crate::app_services::ForecastServices;
use crate::services::{request_forecast_fetch, ForecastError, ForecastServiceMessage};

/// Shown in the forecast panel when the forecast could not be retrieved.
pub const FETCH_FAILED_MESSAGE: &str = "天気情報の取得に失敗しました。";

/// One entry of a selection list: a code and its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownOption {
    pub key: String,
    pub text: String,
}

pub struct ForecastModel {
    services: Arc<ForecastServices>,
    tx: Sender<ForecastServiceMessage>,
    rx: Receiver<ForecastServiceMessage>,
    selected_region: Option<String>,
    selected_prefecture: Option<String>,
    prefecture_options: Vec<DropdownOption>,
    weather_lines: Vec<String>,
    history_lines: Vec<String>,
    loading: bool,
    error_message: Option<String>,
}

impl ForecastModel {
    pub fn new(services: Arc<ForecastServices>) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut model = Self {
            services,
            tx,
            rx,
            selected_region: None,
            selected_prefecture: None,
            prefecture_options: Vec::new(),
            weather_lines: Vec::new(),
            history_lines: Vec::new(),
            loading: false,
            error_message: None,
        };
        model.refresh_history();
        model
    }

    /// Regions in catalog order.
    pub fn region_options(&self) -> Vec<DropdownOption> {
        self.services
            .catalog()
            .centers()
            .iter()
            .map(|c| DropdownOption {
                key: c.code.clone(),
                text: c.name.clone(),
            })
            .collect()
    }

    /// Prefectures of the selected region, empty until a region is chosen.
    pub fn prefecture_options(&self) -> &[DropdownOption] {
        &self.prefecture_options
    }

    /// Select a region by center code.
    ///
    /// Replaces the prefecture options and clears the forecast panel.
    /// Returns `false` and changes nothing for an unknown code.
    pub fn select_region(&mut self, center_code: &str) -> bool {
        let Some(center) = self.services.catalog().center(center_code) else {
            tracing::warn!("Unknown region selected: {}", center_code);
            return false;
        };

        self.prefecture_options = center
            .offices
            .iter()
            .map(|o| DropdownOption {
                key: o.code.clone(),
                text: o.name.clone(),
            })
            .collect();
        self.selected_region = Some(center.code.clone());
        self.selected_prefecture = None;
        self.weather_lines.clear();
        self.error_message = None;
        self.loading = false;
        true
    }

    /// Select a prefecture of the current region and start fetching its
    /// forecast. Returns `false` if the code is not among the current
    /// prefecture options.
    pub fn select_prefecture(&mut self, office_code: &str) -> bool {
        if !self.prefecture_options.iter().any(|o| o.key == office_code) {
            tracing::warn!("Prefecture {} is not in the current region", office_code);
            return false;
        }

        self.selected_prefecture = Some(office_code.to_string());
        self.weather_lines.clear();
        self.error_message = None;
        self.loading = true;

        request_forecast_fetch(
            &self.tx,
            &self.services.runtime_handle(),
            self.services.client(),
            office_code.to_string(),
        );
        true
    }

    /// Handle every message that has already arrived. Returns whether
    /// anything was handled.
    pub fn poll_channel(&mut self) -> bool {
        let mut handled = false;
        while let Ok(msg) = self.rx.try_recv() {
            self.handle_message(msg);
            handled = true;
        }
        handled
    }

    /// Block until the pending fetch completes or `timeout` passes.
    /// Returns `false` if nothing was pending or the wait timed out. A timed
    /// out fetch is shown as failed and its late result is discarded.
    pub fn wait_for_fetch(&mut self, timeout: Duration) -> bool {
        if !self.loading {
            return false;
        }

        let deadline = std::time::Instant::now() + timeout;
        while self.loading {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(msg) => self.handle_message(msg),
                Err(RecvTimeoutError::Timeout) => {
                    self.loading = false;
                    self.show_fetch_failure(ForecastError::TimedOut);
                    return false;
                }
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    fn handle_message(&mut self, msg: ForecastServiceMessage) {
        match msg {
            ForecastServiceMessage::FetchDone {
                office_code,
                result,
            } => {
                if !self.loading || self.selected_prefecture.as_deref() != Some(office_code.as_str()) {
                    tracing::debug!("Dropping stale forecast for {}", office_code);
                    return;
                }
                self.loading = false;
                match result {
                    Ok(body) => self.show_forecast(&body),
                    Err(e) => self.show_fetch_failure(e),
                }
            }
        }
    }

    fn show_forecast(&mut self, body: &serde_json::Value) {
        let summary = summarize(body);
        self.weather_lines = summary.lines();

        let Some(store) = self.services.history() else {
            return;
        };
        match store.insert_summary(&summary) {
            Ok(stored) => tracing::debug!("Recorded {} forecast entries", stored),
            Err(e) => {
                tracing::error!("Failed to record forecast history: {}", e);
                self.set_error(ForecastError::from(e));
            }
        }
        self.refresh_history();
    }

    fn show_fetch_failure(&mut self, error: ForecastError) {
        tracing::error!("Failed to fetch forecast: {}", error);
        self.weather_lines = vec![FETCH_FAILED_MESSAGE.to_string()];
        self.set_error(error);
    }

    fn set_error(&mut self, error: ForecastError) {
        self.error_message = Some(AppError::from(error).user_message().to_string());
    }

    /// Reload the history panel from the store, most recent first.
    pub fn refresh_history(&mut self) {
        let Some(store) = self.services.history() else {
            self.history_lines.clear();
            return;
        };
        match store.list_all() {
            Ok(records) => {
                self.history_lines = records.iter().map(|r| r.display_text()).collect();
            }
            Err(e) => {
                tracing::error!("Failed to read forecast history: {}", e);
                self.set_error(ForecastError::from(e));
            }
        }
    }

    pub fn selected_region(&self) -> Option<&str> {
        self.selected_region.as_deref()
    }

    pub fn selected_prefecture(&self) -> Option<&str> {
        self.selected_prefecture.as_deref()
    }

    pub fn weather_lines(&self) -> &[String] {
        &self.weather_lines
    }

    pub fn history_lines(&self) -> &[String] {
        &self.history_lines
    }

    pub fn history_enabled(&self) -> bool {
        self.services.history().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.services.fetch_timeout()
    }

    /// User-facing descriptions of startup problems.
    pub fn startup_messages(&self) -> Vec<String> {
        self.services
            .startup_errors()
            .iter()
            .map(|e| AppError::from(e.clone()).user_message().to_string())
            .collect()
    }
}
