//! JMA forecast API client.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::instrument;

use crate::types::FetchError;

pub const JMA_API_BASE: &str = "https://www.jma.go.jp/bosai";
const USER_AGENT: &str = concat!("tenki/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
}

impl WeatherClient {
    /// Create a client for the given API base URL.
    ///
    /// # Errors
    /// Returns [`FetchError::Network`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the forecast document for an office.
    ///
    /// # Errors
    /// Returns [`FetchError::InvalidOfficeCode`] unless the code is a
    /// non-empty run of ASCII letters and digits.
    pub fn forecast_url(&self, office_code: &str) -> Result<String, FetchError> {
        if office_code.is_empty() || !office_code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FetchError::InvalidOfficeCode(office_code.to_string()));
        }
        Ok(format!(
            "{}/forecast/data/forecast/{}.json",
            self.base_url, office_code
        ))
    }

    /// Fetch the forecast document for an office.
    ///
    /// The body is returned as parsed JSON; interpreting its shape is left to
    /// [`crate::summarize`].
    ///
    /// # Errors
    /// Returns [`FetchError`] on an invalid code, a transport failure, a
    /// non-success status, or a body that is not JSON. A body of `null` or
    /// an empty array, object or string is [`FetchError::Empty`].
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_forecast(&self, office_code: &str) -> Result<Value, FetchError> {
        let url = self.forecast_url(office_code)?;

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Forecast request for {} returned {}", office_code, status);
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let body: Value =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
        if is_empty_document(&body) {
            tracing::warn!("Forecast for {} is empty", office_code);
            return Err(FetchError::Empty);
        }
        Ok(body)
    }
}

fn is_empty_document(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::String(text) => text.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> WeatherClient {
        WeatherClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_forecast_url() {
        let client = WeatherClient::new("https://example.test/bosai/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.forecast_url("130000").unwrap(),
            "https://example.test/bosai/forecast/data/forecast/130000.json"
        );
    }

    #[test]
    fn test_forecast_url_rejects_path_segments() {
        let client = WeatherClient::new(JMA_API_BASE, Duration::from_secs(1)).unwrap();
        for code in ["", "../130000", "13 0000", "130000?x=1"] {
            assert!(matches!(
                client.forecast_url(code),
                Err(FetchError::InvalidOfficeCode(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_fetch_forecast_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast/data/forecast/130000.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"publishingOffice": "気象庁", "timeSeries": []}
            ])))
            .mount(&mock_server)
            .await;

        let body = client_for(&mock_server).fetch_forecast("130000").await.unwrap();

        assert_eq!(body[0]["publishingOffice"], "気象庁");
    }

    #[tokio::test]
    async fn test_fetch_forecast_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast/data/forecast/999999.json"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).fetch_forecast("999999").await;

        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_fetch_forecast_invalid_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast/data/forecast/130000.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).fetch_forecast("130000").await;

        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_forecast_empty_documents() {
        let mock_server = MockServer::start().await;

        for (office, body) in [("010000", "null"), ("020000", "[]"), ("030000", "{}")] {
            Mock::given(method("GET"))
                .and(path(format!("/forecast/data/forecast/{}.json", office)))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&mock_server)
                .await;
        }

        let client = client_for(&mock_server);
        for office in ["010000", "020000", "030000"] {
            let result = client.fetch_forecast(office).await;
            assert!(matches!(result, Err(FetchError::Empty)), "{}: {:?}", office, result);
        }
    }

    #[tokio::test]
    async fn test_fetch_forecast_invalid_code_skips_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).fetch_forecast("../etc").await;

        assert!(matches!(result, Err(FetchError::InvalidOfficeCode(_))));
    }
}
