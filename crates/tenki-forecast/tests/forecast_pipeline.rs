//! Integration tests for the fetch -> summarize -> history pipeline using wiremock.

use std::time::Duration;

use tenki_forecast::{
    summarize, HistoryStore, RegionCatalog, SqliteHistoryStore, WeatherClient,
    NO_PRECIPITATION_DATA,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Trimmed copy of a real Tokyo forecast document.
fn tokyo_forecast() -> serde_json::Value {
    serde_json::json!([
        {
            "publishingOffice": "気象庁",
            "reportDatetime": "2024-12-01T11:00:00+09:00",
            "timeSeries": [
                {
                    "timeDefines": ["2024-12-01T11:00:00+09:00", "2024-12-02T00:00:00+09:00"],
                    "areas": [
                        {
                            "area": {"name": "東京地方", "code": "130010"},
                            "weatherCodes": ["100", "101"],
                            "weathers": ["晴れ", "晴れ　時々　くもり"],
                            "winds": ["北の風", "北の風　後　南の風"]
                        },
                        {
                            "area": {"name": "伊豆諸島北部", "code": "130020"},
                            "weatherCodes": ["200", "201"],
                            "weathers": ["くもり", "くもり　時々　晴れ"]
                        },
                        {
                            "area": {"name": "小笠原諸島", "code": "130040"},
                            "weatherCodes": ["101"],
                            "weathers": ["晴れ　時々　くもり"]
                        }
                    ]
                },
                {
                    "timeDefines": ["2024-12-01T12:00:00+09:00", "2024-12-01T18:00:00+09:00"],
                    "areas": [
                        {"area": {"name": "伊豆諸島北部", "code": "130020"}, "pops": ["20", "30"]},
                        {"area": {"name": "東京地方", "code": "130010"}, "pops": ["0", "0"]}
                    ]
                },
                {
                    "timeDefines": ["2024-12-01T09:00:00+09:00"],
                    "areas": [{"area": {"name": "東京", "code": "44132"}, "temps": ["14", "14"]}]
                }
            ]
        },
        {
            "publishingOffice": "気象庁",
            "timeSeries": [{"timeDefines": [], "areas": []}]
        }
    ])
}

#[tokio::test]
async fn test_fetch_summarize_and_store() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast/data/forecast/130000.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokyo_forecast()))
        .mount(&mock_server)
        .await;

    let client = WeatherClient::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
    let body = client.fetch_forecast("130000").await.unwrap();
    let summary = summarize(&body);

    assert!(!summary.is_failure());
    assert_eq!(
        summary.lines(),
        vec![
            "東京地方の天気: 晴れ\n降水確率: 0,0%".to_string(),
            "伊豆諸島北部の天気: くもり\n降水確率: 20,30%".to_string(),
            format!("小笠原諸島の天気: 晴れ　時々　くもり\n降水確率: {}", NO_PRECIPITATION_DATA),
        ]
    );

    let store = SqliteHistoryStore::open_in_memory().unwrap();
    assert_eq!(store.insert_summary(&summary).unwrap(), 3);

    let history = store.list_all().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].area_name, "小笠原諸島");
    assert!(history[0].display_text().contains("小笠原諸島: 晴れ　時々　くもり, 降水確率: データなし"));
}

#[tokio::test]
async fn test_server_error_produces_no_history() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast/data/forecast/130000.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = WeatherClient::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
    let store = SqliteHistoryStore::open_in_memory().unwrap();

    let result = client.fetch_forecast("130000").await;
    assert!(result.is_err());
    assert!(store.list_all().unwrap().is_empty());
}

#[test]
fn test_bundled_taxonomy_builds() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/area.json");
    let catalog = RegionCatalog::load(path).unwrap();

    assert!(!catalog.is_empty());
    let kanto = catalog.center("010300").unwrap();
    assert!(kanto.office("130000").is_some());
}
