use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Shown when no precipitation area matches a forecast area.
pub const NO_PRECIPITATION_DATA: &str = "データなし";

/// Substituted when a matching precipitation area carries no probabilities.
pub const EMPTY_PROBABILITY_PLACEHOLDER: &str = "--";

/// Prefix of the single record produced when a response cannot be summarized.
pub const FORMAT_FAILURE_PREFIX: &str = "天気情報の解析に失敗しました";

// ---------------------------------------------------------------------------
// Region taxonomy (input document)
// ---------------------------------------------------------------------------

/// The provider's static area document (`area.json`).
///
/// Only `centers` and `offices` are read; the finer-grained tables the
/// provider also publishes are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionTaxonomy {
    #[serde(deserialize_with = "ordered_entries")]
    pub centers: Vec<(String, CenterEntry)>,
    #[serde(deserialize_with = "ordered_entries")]
    pub offices: Vec<(String, OfficeEntry)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CenterEntry {
    pub name: String,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfficeEntry {
    pub name: String,
}

/// Deserialize a JSON object into `(key, value)` pairs in document order.
///
/// A repeated key keeps the position of its first occurrence and the value
/// of its last, matching how a JSON object loads into an insertion-ordered map.
fn ordered_entries<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct EntriesVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object keyed by area code")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries: Vec<(String, T)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((code, value)) = map.next_entry::<String, T>()? {
                match entries.iter_mut().find(|(existing, _)| *existing == code) {
                    Some(slot) => slot.1 = value,
                    None => entries.push((code, value)),
                }
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor(PhantomData))
}

// ---------------------------------------------------------------------------
// Forecast response (input document, per request)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AreaRef {
    pub name: String,
}

/// An area entry of the weather time-series block.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WeatherArea {
    pub area: AreaRef,
    #[serde(default)]
    pub weathers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Summaries and history
// ---------------------------------------------------------------------------

/// One display/persistence row produced from a forecast area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRecord {
    pub area_name: String,
    pub weather_text: String,
    pub precipitation_text: String,
}

impl ForecastRecord {
    /// Text shown in the forecast panel.
    pub fn display_text(&self) -> String {
        if self.area_name.is_empty() {
            return self.weather_text.clone();
        }
        format!(
            "{}の天気: {}\n降水確率: {}",
            self.area_name, self.weather_text, self.precipitation_text
        )
    }
}

/// Result of summarizing one forecast response.
///
/// A summary is always renderable. When the response was structurally
/// unusable, `records` holds exactly one synthetic record describing the
/// failure and `failure` holds the cause.
#[derive(Debug)]
pub struct ForecastSummary {
    pub records: Vec<ForecastRecord>,
    pub failure: Option<FormatError>,
}

impl ForecastSummary {
    pub(crate) fn from_records(records: Vec<ForecastRecord>) -> Self {
        Self {
            records,
            failure: None,
        }
    }

    pub(crate) fn failed(cause: FormatError) -> Self {
        let record = ForecastRecord {
            area_name: String::new(),
            weather_text: format!("{}: {}", FORMAT_FAILURE_PREFIX, cause),
            precipitation_text: String::new(),
        };
        Self {
            records: vec![record],
            failure: Some(cause),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records worth keeping in history. Empty for a failed summary.
    pub fn persistable(&self) -> &[ForecastRecord] {
        if self.is_failure() {
            &[]
        } else {
            &self.records
        }
    }

    /// Display lines, one per record.
    pub fn lines(&self) -> Vec<String> {
        self.records.iter().map(ForecastRecord::display_text).collect()
    }
}

/// A forecast record as stored in history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub id: i64,
    pub area_name: String,
    pub weather_text: String,
    pub precipitation_text: String,
    pub captured_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn display_text(&self) -> String {
        format!(
            "{} - {}: {}, 降水確率: {}",
            self.captured_at.format("%Y-%m-%d %H:%M:%S"),
            self.area_name,
            self.weather_text,
            self.precipitation_text
        )
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Region taxonomy could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read region taxonomy {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed region taxonomy: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Forecast request failed before a response body was available.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid office code: {0:?}")]
    InvalidOfficeCode(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Response is not valid JSON: {0}")]
    Decode(String),
    #[error("Response carries no forecast")]
    Empty,
}

/// Forecast response did not have the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("response is not an array of forecast editions")]
    NotAnArray,
    #[error("response contains no forecast editions")]
    NoEditions,
    #[error("first edition has no timeSeries")]
    MissingTimeSeries,
    #[error("timeSeries has no weather block")]
    MissingWeatherBlock,
    #[error("{block} block has no areas")]
    MissingAreas { block: &'static str },
    #[error("{block} block has an area without a name")]
    MissingAreaName { block: &'static str },
    #[error("area {area:?} has no weather description")]
    MissingWeather { area: String },
    #[error("unexpected {block} block shape: {source}")]
    Shape {
        block: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Forecast history could not be read or written.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("History database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("History storage error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_taxonomy_keeps_document_order() {
        let taxonomy: RegionTaxonomy = serde_json::from_str(
            r#"{"centers":{"Z":{"name":"z","children":[]},"A":{"name":"a","children":[]}},"offices":{}}"#,
        )
        .unwrap();
        let codes: Vec<&str> = taxonomy.centers.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(codes, vec!["Z", "A"]);
    }

    #[test]
    fn test_taxonomy_duplicate_key_keeps_first_position() {
        let taxonomy: RegionTaxonomy = serde_json::from_str(
            r#"{"centers":{},"offices":{"1":{"name":"old"},"2":{"name":"b"},"1":{"name":"new"}}}"#,
        )
        .unwrap();
        assert_eq!(taxonomy.offices.len(), 2);
        assert_eq!(taxonomy.offices[0].0, "1");
        assert_eq!(taxonomy.offices[0].1.name, "new");
    }

    #[test]
    fn test_taxonomy_ignores_extra_fields() {
        let taxonomy: RegionTaxonomy = serde_json::from_str(
            r#"{
                "centers": {"010300": {"name": "関東甲信地方", "enName": "Kanto Koshin", "officeName": "気象庁", "children": ["130000"]}},
                "offices": {"130000": {"name": "東京都", "enName": "Tokyo", "parent": "010300", "children": []}},
                "class10s": {}
            }"#,
        )
        .unwrap();
        assert_eq!(taxonomy.centers[0].1.name, "関東甲信地方");
        assert_eq!(taxonomy.offices[0].1.name, "東京都");
    }

    #[test]
    fn test_taxonomy_missing_children_is_error() {
        let result: Result<RegionTaxonomy, _> =
            serde_json::from_str(r#"{"centers":{"C1":{"name":"Kanto"}},"offices":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_record_display_text() {
        let record = ForecastRecord {
            area_name: "東京地方".to_string(),
            weather_text: "晴れ".to_string(),
            precipitation_text: "10,20%".to_string(),
        };
        assert_eq!(record.display_text(), "東京地方の天気: 晴れ\n降水確率: 10,20%");
    }

    #[test]
    fn test_failed_summary_has_single_diagnostic_record() {
        let summary = ForecastSummary::failed(FormatError::NoEditions);
        assert!(summary.is_failure());
        assert_eq!(summary.len(), 1);
        assert!(summary.records[0].weather_text.starts_with(FORMAT_FAILURE_PREFIX));
        assert!(summary.records[0].area_name.is_empty());
        assert!(summary.persistable().is_empty());
        assert_eq!(summary.lines(), vec![summary.records[0].weather_text.clone()]);
    }

    #[test]
    fn test_history_display_text() {
        let record = HistoryRecord {
            id: 1,
            area_name: "大阪府".to_string(),
            weather_text: "くもり".to_string(),
            precipitation_text: "30%".to_string(),
            captured_at: DateTime::parse_from_rfc3339("2024-05-01T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        assert_eq!(
            record.display_text(),
            "2024-05-01 03:04:05 - 大阪府: くもり, 降水確率: 30%"
        );
    }
}
