//! Turns a raw forecast response into display and history records.

use serde::Deserialize;
use serde_json::Value;

use crate::types::{
    ForecastRecord, ForecastSummary, FormatError, WeatherArea, EMPTY_PROBABILITY_PLACEHOLDER,
    NO_PRECIPITATION_DATA,
};

/// Summarize a forecast response.
///
/// Never fails: a structurally unexpected response yields a summary with a
/// single diagnostic record and the cause in [`ForecastSummary::failure`].
pub fn summarize(response: &Value) -> ForecastSummary {
    match summarize_records(response) {
        Ok(records) => {
            tracing::debug!("Summarized {} forecast areas", records.len());
            ForecastSummary::from_records(records)
        }
        Err(e) => {
            tracing::warn!("Forecast response could not be summarized: {}", e);
            ForecastSummary::failed(e)
        }
    }
}

fn summarize_records(response: &Value) -> Result<Vec<ForecastRecord>, FormatError> {
    let editions = response.as_array().ok_or(FormatError::NotAnArray)?;
    let edition = editions.first().ok_or(FormatError::NoEditions)?;
    let time_series = edition
        .get("timeSeries")
        .and_then(Value::as_array)
        .ok_or(FormatError::MissingTimeSeries)?;

    let weather_block = time_series.first().ok_or(FormatError::MissingWeatherBlock)?;
    let weather_areas = block_areas(weather_block, "weather")?;
    let weather_areas = Vec::<WeatherArea>::deserialize(weather_areas).map_err(|source| {
        FormatError::Shape {
            block: "weather",
            source,
        }
    })?;

    let precipitation_areas: &[Value] = match time_series.get(1) {
        Some(block) => block_areas(block, "precipitation")?
            .as_array()
            .map(Vec::as_slice)
            .ok_or(FormatError::MissingAreas {
                block: "precipitation",
            })?,
        None => &[],
    };

    weather_areas
        .into_iter()
        .map(|WeatherArea { area, weathers }| {
            let name = area.name;
            let weather_text = weathers
                .into_iter()
                .next()
                .ok_or_else(|| FormatError::MissingWeather { area: name.clone() })?;
            let precipitation_text = precipitation_text(precipitation_areas, &name)?;
            Ok(ForecastRecord {
                area_name: name,
                weather_text,
                precipitation_text,
            })
        })
        .collect()
}

fn block_areas<'a>(block: &'a Value, label: &'static str) -> Result<&'a Value, FormatError> {
    block
        .get("areas")
        .ok_or(FormatError::MissingAreas { block: label })
}

/// Probability text for `area_name`.
///
/// Entries are scanned in block order up to the first one with the exact
/// same name; entries after it are never inspected.
fn precipitation_text(areas: &[Value], area_name: &str) -> Result<String, FormatError> {
    for entry in areas {
        let name = entry
            .get("area")
            .and_then(|a| a.get("name"))
            .and_then(Value::as_str)
            .ok_or(FormatError::MissingAreaName {
                block: "precipitation",
            })?;
        if name != area_name {
            continue;
        }

        let pops = match entry.get("pops") {
            Some(pops) => Option::<Vec<String>>::deserialize(pops).map_err(|source| {
                FormatError::Shape {
                    block: "precipitation",
                    source,
                }
            })?,
            None => None,
        };
        return Ok(match pops {
            Some(pops) if !pops.is_empty() => format!("{}%", pops.join(",")),
            _ => format!("{}%", EMPTY_PROBABILITY_PLACEHOLDER),
        });
    }
    Ok(NO_PRECIPITATION_DATA.to_string())
}
