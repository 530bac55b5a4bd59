//! Canonical record shape and payload normalization for the weather pipeline.
//!
//! The API returns the same envelope for forecast and history calls: a
//! `location` block, a `forecast.forecastday` list of per-day blocks, and an
//! optional `current` block. `transform` flattens that into one
//! [`WeatherRecord`] per day.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::EtlError;

// ---

/// Sentinel stored when the upstream payload carries no air-quality data.
/// Distinguishes "queried but absent" from a NULL column.
pub const AIR_QUALITY_UNAVAILABLE: &str = "N/A";

/// Which API call a record came from. Forecast and history occupy disjoint
/// namespaces for the same (date, location).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Forecast,
    History,
}

impl RecordKind {
    /// Value stored in the `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Forecast => "FORECAST",
            RecordKind::History => "HISTORY",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The sole persisted entity. Identity is (`date`, `location`, `kind`);
/// everything else is mutable on upsert except `country`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    // ---
    pub date: NaiveDate,
    pub location: String,
    pub country: String,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub humidity: f64,
    pub air_quality: String,
    pub kind: RecordKind,
}

// ---
// Raw API payload shapes (weatherapi.com envelope).

#[derive(Debug, Deserialize)]
struct ApiLocation {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct ApiDayBlock {
    date: NaiveDate,
    day: ApiDay,
}

#[derive(Debug, Deserialize)]
struct ApiDay {
    mintemp_c: Option<f64>,
    maxtemp_c: Option<f64>,
    avghumidity: f64,
}

#[derive(Debug, Deserialize)]
struct ApiAirQuality {
    co: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiCurrent {
    air_quality: Option<ApiAirQuality>,
}

// ---

/// Normalize one API payload into canonical records, one per day block.
///
/// Air quality is a quirk of the upstream shape: it only exists in the
/// `current` block, so the same CO reading is attached to every day of the
/// window rather than per day.
///
/// Fails with [`EtlError::Shape`] when the payload is missing the `location`
/// block or the `forecast.forecastday` list. A malformed individual day block
/// is logged and skipped; sibling days still produce records.
pub fn transform(payload: &Value, kind: RecordKind) -> Result<Vec<WeatherRecord>, EtlError> {
    // ---
    let location: ApiLocation = payload
        .get("location")
        .cloned()
        .ok_or_else(|| EtlError::Shape("payload has no 'location' block".into()))
        .and_then(|v| {
            serde_json::from_value(v)
                .map_err(|e| EtlError::Shape(format!("invalid 'location' block: {e}")))
        })?;

    let days = payload
        .get("forecast")
        .and_then(|f| f.get("forecastday"))
        .and_then(Value::as_array)
        .ok_or_else(|| EtlError::Shape("payload has no 'forecast.forecastday' list".into()))?;

    let air_quality = extract_air_quality(payload);

    let mut records = Vec::with_capacity(days.len());
    for (i, raw_day) in days.iter().enumerate() {
        match serde_json::from_value::<ApiDayBlock>(raw_day.clone()) {
            Ok(block) => records.push(WeatherRecord {
                date: block.date,
                location: location.name.clone(),
                country: location.country.clone(),
                min_temp: block.day.mintemp_c,
                max_temp: block.day.maxtemp_c,
                humidity: block.day.avghumidity,
                air_quality: air_quality.clone(),
                kind,
            }),
            Err(e) => {
                let name = &location.name;
                tracing::warn!("Skipping malformed day block {i} for {name}: {e}");
            }
        }
    }

    Ok(records)
}

/// CO concentration from the `current` block, or the explicit
/// "not available" marker when the payload omits it.
fn extract_air_quality(payload: &Value) -> String {
    // ---
    payload
        .get("current")
        .cloned()
        .and_then(|v| serde_json::from_value::<ApiCurrent>(v).ok())
        .and_then(|c| c.air_quality)
        .and_then(|aq| aq.co)
        .map(|co| co.to_string())
        .unwrap_or_else(|| AIR_QUALITY_UNAVAILABLE.to_string())
}

/// The 3 most recent past calendar days, newest first, computed once at run
/// start and fixed for the whole history pass.
pub fn trailing_window(today: NaiveDate) -> [NaiveDate; 3] {
    // ---
    [
        today - chrono::Duration::days(1),
        today - chrono::Duration::days(2),
        today - chrono::Duration::days(3),
    ]
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    fn forecast_payload() -> Value {
        json!({
            "location": { "name": "Paris", "country": "France" },
            "current": { "air_quality": { "co": 230.3 } },
            "forecast": { "forecastday": [
                { "date": "2024-05-10",
                  "day": { "mintemp_c": 11.2, "maxtemp_c": 21.7, "avghumidity": 64.0 } },
                { "date": "2024-05-11",
                  "day": { "mintemp_c": 12.0, "maxtemp_c": 23.1, "avghumidity": 58.0 } },
                { "date": "2024-05-12",
                  "day": { "mintemp_c": 10.4, "maxtemp_c": 19.9, "avghumidity": 71.0 } }
            ] }
        })
    }

    #[test]
    fn forecast_payload_yields_one_record_per_day() {
        let records = transform(&forecast_payload(), RecordKind::Forecast).unwrap();

        assert_eq!(records.len(), 3);
        let first = &records[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
        assert_eq!(first.location, "Paris");
        assert_eq!(first.country, "France");
        assert_eq!(first.min_temp, Some(11.2));
        assert_eq!(first.max_temp, Some(21.7));
        assert_eq!(first.humidity, 64.0);
        assert_eq!(first.kind, RecordKind::Forecast);
    }

    #[test]
    fn air_quality_is_shared_across_all_days() {
        let records = transform(&forecast_payload(), RecordKind::Forecast).unwrap();
        for record in &records {
            assert_eq!(record.air_quality, "230.3");
        }
    }

    #[test]
    fn missing_air_quality_yields_explicit_marker() {
        let payload = json!({
            "location": { "name": "Kyiv", "country": "Ukraine" },
            "forecast": { "forecastday": [
                { "date": "2024-05-09",
                  "day": { "mintemp_c": 8.0, "maxtemp_c": 16.5, "avghumidity": 70.0 } }
            ] }
        });

        let records = transform(&payload, RecordKind::History).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].air_quality, AIR_QUALITY_UNAVAILABLE);
        assert_eq!(records[0].kind, RecordKind::History);
    }

    #[test]
    fn missing_temperatures_become_none() {
        let payload = json!({
            "location": { "name": "Lima", "country": "Peru" },
            "forecast": { "forecastday": [
                { "date": "2024-05-09", "day": { "avghumidity": 80.0 } }
            ] }
        });

        let records = transform(&payload, RecordKind::Forecast).unwrap();
        assert_eq!(records[0].min_temp, None);
        assert_eq!(records[0].max_temp, None);
    }

    #[test]
    fn missing_location_block_is_a_shape_error() {
        let payload = json!({
            "forecast": { "forecastday": [] }
        });

        let err = transform(&payload, RecordKind::Forecast).unwrap_err();
        assert!(matches!(err, EtlError::Shape(_)));
    }

    #[test]
    fn missing_day_list_is_a_shape_error() {
        let payload = json!({
            "location": { "name": "Paris", "country": "France" }
        });

        let err = transform(&payload, RecordKind::Forecast).unwrap_err();
        assert!(matches!(err, EtlError::Shape(_)));
    }

    #[test]
    fn malformed_day_does_not_drop_siblings() {
        let payload = json!({
            "location": { "name": "Paris", "country": "France" },
            "forecast": { "forecastday": [
                { "date": "2024-05-10",
                  "day": { "mintemp_c": 11.2, "maxtemp_c": 21.7, "avghumidity": 64.0 } },
                { "date": "not-a-date", "day": {} },
                { "date": "2024-05-12",
                  "day": { "mintemp_c": 10.4, "maxtemp_c": 19.9, "avghumidity": 71.0 } }
            ] }
        });

        let records = transform(&payload, RecordKind::Forecast).unwrap();
        let dates: Vec<_> = records.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-05-10", "2024-05-12"]);
    }

    #[test]
    fn trailing_window_is_the_three_previous_days() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let window = trailing_window(today);

        let expected: Vec<_> = ["2024-05-09", "2024-05-08", "2024-05-07"]
            .iter()
            .map(|s| s.parse::<NaiveDate>().unwrap())
            .collect();
        assert_eq!(window.to_vec(), expected);
    }
}
