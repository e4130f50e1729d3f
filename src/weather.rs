//! Weather snapshot and the Open-Meteo lookup.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WeatherError;

pub const HIGH_UV_THRESHOLD: f64 = 8.0;
pub const HIGH_HUMIDITY_THRESHOLD: f64 = 70.0;
pub const DRY_HUMIDITY_THRESHOLD: f64 = 30.0;

/// Raw readings as sent by callers. Derived flags are never trusted from input.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Readings {
    #[serde(alias = "uv_index", alias = "uv", default)]
    uv_index: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(alias = "temp", default)]
    temperature: f64,
}

/// A point-in-time environment snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Readings")]
pub struct WeatherState {
    pub uv_index: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    /// Celsius.
    pub temperature: f64,
    #[serde(rename = "isHighUV")]
    pub is_high_uv: bool,
    pub is_high_humidity: bool,
    pub is_dry_weather: bool,
}

impl From<Readings> for WeatherState {
    fn from(r: Readings) -> Self {
        Self::from_readings(r.uv_index, r.humidity, r.temperature)
    }
}

impl WeatherState {
    pub fn from_readings(uv_index: f64, humidity: f64, temperature: f64) -> Self {
        Self {
            uv_index,
            humidity,
            temperature,
            is_high_uv: uv_index >= HIGH_UV_THRESHOLD,
            is_high_humidity: humidity >= HIGH_HUMIDITY_THRESHOLD,
            is_dry_weather: humidity <= DRY_HUMIDITY_THRESHOLD,
        }
    }

    /// Used whenever no location or lookup is available.
    pub fn neutral() -> Self {
        Self::from_readings(3.0, 50.0, 22.0)
    }
}

impl Default for WeatherState {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Geographic coordinates supplied by the client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    pub longitude: f64,
}

impl Location {
    pub fn validate(&self) -> Result<(), WeatherError> {
        let ok = self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude);
        if ok {
            Ok(())
        } else {
            Err(WeatherError::InvalidCoordinates {
                lat: self.latitude,
                lon: self.longitude,
            })
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, location: Location) -> Result<WeatherState, WeatherError>;
}

// ── Open-Meteo ──────────────────────────────────────────────────────────

pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentBlock {
    uv_index: Option<f64>,
    relative_humidity_2m: Option<f64>,
    temperature_2m: Option<f64>,
}

impl OpenMeteoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::RequestFailed(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn current(&self, location: Location) -> Result<WeatherState, WeatherError> {
        location.validate()?;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                (
                    "current",
                    "uv_index,relative_humidity_2m,temperature_2m".to_string(),
                ),
                ("timezone", "auto".to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Upstream {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let parsed: ForecastResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::RequestFailed(format!("Invalid forecast body: {e}")))?;
        let current = parsed.current.unwrap_or_default();

        let state = WeatherState::from_readings(
            current.uv_index.unwrap_or(0.0),
            current.relative_humidity_2m.unwrap_or(0.0),
            current.temperature_2m.unwrap_or(0.0),
        );
        debug!(
            lat = location.latitude,
            lon = location.longitude,
            uv = state.uv_index,
            humidity = state.humidity,
            "Weather snapshot fetched"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn paris() -> Location {
        Location {
            latitude: 48.85,
            longitude: 2.35,
        }
    }

    #[test]
    fn thresholds_are_inclusive() {
        let w = WeatherState::from_readings(8.0, 70.0, 30.0);
        assert!(w.is_high_uv);
        assert!(w.is_high_humidity);
        assert!(!w.is_dry_weather);

        let dry = WeatherState::from_readings(7.9, 30.0, 10.0);
        assert!(!dry.is_high_uv);
        assert!(dry.is_dry_weather);
    }

    #[test]
    fn neutral_snapshot_sets_no_flags() {
        let w = WeatherState::neutral();
        assert_eq!(w.uv_index, 3.0);
        assert_eq!(w.humidity, 50.0);
        assert_eq!(w.temperature, 22.0);
        assert!(!w.is_high_uv && !w.is_high_humidity && !w.is_dry_weather);
    }

    #[test]
    fn client_supplied_flags_are_recomputed() {
        let w: WeatherState = serde_json::from_value(serde_json::json!({
            "uvIndex": 9.5,
            "humidity": 20,
            "temperature": 31,
            "isHighUV": false,
            "isDryWeather": false
        }))
        .unwrap();
        assert!(w.is_high_uv);
        assert!(w.is_dry_weather);

        let json = serde_json::to_value(w).unwrap();
        assert_eq!(json["isHighUV"], true);
    }

    #[test]
    fn coordinates_are_validated() {
        assert!(paris().validate().is_ok());
        let bad = Location {
            latitude: 120.0,
            longitude: 0.0,
        };
        assert!(matches!(
            bad.validate(),
            Err(WeatherError::InvalidCoordinates { .. })
        ));
    }

    #[tokio::test]
    async fn fetches_current_block() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("current", "uv_index,relative_humidity_2m,temperature_2m"))
            .and(query_param("forecast_days", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current": {"uv_index": 8.4, "relative_humidity_2m": 25, "temperature_2m": 29.1}
            })))
            .mount(&server)
            .await;

        let client = OpenMeteoClient::new(server.uri(), Duration::from_secs(2)).unwrap();
        let w = client.current(paris()).await.unwrap();
        assert!(w.is_high_uv);
        assert!(w.is_dry_weather);
        assert_eq!(w.temperature, 29.1);
    }

    #[tokio::test]
    async fn missing_fields_default_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = OpenMeteoClient::new(server.uri(), Duration::from_secs(2)).unwrap();
        let w = client.current(paris()).await.unwrap();
        assert_eq!(w.uv_index, 0.0);
        assert!(w.is_dry_weather);
    }

    #[tokio::test]
    async fn upstream_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = OpenMeteoClient::new(server.uri(), Duration::from_secs(2)).unwrap();
        let err = client.current(paris()).await.unwrap_err();
        assert!(matches!(err, WeatherError::Upstream { status: 503, .. }));
    }
}
