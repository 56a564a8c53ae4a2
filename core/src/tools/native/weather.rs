use crate::config::AgentConfig;
use crate::tools::{ParamSpec, ParamType, Tool, ToolContext, ToolError, ToolResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Configuration for weather provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Forecast endpoint (default: Open-Meteo)
    pub api_endpoint: String,
    /// Geocoding API endpoint
    pub geocoding_endpoint: String,
    /// Timeout for API requests in milliseconds
    pub timeout_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.open-meteo.com/v1/forecast".to_string(),
            geocoding_endpoint: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            timeout_ms: 10_000,
            user_agent: "freethinker-agent/0.1".to_string(),
        }
    }
}

/// Geocoding response from Open-Meteo
#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeoLocation>>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeoLocation {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

/// Forecast response from Open-Meteo (current conditions plus today's range)
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentWeather,
    daily: Option<DailyRange>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
    apparent_temperature: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    weather_code: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct DailyRange {
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
}

/// Weather capability: current conditions and today's min/max for a named place
pub struct WeatherTool {
    config: WeatherConfig,
    http_client: reqwest::Client,
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherTool {
    pub fn new() -> Self {
        Self::with_config(WeatherConfig::default())
    }

    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self::with_config(WeatherConfig {
            timeout_ms: cfg.request_timeout_ms,
            user_agent: cfg.user_agent.clone(),
            ..WeatherConfig::default()
        })
    }

    pub fn with_config(config: WeatherConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
        }
    }

    async fn get_coordinates(&self, location: &str) -> ToolResult<GeoLocation> {
        let url = format!(
            "{}?name={}&count=1",
            self.config.geocoding_endpoint,
            urlencoding::encode(location)
        );

        let resp = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolError::from_http("Geocoding request failed", e))?;

        if !resp.status().is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "Geocoding API error: {}",
                resp.status()
            )));
        }

        let data: GeocodingResponse = resp.json().await.map_err(|e| {
            ToolError::ExecutionFailed(format!("Failed to parse geocoding response: {}", e))
        })?;

        data.results
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| ToolError::NotFound(format!("Location not found: {}", location)))
    }

    async fn get_forecast(&self, lat: f64, lon: f64) -> ToolResult<ForecastResponse> {
        let url = format!(
            "{}?latitude={}&longitude={}\
             &current=temperature_2m,apparent_temperature,relative_humidity_2m,wind_speed_10m,weather_code\
             &daily=temperature_2m_min,temperature_2m_max&forecast_days=1&timezone=auto",
            self.config.api_endpoint, lat, lon
        );

        let resp = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolError::from_http("Weather request failed", e))?;

        if !resp.status().is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "Weather API error: {}",
                resp.status()
            )));
        }

        resp.json().await.map_err(|e| {
            ToolError::ExecutionFailed(format!("Failed to parse weather response: {}", e))
        })
    }

    fn interpret_weather_code(code: i32) -> &'static str {
        match code {
            0 => "Clear sky",
            1..=3 => "Mainly clear, partly cloudy, and overcast",
            45 | 48 => "Fog and depositing rime fog",
            51 | 53 | 55 => "Drizzle: Light, moderate, and dense intensity",
            56 | 57 => "Freezing Drizzle: Light and dense intensity",
            61 | 63 | 65 => "Rain: Slight, moderate and heavy intensity",
            66 | 67 => "Freezing Rain: Light and heavy intensity",
            71 | 73 | 75 => "Snow fall: Slight, moderate, and heavy intensity",
            77 => "Snow grains",
            80..=82 => "Rain showers: Slight, moderate, and violent",
            85 | 86 => "Snow showers slight and heavy",
            95 => "Thunderstorm: Slight or moderate",
            96 | 99 => "Thunderstorm with slight and heavy hail",
            _ => "Unknown",
        }
    }
}

/// Flatten a geocoded place and its forecast into the tool payload.
/// Values the forecast omits are emitted as null.
fn build_payload(place: &GeoLocation, forecast: &ForecastResponse) -> Value {
    let current = &forecast.current;
    let first = |v: Option<&Vec<Option<f64>>>| v.and_then(|xs| xs.first().copied().flatten());
    let min = first(forecast.daily.as_ref().map(|d| &d.temperature_2m_min));
    let max = first(forecast.daily.as_ref().map(|d| &d.temperature_2m_max));

    let location = match &place.country {
        Some(country) if !country.is_empty() => format!("{}, {}", place.name, country),
        _ => place.name.clone(),
    };

    json!({
        "location": location,
        "latitude": place.latitude,
        "longitude": place.longitude,
        "temp": current.temperature_2m,
        "feels_like": current.apparent_temperature,
        "min": min,
        "max": max,
        "humidity": current.relative_humidity_2m,
        "wind_speed": current.wind_speed_10m,
        "conditions": current
            .weather_code
            .map(WeatherTool::interpret_weather_code)
            .unwrap_or("Unknown"),
        "units": "metric"
    })
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> String {
        "weather".to_string()
    }

    fn description(&self) -> String {
        "Get current weather (temperature, feels-like, today's min/max, humidity, wind) for a city or place".to_string()
    }

    fn input_schema(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "location",
            ParamType::String,
            "City name or location (e.g. 'London', 'New York')",
        )]
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolResult<Value> {
        let location = arguments["location"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'location'".to_string()))?;

        debug!(target: "weather_tool", location = %location, "Fetching weather");

        let place = self.get_coordinates(location).await?;
        let forecast = self.get_forecast(place.latitude, place.longitude).await?;

        Ok(build_payload(&place, &forecast))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place() -> GeoLocation {
        GeoLocation {
            name: "Paris".into(),
            latitude: 48.85,
            longitude: 2.35,
            country: Some("France".into()),
        }
    }

    #[test]
    fn payload_carries_expected_fields() {
        let forecast: ForecastResponse = serde_json::from_value(json!({
            "current": {
                "temperature_2m": 18.2,
                "apparent_temperature": 17.0,
                "relative_humidity_2m": 60,
                "wind_speed_10m": 12.5,
                "weather_code": 2
            },
            "daily": {"temperature_2m_min": [11.0], "temperature_2m_max": [21.4]}
        }))
        .unwrap();

        let p = build_payload(&place(), &forecast);
        assert_eq!(p["location"], "Paris, France");
        assert_eq!(p["temp"], json!(18.2));
        assert_eq!(p["feels_like"], json!(17.0));
        assert_eq!(p["min"], json!(11.0));
        assert_eq!(p["max"], json!(21.4));
        assert_eq!(p["latitude"], json!(48.85));
        assert_eq!(p["conditions"], "Mainly clear, partly cloudy, and overcast");
    }

    #[test]
    fn missing_daily_range_stays_null() {
        let forecast: ForecastResponse =
            serde_json::from_value(json!({"current": {"temperature_2m": 5.0}})).unwrap();
        let p = build_payload(&place(), &forecast);
        assert_eq!(p["temp"], json!(5.0));
        assert!(p["min"].is_null());
        assert!(p["max"].is_null());
        assert!(p["feels_like"].is_null());
        assert_eq!(p["conditions"], "Unknown");
    }

    #[test]
    fn verifier_penalises_a_sparse_forecast() {
        let forecast: ForecastResponse =
            serde_json::from_value(json!({"current": {"temperature_2m": 5.0}})).unwrap();
        let inv = crate::tools::ToolInvocation::new(
            "weather",
            json!({"location": "Paris"}),
            crate::tools::RawResult::success(build_payload(&place(), &forecast)),
        );
        let v = crate::verify::Verifier::default().verify(&inv);
        assert_eq!(v.confidence, 0.7);
        assert!(v.has_flag("missing_field:min"));
        assert!(v.has_flag("missing_field:feels_like"));
    }

    #[test]
    fn weather_code_mapping() {
        assert_eq!(WeatherTool::interpret_weather_code(0), "Clear sky");
        assert_eq!(WeatherTool::interpret_weather_code(1234), "Unknown");
    }
}
