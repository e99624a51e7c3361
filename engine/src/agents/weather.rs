//! Weather agent
//!
//! Fetches current conditions (and optionally a 3-day forecast) for a
//! coordinate pair from the Open-Meteo forecast API. WMO weather codes
//! are translated to short condition texts so the model never has to
//! interpret numeric codes.

use super::{map_transport, AgentError};
use std::time::Duration;

/// Days of daily forecast requested when the forecast flag is set
const FORECAST_DAYS: u8 = 3;

pub struct WeatherAgent {
    endpoint: String,
    client: reqwest::Client,
}

impl WeatherAgent {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Fetch current conditions, optionally with the short daily forecast.
    pub async fn current(
        &self,
        latitude: f64,
        longitude: f64,
        forecast: bool,
    ) -> Result<String, AgentError> {
        let mut params = vec![
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("current_weather", "true".to_string()),
        ];
        if forecast {
            params.push((
                "daily",
                "weathercode,temperature_2m_max,temperature_2m_min".to_string(),
            ));
            params.push(("forecast_days", FORECAST_DAYS.to_string()));
            params.push(("timezone", "auto".to_string()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Upstream { status, body });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        format_report(&data)
    }
}

/// Translate a WMO weather code into a short condition text.
fn describe_weather_code(code: u64) -> &'static str {
    match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 | 48 => "fog",
        51 | 53 | 55 => "drizzle",
        56 | 57 => "freezing drizzle",
        61 | 63 | 65 => "rain",
        66 | 67 => "freezing rain",
        71 | 73 | 75 => "snowfall",
        77 => "snow grains",
        80 | 81 | 82 => "rain showers",
        85 | 86 => "snow showers",
        95 => "thunderstorm",
        96 | 99 => "thunderstorm with hail",
        _ => "unknown conditions",
    }
}

/// Render the current-conditions block plus any daily forecast rows.
fn format_report(data: &serde_json::Value) -> Result<String, AgentError> {
    let current = data
        .get("current_weather")
        .ok_or_else(|| AgentError::Parse("missing current_weather".to_string()))?;

    let temperature = current
        .get("temperature")
        .and_then(|t| t.as_f64())
        .ok_or_else(|| AgentError::Parse("missing temperature".to_string()))?;
    let windspeed = current
        .get("windspeed")
        .and_then(|w| w.as_f64())
        .ok_or_else(|| AgentError::Parse("missing windspeed".to_string()))?;
    let code = current
        .get("weathercode")
        .and_then(|c| c.as_u64())
        .unwrap_or(u64::MAX);

    let mut out = format!(
        "Current weather: {:.1}°C, {}, wind {:.1} km/h",
        temperature,
        describe_weather_code(code),
        windspeed
    );

    if let Some(daily) = data.get("daily") {
        let dates = daily.get("time").and_then(|t| t.as_array());
        let codes = daily.get("weathercode").and_then(|c| c.as_array());
        let highs = daily.get("temperature_2m_max").and_then(|t| t.as_array());
        let lows = daily.get("temperature_2m_min").and_then(|t| t.as_array());

        if let (Some(dates), Some(codes), Some(highs), Some(lows)) = (dates, codes, highs, lows) {
            out.push_str("\nForecast:");
            for i in 0..dates.len().min(FORECAST_DAYS as usize) {
                let date = dates[i].as_str().unwrap_or("?");
                let condition = codes[i]
                    .as_u64()
                    .map(describe_weather_code)
                    .unwrap_or("unknown conditions");
                let high = highs[i].as_f64().unwrap_or(f64::NAN);
                let low = lows[i].as_f64().unwrap_or(f64::NAN);
                out.push_str(&format!(
                    "\n{}: {:.1}°C to {:.1}°C, {}",
                    date, low, high, condition
                ));
            }
        }
    }

    Ok(out)
}
