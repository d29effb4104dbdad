//! Current weather lookups via the OpenWeatherMap API.

use std::fmt;

use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;
use strum::AsRefStr;
use url::Url;

use crate::error::{BotError, Result};

const OPENWEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Trailing phrases that describe when, not where.
const TIME_SUFFIXES: [&str; 4] = [" right now", " today", " tomorrow", " now"];

/// Unit system for temperatures and wind speed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, AsRefStr, poise::ChoiceParameter)]
#[strum(serialize_all = "lowercase")]
pub enum Units {
    #[default]
    #[name = "Metric (°C, m/s)"]
    Metric,
    #[name = "Imperial (°F, mph)"]
    Imperial,
}

impl Units {
    fn temperature_symbol(self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    fn speed_unit(self) -> &'static str {
        match self {
            Units::Metric => "m/s",
            Units::Imperial => "mph",
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenWeatherResponse {
    name: String,
    weather: Vec<Condition>,
    main: MainReadings,
    wind: Wind,
    sys: Option<Sys>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Sys {
    country: Option<String>,
}

/// Current conditions at one location.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub location: String,
    pub country: Option<String>,
    pub description: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub units: Units,
}

impl WeatherReport {
    fn from_response(response: OpenWeatherResponse, units: Units) -> Self {
        let description = response
            .weather
            .into_iter()
            .map(|condition| condition.description)
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            location: response.name,
            country: response.sys.and_then(|sys| sys.country),
            description: if description.is_empty() {
                "no conditions reported".to_string()
            } else {
                description
            },
            temperature: response.main.temp,
            feels_like: response.main.feels_like,
            humidity: response.main.humidity,
            wind_speed: response.wind.speed,
            units,
        }
    }
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.units.temperature_symbol();
        f.write_str(&self.location)?;
        if let Some(country) = &self.country {
            write!(f, ", {country}")?;
        }
        write!(
            f,
            ": {}, {:.1}{symbol} (feels like {:.1}{symbol}), humidity {}%, wind {:.1} {}",
            self.description,
            self.temperature,
            self.feels_like,
            self.humidity,
            self.wind_speed,
            self.units.speed_unit()
        )
    }
}

#[derive(Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl WeatherClient {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: OPENWEATHER_API_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_endpoint(endpoint: String) -> Self {
        Self {
            client: crate::test_support::local_client(),
            api_key: "test-key".to_string(),
            endpoint,
        }
    }

    fn request_url(&self, location: &str, units: Units) -> Result<Url> {
        Ok(Url::parse_with_params(
            &self.endpoint,
            &[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", units.as_ref()),
            ],
        )?)
    }

    /// Fetch current conditions for `location`.
    ///
    /// # Errors
    ///
    /// Returns `WeatherNotFound` if the provider does not know the location,
    /// `WeatherApi` for any other non-success status, and transport or
    /// decoding errors as they occur.
    pub async fn current(&self, location: &str, units: Units) -> Result<WeatherReport> {
        debug!("Looking up weather for {location}");

        let response = self
            .client
            .get(self.request_url(location, units)?)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BotError::WeatherNotFound(location.to_string()));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            return Err(BotError::WeatherApi { status, message });
        }

        let body: OpenWeatherResponse = response.json().await?;
        Ok(WeatherReport::from_response(body, units))
    }
}

/// Extracts the place from prompts like "what's the weather in Paris?".
#[must_use]
pub fn weather_location(prompt: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets valid for slicing `prompt`.
    let lower = prompt.to_ascii_lowercase();
    let mention = lower.find("weather")?;
    let marker = lower[mention..].find(" in ")? + mention + " in ".len();

    let rest = &prompt[marker..];
    let end = rest.find(['?', '!', '\n']).unwrap_or(rest.len());
    let mut location = rest[..end].trim().trim_end_matches(['.', ',', ';', ':']).trim_end();

    for suffix in TIME_SUFFIXES {
        let len = location.len();
        if len > suffix.len()
            && location.is_char_boundary(len - suffix.len())
            && location[len - suffix.len()..].eq_ignore_ascii_case(suffix)
        {
            location = location[..len - suffix.len()].trim_end();
        }
    }

    (!location.is_empty()).then(|| location.to_string())
}
