//! Weather lookup over a wttr.in-style JSON endpoint

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::capability::{Capability, CapabilityError, StateSnapshot};
use crate::config::WeatherConfig;

#[derive(Debug, Deserialize)]
struct WttrResponse {
    current_condition: Vec<CurrentCondition>,
}

#[derive(Debug, Deserialize)]
struct CurrentCondition {
    #[serde(rename = "temp_F")]
    temp_f: String,
}

/// Fetches the current temperature for the city named in the request.
///
/// Imposes its own 10 second request timeout; the orchestration core adds
/// none.
pub struct WeatherCapability {
    http: reqwest::Client,
    base_url: String,
}

impl WeatherCapability {
    pub fn new(config: &WeatherConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// City name from a request like "what is the weather in New York?";
    /// a request with no " in " clause is treated as the city itself.
    fn city_from_request(request: &str) -> &str {
        let city = match request.rfind(" in ") {
            Some(idx) => &request[idx + 4..],
            None => request,
        };
        city.trim().trim_end_matches(['?', '.', '!'])
    }
}

#[async_trait]
impl Capability for WeatherCapability {
    async fn invoke(&self, request: &str, _state: StateSnapshot) -> Result<Value, CapabilityError> {
        let city = Self::city_from_request(request);
        if city.is_empty() {
            return Err(CapabilityError::InvalidRequest(
                "no city in weather request".to_string(),
            ));
        }

        debug!(city = %city, "weather lookup");
        let url = format!("{}/{}", self.base_url, city);
        let response: WttrResponse = self
            .http
            .get(&url)
            .query(&[("format", "j1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let condition = response
            .current_condition
            .first()
            .ok_or(CapabilityError::MissingField("current_condition"))?;

        Ok(json!(format!(
            "The current temperature in {city} is {}°F.",
            condition.temp_f
        )))
    }
}
