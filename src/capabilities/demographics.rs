//! Concurrent name-demographics prediction
//!
//! Coordinates two independent HTTP prediction services - age and gender -
//! invoked and awaited concurrently, then merged into a single result.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::capability::{Capability, CapabilityError, StateSnapshot};
use crate::config::DemographicsConfig;

#[derive(Debug, Deserialize)]
struct AgeResponse {
    age: Option<u32>,
    count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GenderResponse {
    gender: Option<String>,
    probability: Option<f64>,
}

/// Predicts age and gender for a name, fetching both services in parallel
pub struct DemographicsCapability {
    http: reqwest::Client,
    age_url: String,
    gender_url: String,
}

impl DemographicsCapability {
    pub fn new(config: &DemographicsConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            age_url: config.age_url.clone(),
            gender_url: config.gender_url.clone(),
        }
    }

    /// The request is the name to look up; a multi-word request uses its
    /// last word.
    fn name_from_request(request: &str) -> &str {
        request
            .split_whitespace()
            .last()
            .unwrap_or("")
            .trim_matches(|c: char| !c.is_alphabetic())
    }

    async fn fetch_age(&self, name: &str) -> Result<Value, CapabilityError> {
        let response: AgeResponse = self
            .http
            .get(&self.age_url)
            .query(&[("name", name)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(json!({ "age": response.age, "count": response.count }))
    }

    async fn fetch_gender(&self, name: &str) -> Result<Value, CapabilityError> {
        let response: GenderResponse = self
            .http
            .get(&self.gender_url)
            .query(&[("name", name)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(json!({ "gender": response.gender, "probability": response.probability }))
    }
}

#[async_trait]
impl Capability for DemographicsCapability {
    async fn invoke(&self, request: &str, _state: StateSnapshot) -> Result<Value, CapabilityError> {
        let name = Self::name_from_request(request);
        if name.is_empty() {
            return Err(CapabilityError::InvalidRequest(
                "no name in demographics request".to_string(),
            ));
        }

        debug!(name = %name, "demographics lookup");
        let (age, gender) = tokio::join!(self.fetch_age(name), self.fetch_gender(name));

        Ok(json!({
            "name": name,
            "age_prediction": age?,
            "gender_prediction": gender?,
        }))
    }
}
