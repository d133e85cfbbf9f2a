//! Client for the pricing/flavor-lookup service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use costplane_core::cloud::CloudType;

use crate::{check_status, ServiceError, DEFAULT_REQUEST_TIMEOUT_SECS};

/// How a flavor search selects among matching flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlavorSearchMode {
    /// Exact flavor by name (price lookup for the current flavor).
    Current,
    /// Cheapest flavor in the same family satisfying the constraints.
    CheapestInFamily,
}

/// Parameters for `POST /flavors/search`.
#[derive(Debug, Clone, Serialize)]
pub struct FlavorSearch {
    pub cloud_type: CloudType,
    pub region: String,
    pub mode: FlavorSearchMode,
    /// Flavor name for `Current` mode; family anchor for family search.
    pub flavor: Option<String>,
    /// Minimum CPU count the recommended flavor must satisfy.
    pub min_cpu: Option<i32>,
    pub os: Option<String>,
    pub currency: String,
    /// Provider-specific search hints, passed through verbatim.
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

/// A flavor returned by the lookup service.
#[derive(Debug, Clone, Deserialize)]
pub struct Flavor {
    pub name: String,
    pub cpu: i32,
    /// Price of running the flavor for one day, in the requested currency.
    pub daily_price: f64,
}

/// Parameters for `POST /generations/search`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSearch {
    pub cloud_type: CloudType,
    pub region: String,
    pub current_flavor: String,
    pub os: Option<String>,
    pub currency: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

/// A next-generation flavor proposal.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposedFlavor {
    pub flavor: String,
    pub daily_price: f64,
}

/// HTTP client for the pricing/flavor-lookup service.
pub struct PricingClient {
    client: reqwest::Client,
    base_url: String,
}

impl PricingClient {
    /// Create a client with the default request timeout.
    pub fn new(base_url: String) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, base_url }
    }

    /// Search for a flavor. Returns `None` when the catalog has no match
    /// (a valid outcome, distinct from a service failure).
    pub async fn find_flavor(
        &self,
        search: &FlavorSearch,
    ) -> Result<Option<Flavor>, ServiceError> {
        let response = self
            .client
            .post(format!("{}/flavors/search", self.base_url))
            .json(search)
            .send()
            .await?;
        let response = check_status(response).await?;
        let flavor: Option<Flavor> = response.json().await?;
        Ok(flavor)
    }

    /// Ask the generation advisor for a newer-generation flavor.
    pub async fn find_generation(
        &self,
        search: &GenerationSearch,
    ) -> Result<Option<ProposedFlavor>, ServiceError> {
        let response = self
            .client
            .post(format!("{}/generations/search", self.base_url))
            .json(search)
            .send()
            .await?;
        let response = check_status(response).await?;
        let proposed: Option<ProposedFlavor> = response.json().await?;
        Ok(proposed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flavor_search_serializes_mode_snake_case() {
        let search = FlavorSearch {
            cloud_type: CloudType::AwsCnr,
            region: "us-east-1".into(),
            mode: FlavorSearchMode::CheapestInFamily,
            flavor: Some("m5.xlarge".into()),
            min_cpu: Some(2),
            os: None,
            currency: "USD".into(),
            params: serde_json::Value::Null,
        };
        let json = serde_json::to_value(&search).unwrap();
        assert_eq!(json["mode"], "cheapest_in_family");
        assert_eq!(json["cloud_type"], "aws_cnr");
        assert!(json.get("params").is_none());
    }

    #[test]
    fn flavor_deserializes_from_service_shape() {
        let flavor: Flavor = serde_json::from_str(
            r#"{"name": "m5.large", "cpu": 2, "daily_price": 2.3}"#,
        )
        .unwrap();
        assert_eq!(flavor.name, "m5.large");
        assert_eq!(flavor.cpu, 2);
    }
}
