//! Client for the utilization-metrics service.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use costplane_core::types::Timestamp;

use crate::{check_status, ServiceError, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Metric name for average CPU utilization, percent.
pub const METRIC_CPU: &str = "cpu";

/// Metric name for inbound network traffic, bytes per second.
pub const METRIC_NETWORK_IN: &str = "network_in_bytes";

/// Metric name for outbound network traffic, bytes per second.
pub const METRIC_NETWORK_OUT: &str = "network_out_bytes";

/// Per-resource weekly activity grid: metric name to 168 hourly values
/// (day-of-week 0-6 x hour-of-day 0-23). A `null` slot means the service
/// has no data for that hour.
pub type ActivityBreakdown = HashMap<String, Vec<Option<f64>>>;

#[derive(Debug, Serialize)]
struct BreakdownRequest<'a> {
    cloud_account_id: Uuid,
    resource_ids: &'a [Uuid],
    start: Timestamp,
    end: Timestamp,
    metrics: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct BreakdownResponse {
    breakdown: HashMap<Uuid, ActivityBreakdown>,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    averages: HashMap<Uuid, HashMap<String, f64>>,
}

/// HTTP client for the utilization-metrics service.
pub struct MetricsClient {
    client: reqwest::Client,
    base_url: String,
}

impl MetricsClient {
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

    /// Fixed-width weekly activity breakdown per resource.
    ///
    /// Resources the service has never sampled are absent from the map.
    pub async fn activity_breakdown(
        &self,
        cloud_account_id: Uuid,
        resource_ids: &[Uuid],
        start: Timestamp,
        end: Timestamp,
        metrics: &[&str],
    ) -> Result<HashMap<Uuid, ActivityBreakdown>, ServiceError> {
        let request = BreakdownRequest {
            cloud_account_id,
            resource_ids,
            start,
            end,
            metrics,
        };
        let response = self
            .client
            .post(format!("{}/activity_breakdown", self.base_url))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: BreakdownResponse = response.json().await?;
        Ok(body.breakdown)
    }

    /// Window-averaged metric values per resource.
    pub async fn average_metrics(
        &self,
        cloud_account_id: Uuid,
        resource_ids: &[Uuid],
        start: Timestamp,
        end: Timestamp,
        metrics: &[&str],
    ) -> Result<HashMap<Uuid, HashMap<String, f64>>, ServiceError> {
        let request = BreakdownRequest {
            cloud_account_id,
            resource_ids,
            start,
            end,
            metrics,
        };
        let response = self
            .client
            .post(format!("{}/metrics/summary", self.base_url))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: SummaryResponse = response.json().await?;
        Ok(body.averages)
    }
}
