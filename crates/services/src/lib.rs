//! HTTP clients for the external lookup services.
//!
//! The pricing/flavor-lookup service and the utilization-metrics service
//! are consumed as black boxes over HTTP. Both clients carry a bounded
//! request timeout; a timeout or error on one resource's lookup is
//! reported to the caller as a [`ServiceError`] and never aborts a whole
//! module run. Detectors convert it into a per-resource outcome.

pub mod metrics;
pub mod pricing;

pub use metrics::MetricsClient;
pub use pricing::PricingClient;

/// Default bound for a single service request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors from the external service layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Service error ({status}): {body}")]
    Api { status: u16, body: String },
}

pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::Api {
            status: status.as_u16(),
            body,
        })
    }
}
