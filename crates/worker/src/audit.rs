//! Archive audit stream.
//!
//! Subscribes to the lifecycle event bus and writes a structured log line
//! for every archived optimization. Runs until cancelled. A reporting
//! surface can attach its own subscriber to the same bus.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use costplane_events::EventBus;

/// Run the audit subscriber loop.
pub async fn run(events: Arc<EventBus>, cancel: CancellationToken) {
    let mut rx = events.subscribe();
    tracing::info!("Archive audit subscriber started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Archive audit subscriber stopping");
                break;
            }
            received = rx.recv() => {
                match received {
                    Ok(event) => {
                        tracing::info!(
                            organization_id = %event.organization_id,
                            cloud_account_id = %event.cloud_account_id,
                            module = %event.module,
                            resource_id = %event.resource_id,
                            reason = event.reason.map(|r| r.as_str()).unwrap_or("-"),
                            description = %event.payload["description"]
                                .as_str()
                                .unwrap_or_default(),
                            "optimization archived",
                        );
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Audit subscriber lagged; events dropped");
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("Event bus closed; audit subscriber stopping");
                        break;
                    }
                }
            }
        }
    }
}
