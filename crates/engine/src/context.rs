//! Shared run context passed into every detector.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use costplane_core::types::Timestamp;
use costplane_events::EventBus;
use costplane_services::{MetricsClient, PricingClient};

/// Everything a detector needs to run for one organization.
///
/// Detectors are stateless strategies; all state flows through this
/// context and the per-run inputs. `now` is fixed once per run so every
/// module in the run sees the same clock.
#[derive(Clone)]
pub struct DetectionContext {
    pub pool: PgPool,
    pub pricing: Arc<PricingClient>,
    pub metrics: Arc<MetricsClient>,
    pub events: Arc<EventBus>,
    pub organization_id: Uuid,
    /// Organization reporting currency for pricing lookups.
    pub currency: String,
    pub now: Timestamp,
}
