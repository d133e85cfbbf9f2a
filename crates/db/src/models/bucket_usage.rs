//! Aggregated object-storage usage rows from the analytical store.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use costplane_core::types::Timestamp;

/// Per-bucket usage aggregate over a query window.
///
/// `tier1` counts retrieval-class requests (GET/HEAD), `tier2` counts
/// everything else (PUT/POST/LIST), matching the provider request tiers
/// the thresholds are expressed in.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BucketUsageStats {
    pub resource_id: Uuid,
    /// Average stored data size over the window, megabytes.
    pub avg_data_size_mb: f64,
    pub tier1_requests: i64,
    pub tier2_requests: i64,
    /// Most recent day with any request or transfer activity.
    pub last_activity: Option<Timestamp>,
}
