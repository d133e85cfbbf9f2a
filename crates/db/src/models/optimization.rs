//! Optimization and archived-optimization entity models.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use costplane_core::archive::ArchiveReason;
use costplane_core::types::Timestamp;

/// A row from the `optimizations` table: one active detected opportunity,
/// unique per (module, resource) while active.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Optimization {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub cloud_account_id: Uuid,
    pub module: String,
    pub resource_id: Uuid,
    pub cloud_resource_id: String,
    pub resource_name: Option<String>,
    pub region: Option<String>,
    pub saving: f64,
    /// Module-specific recommendation payload (recommended flavor,
    /// inactivity ranges, observed metrics).
    pub detail: serde_json::Value,
    /// The resource's pool is administratively excluded from savings
    /// reporting; the candidate is still recorded.
    pub is_excluded: bool,
    pub detected_at: Timestamp,
}

/// A fresh candidate produced by a detector module, not yet persisted.
#[derive(Debug, Clone, Serialize)]
pub struct NewOptimization {
    pub cloud_account_id: Uuid,
    pub resource_id: Uuid,
    pub cloud_resource_id: String,
    pub resource_name: Option<String>,
    pub region: Option<String>,
    pub saving: f64,
    pub detail: serde_json::Value,
    pub is_excluded: bool,
}

/// A row from the `archived_optimizations` table. Once archived a record is
/// never reactivated; a reappearing opportunity becomes a new row in
/// `optimizations`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ArchivedOptimization {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub cloud_account_id: Uuid,
    pub module: String,
    pub resource_id: Uuid,
    pub cloud_resource_id: String,
    pub resource_name: Option<String>,
    pub region: Option<String>,
    pub saving: f64,
    pub detail: serde_json::Value,
    pub is_excluded: bool,
    pub detected_at: Timestamp,
    #[sqlx(try_from = "String")]
    pub reason: ArchiveReason,
    pub description: String,
    pub archived_at: Timestamp,
}

impl ArchivedOptimization {
    /// Build the archived record for a previously active optimization.
    pub fn from_active(
        active: &Optimization,
        reason: ArchiveReason,
        description: String,
        archived_at: Timestamp,
    ) -> Self {
        Self {
            id: active.id,
            organization_id: active.organization_id,
            cloud_account_id: active.cloud_account_id,
            module: active.module.clone(),
            resource_id: active.resource_id,
            cloud_resource_id: active.cloud_resource_id.clone(),
            resource_name: active.resource_name.clone(),
            region: active.region.clone(),
            saving: active.saving,
            detail: active.detail.clone(),
            is_excluded: active.is_excluded,
            detected_at: active.detected_at,
            reason,
            description,
            archived_at,
        }
    }
}
