//! Cloud account entity models.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use costplane_core::cloud::CloudType;
use costplane_core::types::Timestamp;

/// A row from the `cloud_accounts` table.
///
/// Immutable once created except for the soft-delete flag, which the
/// account administration surface flips; this engine only reads it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CloudAccount {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub cloud_type: CloudType,
    pub deleted: bool,
    /// Provider-specific connection config (credentials references, region
    /// lists). Opaque to the detection engine.
    pub config: serde_json::Value,
    pub created_at: Timestamp,
}

/// The subset of account fields the detection engine passes around.
#[derive(Debug, Clone, Serialize)]
pub struct CloudAccountSummary {
    pub id: Uuid,
    pub name: String,
    pub cloud_type: CloudType,
}

impl From<&CloudAccount> for CloudAccountSummary {
    fn from(account: &CloudAccount) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            cloud_type: account.cloud_type,
        }
    }
}
