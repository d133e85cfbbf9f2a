//! Inventory resource entity models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use costplane_core::cloud::ResourceType;
use costplane_core::types::Timestamp;

/// A row from the `resources` table.
///
/// Resources are append-mostly: the external discovery pipeline updates
/// `active` and `last_seen`; this engine never writes them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Resource {
    pub id: Uuid,
    /// Provider-side identifier (instance id, bucket name, image id).
    pub cloud_resource_id: String,
    pub cloud_account_id: Uuid,
    #[sqlx(try_from = "String")]
    pub resource_type: ResourceType,
    pub name: Option<String>,
    pub region: Option<String>,
    pub pool_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub tags: serde_json::Value,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
    pub active: bool,
    /// Type-specific metadata; see [`ResourceMeta`].
    pub meta: serde_json::Value,
}

impl Resource {
    /// Parse the type-specific metadata payload. Unknown fields are
    /// ignored; missing fields take their defaults.
    pub fn meta(&self) -> ResourceMeta {
        serde_json::from_value(self.meta.clone()).unwrap_or_default()
    }
}

/// Type-specific metadata stored in the `meta` jsonb column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceMeta {
    /// Instance flavor name (e.g. `m5.large`).
    pub flavor: Option<String>,
    pub cpu_count: Option<i32>,
    /// Source image for instances, referenced image for volumes/snapshots.
    pub image_id: Option<String>,
    pub size_bytes: Option<i64>,
    pub os: Option<String>,
    /// Running on a spot/preemptible offering.
    pub spot: bool,
    /// Instance is stopped but its storage is still allocated and billed.
    pub stopped_allocated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn meta_tolerates_missing_and_unknown_fields() {
        let resource = Resource {
            id: Uuid::nil(),
            cloud_resource_id: "i-123".into(),
            cloud_account_id: Uuid::nil(),
            resource_type: ResourceType::Instance,
            name: None,
            region: None,
            pool_id: None,
            employee_id: None,
            tags: serde_json::json!({}),
            first_seen: Utc::now(),
            last_seen: Utc::now(),
            active: true,
            meta: serde_json::json!({"flavor": "m5.large", "zone": "us-east-1a"}),
        };
        let meta = resource.meta();
        assert_eq!(meta.flavor.as_deref(), Some("m5.large"));
        assert!(!meta.spot);
        assert!(meta.cpu_count.is_none());
    }
}
