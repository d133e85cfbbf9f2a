//! Repository for the `cloud_accounts` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::cloud_account::CloudAccount;

/// Column list for `cloud_accounts` queries.
const COLUMNS: &str = "id, organization_id, name, cloud_type, deleted, config, created_at";

pub struct CloudAccountRepo;

impl CloudAccountRepo {
    /// All non-deleted accounts for an organization. Type filtering and
    /// skip-list handling happen in the engine's account selector so the
    /// eligibility rules stay in one testable place.
    pub async fn list_active(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<CloudAccount>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM cloud_accounts \
             WHERE organization_id = $1 AND deleted = FALSE \
             ORDER BY created_at"
        );
        sqlx::query_as::<_, CloudAccount>(&query)
            .bind(organization_id)
            .fetch_all(pool)
            .await
    }

    /// Distinct organization ids that own at least one non-deleted account.
    /// The scheduler iterates this set each tick.
    pub async fn organization_ids(pool: &PgPool) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT organization_id FROM cloud_accounts \
             WHERE deleted = FALSE ORDER BY organization_id",
        )
        .fetch_all(pool)
        .await
    }
}
