//! Repository for the `option_sets` table.

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::option_set::OptionValue;

pub struct OptionRepo;

impl OptionRepo {
    /// Stored option values for one (organization, module), as a name map.
    /// Options the organization never configured are simply absent; the
    /// resolver substitutes schema defaults.
    pub async fn stored_values(
        pool: &PgPool,
        organization_id: Uuid,
        module: &str,
    ) -> Result<HashMap<String, serde_json::Value>, sqlx::Error> {
        let rows = sqlx::query_as::<_, OptionValue>(
            "SELECT organization_id, module, name, value FROM option_sets \
             WHERE organization_id = $1 AND module = $2",
        )
        .bind(organization_id)
        .bind(module)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.name, r.value)).collect())
    }
}
