//! Repository for the `optimizations` and `archived_optimizations` tables.
//!
//! The commit path is transactional: a module run replaces its active set
//! and appends its archived rows atomically, so an aborted run leaves the
//! previous baseline untouched for the next scheduled attempt.

use sqlx::PgPool;
use uuid::Uuid;

use costplane_core::types::Timestamp;

use crate::models::optimization::{ArchivedOptimization, NewOptimization, Optimization};

/// Column list for `optimizations` queries.
const COLUMNS: &str = "\
    id, organization_id, cloud_account_id, module, resource_id, \
    cloud_resource_id, resource_name, region, saving, detail, is_excluded, \
    detected_at";

pub struct OptimizationRepo;

impl OptimizationRepo {
    /// The previous run's full active set for one (organization, module).
    /// Loaded read-only before any writes for the current run.
    pub async fn list_active(
        pool: &PgPool,
        organization_id: Uuid,
        module: &str,
    ) -> Result<Vec<Optimization>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM optimizations \
             WHERE organization_id = $1 AND module = $2 \
             ORDER BY detected_at, id"
        );
        sqlx::query_as::<_, Optimization>(&query)
            .bind(organization_id)
            .bind(module)
            .fetch_all(pool)
            .await
    }

    /// Atomically commit one module run: replace the active set with the
    /// fresh candidates and append the archived rows.
    pub async fn commit_run(
        pool: &PgPool,
        organization_id: Uuid,
        module: &str,
        detected_at: Timestamp,
        candidates: &[NewOptimization],
        archived: &[ArchivedOptimization],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM optimizations WHERE organization_id = $1 AND module = $2")
            .bind(organization_id)
            .bind(module)
            .execute(&mut *tx)
            .await?;

        for candidate in candidates {
            sqlx::query(
                "INSERT INTO optimizations \
                 (id, organization_id, cloud_account_id, module, resource_id, \
                  cloud_resource_id, resource_name, region, saving, detail, \
                  is_excluded, detected_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(Uuid::now_v7())
            .bind(organization_id)
            .bind(candidate.cloud_account_id)
            .bind(module)
            .bind(candidate.resource_id)
            .bind(&candidate.cloud_resource_id)
            .bind(&candidate.resource_name)
            .bind(&candidate.region)
            .bind(candidate.saving)
            .bind(&candidate.detail)
            .bind(candidate.is_excluded)
            .bind(detected_at)
            .execute(&mut *tx)
            .await?;
        }

        for row in archived {
            sqlx::query(
                "INSERT INTO archived_optimizations \
                 (id, organization_id, cloud_account_id, module, resource_id, \
                  cloud_resource_id, resource_name, region, saving, detail, \
                  is_excluded, detected_at, reason, description, archived_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            )
            .bind(row.id)
            .bind(row.organization_id)
            .bind(row.cloud_account_id)
            .bind(&row.module)
            .bind(row.resource_id)
            .bind(&row.cloud_resource_id)
            .bind(&row.resource_name)
            .bind(&row.region)
            .bind(row.saving)
            .bind(&row.detail)
            .bind(row.is_excluded)
            .bind(row.detected_at)
            .bind(row.reason.as_str())
            .bind(&row.description)
            .bind(row.archived_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }
}
