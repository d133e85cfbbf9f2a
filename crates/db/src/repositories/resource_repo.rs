//! Repository for the `resources` table.
//!
//! Detector queries are scoped by cloud account, resource type, and time
//! filters. Id-set lookups are chunked; results concatenate in id order so
//! the outcome is chunk-invariant.

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use costplane_core::cloud::ResourceType;
use costplane_core::types::Timestamp;

use crate::models::resource::Resource;

/// Column list for `resources` queries.
const COLUMNS: &str = "\
    id, cloud_resource_id, cloud_account_id, resource_type, name, region, \
    pool_id, employee_id, tags, first_seen, last_seen, active, meta";

/// Filters for scoped resource listings.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub active: Option<bool>,
    pub first_seen_after: Option<Timestamp>,
    pub first_seen_before: Option<Timestamp>,
}

pub struct ResourceRepo;

impl ResourceRepo {
    /// Resources of one type across a set of cloud accounts.
    pub async fn list_by_accounts(
        pool: &PgPool,
        cloud_account_ids: &[Uuid],
        resource_type: ResourceType,
        filter: &ResourceFilter,
    ) -> Result<Vec<Resource>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM resources \
             WHERE cloud_account_id = ANY($1) \
               AND resource_type = $2 \
               AND ($3::BOOLEAN IS NULL OR active = $3) \
               AND ($4::TIMESTAMPTZ IS NULL OR first_seen >= $4) \
               AND ($5::TIMESTAMPTZ IS NULL OR first_seen <= $5) \
             ORDER BY id"
        );
        sqlx::query_as::<_, Resource>(&query)
            .bind(cloud_account_ids)
            .bind(resource_type.as_str())
            .bind(filter.active)
            .bind(filter.first_seen_after)
            .bind(filter.first_seen_before)
            .fetch_all(pool)
            .await
    }

    /// Bulk fetch by id, chunked. No round trip carries more than
    /// `chunk_size` ids; chunk results are concatenated.
    pub async fn fetch_by_ids(
        pool: &PgPool,
        ids: &[Uuid],
        chunk_size: usize,
    ) -> Result<Vec<Resource>, sqlx::Error> {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(chunk_size.max(1)) {
            let query = format!(
                "SELECT {COLUMNS} FROM resources WHERE id = ANY($1) ORDER BY id"
            );
            let rows = sqlx::query_as::<_, Resource>(&query)
                .bind(chunk)
                .fetch_all(pool)
                .await?;
            out.extend(rows);
        }
        Ok(out)
    }

    /// Current inventory snapshot keyed by resource id, chunked. Used by
    /// the archival reclassifier's RESOURCE_DELETED check.
    pub async fn snapshot_by_ids(
        pool: &PgPool,
        ids: &[Uuid],
        chunk_size: usize,
    ) -> Result<HashMap<Uuid, Resource>, sqlx::Error> {
        let rows = Self::fetch_by_ids(pool, ids, chunk_size).await?;
        Ok(rows.into_iter().map(|r| (r.id, r)).collect())
    }

    /// Most recent `last_seen` of any volume or snapshot referencing each
    /// of the given image ids (by `meta->>'image_id'`), chunked over the
    /// image id set. Images nothing references are absent from the map.
    pub async fn last_image_reference(
        pool: &PgPool,
        cloud_account_ids: &[Uuid],
        image_cloud_ids: &[String],
        chunk_size: usize,
    ) -> Result<HashMap<String, Timestamp>, sqlx::Error> {
        let mut out = HashMap::new();
        for chunk in image_cloud_ids.chunks(chunk_size.max(1)) {
            let rows = sqlx::query_as::<_, (String, Timestamp)>(
                "SELECT meta->>'image_id' AS image_id, MAX(last_seen) \
                 FROM resources \
                 WHERE cloud_account_id = ANY($1) \
                   AND resource_type IN ('volume', 'snapshot') \
                   AND meta->>'image_id' = ANY($2) \
                 GROUP BY meta->>'image_id'",
            )
            .bind(cloud_account_ids)
            .bind(chunk)
            .fetch_all(pool)
            .await?;
            out.extend(rows);
        }
        Ok(out)
    }
}
