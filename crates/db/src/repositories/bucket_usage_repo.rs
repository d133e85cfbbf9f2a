//! Repository for the `bucket_usage` analytical aggregates.
//!
//! The ingestion pipeline writes one row per (bucket, day) with averaged
//! data size and request counts per tier; this repository rolls a window
//! of days up into one aggregate per bucket.

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use costplane_core::types::Timestamp;

use crate::models::bucket_usage::BucketUsageStats;

pub struct BucketUsageRepo;

impl BucketUsageRepo {
    /// Windowed usage aggregate per bucket, chunked over the id set.
    /// Buckets with no usage rows in the window are absent from the map.
    pub async fn window_stats(
        pool: &PgPool,
        bucket_resource_ids: &[Uuid],
        start: Timestamp,
        end: Timestamp,
        chunk_size: usize,
    ) -> Result<HashMap<Uuid, BucketUsageStats>, sqlx::Error> {
        let mut out = HashMap::new();
        for chunk in bucket_resource_ids.chunks(chunk_size.max(1)) {
            let rows = sqlx::query_as::<_, BucketUsageStats>(
                "SELECT resource_id, \
                        AVG(data_size_mb_avg) AS avg_data_size_mb, \
                        COALESCE(SUM(tier1_request_count), 0)::BIGINT AS tier1_requests, \
                        COALESCE(SUM(tier2_request_count), 0)::BIGINT AS tier2_requests, \
                        MAX(day) FILTER (WHERE tier1_request_count > 0 \
                                            OR tier2_request_count > 0) AS last_activity \
                 FROM bucket_usage \
                 WHERE resource_id = ANY($1) AND day >= $2 AND day < $3 \
                 GROUP BY resource_id",
            )
            .bind(chunk)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await?;
            out.extend(rows.into_iter().map(|s| (s.resource_id, s)));
        }
        Ok(out)
    }
}
