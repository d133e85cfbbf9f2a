//! Repository for the `expenses` table (raw billing facts).

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use costplane_core::types::Timestamp;

use crate::models::expense::ExpenseRow;

/// Column list for `expenses` queries.
const COLUMNS: &str = "\
    cloud_account_id, resource_id, start_date, end_date, cost, sku, service, payload";

pub struct ExpenseRepo;

impl ExpenseRepo {
    /// Raw billing rows for a resource id set within a date range, chunked.
    ///
    /// Rows are ordered by (resource_id, start_date) inside each chunk and
    /// chunks follow the caller's id order, so concatenation is
    /// chunk-invariant. Callers normally pass the result through
    /// `merge_billing_facts` before classification.
    pub async fn raw_by_resources(
        pool: &PgPool,
        resource_ids: &[Uuid],
        start: Timestamp,
        end: Timestamp,
        chunk_size: usize,
    ) -> Result<Vec<ExpenseRow>, sqlx::Error> {
        let mut out = Vec::new();
        for chunk in resource_ids.chunks(chunk_size.max(1)) {
            let query = format!(
                "SELECT {COLUMNS} FROM expenses \
                 WHERE resource_id = ANY($1) \
                   AND start_date >= $2 AND start_date < $3 \
                 ORDER BY resource_id, start_date"
            );
            let rows = sqlx::query_as::<_, ExpenseRow>(&query)
                .bind(chunk)
                .bind(start)
                .bind(end)
                .fetch_all(pool)
                .await?;
            out.extend(rows);
        }
        Ok(out)
    }

    /// Total cost per resource over a date range, chunked. Chunks cover
    /// disjoint id sets so merging the per-chunk maps never collides.
    pub async fn total_cost_by_resource(
        pool: &PgPool,
        resource_ids: &[Uuid],
        start: Timestamp,
        end: Timestamp,
        chunk_size: usize,
    ) -> Result<HashMap<Uuid, f64>, sqlx::Error> {
        let mut out = HashMap::new();
        for chunk in resource_ids.chunks(chunk_size.max(1)) {
            let rows = sqlx::query_as::<_, (Uuid, f64)>(
                "SELECT resource_id, SUM(cost) FROM expenses \
                 WHERE resource_id = ANY($1) \
                   AND start_date >= $2 AND start_date < $3 \
                 GROUP BY resource_id",
            )
            .bind(chunk)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await?;
            out.extend(rows);
        }
        Ok(out)
    }
}
