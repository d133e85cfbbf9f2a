//! Raw billing expense rows and billing-fact merging.
//!
//! One [`ExpenseRow`] is one billed usage fact as ingested from a provider
//! export. Some providers split a single logical charge across several
//! export rows; [`merge_billing_facts`] folds those back together before
//! any cost classification happens.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use costplane_core::types::Timestamp;

/// A row from the `expenses` table. Immutable once ingested.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpenseRow {
    pub cloud_account_id: Uuid,
    /// Linkage to the inventory; absent when the discovery pipeline has not
    /// matched the billing line to a resource yet.
    pub resource_id: Option<Uuid>,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub cost: f64,
    pub sku: Option<String>,
    pub service: Option<String>,
    /// Provider-specific fields: usage type, line-item type, meter
    /// category, usage quantities. Interpreted by the provider adapters.
    pub payload: serde_json::Value,
}

/// Key fields identifying one logical billing fact.
type FactKey = (Timestamp, Option<Uuid>, Option<String>, Option<String>);

fn fact_key(row: &ExpenseRow) -> FactKey {
    (
        row.start_date,
        row.resource_id,
        row.sku.clone(),
        row.service.clone(),
    )
}

/// Fold rows that represent the same billing fact split across multiple
/// export rows.
///
/// Rows sharing (start date, resource, SKU, service) are merged into one:
/// `cost` is summed, as is every numeric payload field named in
/// `summable_payload_fields`. The first occurrence's other fields win, and
/// output order follows first occurrence, so the result is invariant under
/// chunked fetching as long as chunks preserve id order.
pub fn merge_billing_facts(
    rows: Vec<ExpenseRow>,
    summable_payload_fields: &[&str],
) -> Vec<ExpenseRow> {
    let mut merged: Vec<ExpenseRow> = Vec::with_capacity(rows.len());
    let mut index: HashMap<FactKey, usize> = HashMap::new();

    for row in rows {
        match index.get(&fact_key(&row)) {
            Some(&i) => {
                let target = &mut merged[i];
                target.cost += row.cost;
                for field in summable_payload_fields {
                    let add = row.payload.get(field).and_then(|v| v.as_f64());
                    if let Some(add) = add {
                        let current = target.payload.get(field).and_then(|v| v.as_f64());
                        let sum = current.unwrap_or(0.0) + add;
                        if let Some(obj) = target.payload.as_object_mut() {
                            obj.insert((*field).to_string(), serde_json::json!(sum));
                        }
                    }
                }
            }
            None => {
                index.insert(fact_key(&row), merged.len());
                merged.push(row);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn row(resource: Uuid, day: u32, cost: f64, usage: f64) -> ExpenseRow {
        let start = Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap();
        ExpenseRow {
            cloud_account_id: Uuid::nil(),
            resource_id: Some(resource),
            start_date: start,
            end_date: start + chrono::Duration::days(1),
            cost,
            sku: Some("BoxUsage:m5.large".into()),
            service: Some("AmazonEC2".into()),
            payload: json!({"usage_amount": usage}),
        }
    }

    #[test]
    fn split_rows_fold_into_one_fact() {
        let r = Uuid::now_v7();
        let merged = merge_billing_facts(
            vec![row(r, 1, 1.5, 12.0), row(r, 1, 0.5, 6.0)],
            &["usage_amount"],
        );
        assert_eq!(merged.len(), 1);
        assert!((merged[0].cost - 2.0).abs() < f64::EPSILON);
        assert_eq!(merged[0].payload["usage_amount"], json!(18.0));
    }

    #[test]
    fn different_days_stay_separate() {
        let r = Uuid::now_v7();
        let merged = merge_billing_facts(vec![row(r, 1, 1.0, 1.0), row(r, 2, 1.0, 1.0)], &[]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn different_resources_stay_separate() {
        let merged = merge_billing_facts(
            vec![row(Uuid::now_v7(), 1, 1.0, 1.0), row(Uuid::now_v7(), 1, 1.0, 1.0)],
            &[],
        );
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_is_invariant_under_chunk_boundaries() {
        let r = Uuid::now_v7();
        let rows = vec![
            row(r, 1, 1.0, 2.0),
            row(r, 1, 2.0, 4.0),
            row(r, 2, 3.0, 6.0),
            row(r, 1, 4.0, 8.0),
        ];

        // Whole-set merge vs merging chunk concatenations of size 2.
        let whole = merge_billing_facts(rows.clone(), &["usage_amount"]);
        let chunked: Vec<ExpenseRow> = rows.chunks(2).flat_map(|c| c.to_vec()).collect();
        let rechunked = merge_billing_facts(chunked, &["usage_amount"]);

        assert_eq!(whole.len(), rechunked.len());
        for (a, b) in whole.iter().zip(rechunked.iter()) {
            assert_eq!(a.start_date, b.start_date);
            assert!((a.cost - b.cost).abs() < f64::EPSILON);
            assert_eq!(a.payload, b.payload);
        }
    }

    #[test]
    fn missing_summable_field_does_not_invent_values() {
        let r = Uuid::now_v7();
        let mut first = row(r, 1, 1.0, 1.0);
        first.payload = json!({});
        let second = row(r, 1, 1.0, 5.0);
        let merged = merge_billing_facts(vec![first, second], &["usage_amount"]);
        assert_eq!(merged.len(), 1);
        // First row had no usage_amount; the second contributes its value.
        assert_eq!(merged[0].payload["usage_amount"], json!(5.0));
    }
}
