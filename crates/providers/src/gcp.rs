//! GCP billing export adapter.
//!
//! Compute charges are identified by SKU description (`Instance Core
//! running`). GCP bills in core-hours, so deriving instance-hours needs
//! the CPU count; when the inventory does not know it the documented
//! minimum of [`DEFAULT_CPU_COUNT`](crate::DEFAULT_CPU_COUNT) applies.

use serde::Deserialize;

use costplane_db::models::expense::ExpenseRow;

use crate::{CostClassifier, DEFAULT_CPU_COUNT};

/// SKU fragment marking the running-core charge.
const CORE_RUNNING_SKU: &str = "Instance Core running";

/// SKU fragments marking preemptible/spot capacity.
const SPOT_SKUS: [&str; 2] = ["Spot Preemptible", "Preemptible"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct GcpPayload {
    sku_description: Option<String>,
    /// Billed core-hours for the row.
    core_hours: Option<f64>,
}

/// One GCP billing fact.
#[derive(Debug, Clone)]
pub struct GcpRecord {
    pub cost: f64,
    sku_description: Option<String>,
    core_hours: Option<f64>,
}

impl GcpRecord {
    pub fn parse(row: &ExpenseRow) -> Self {
        let payload: GcpPayload =
            serde_json::from_value(row.payload.clone()).unwrap_or_default();
        Self {
            cost: row.cost,
            sku_description: payload.sku_description,
            core_hours: payload.core_hours,
        }
    }
}

impl CostClassifier for GcpRecord {
    fn is_compute_charge(&self) -> bool {
        match self.sku_description.as_deref() {
            Some(sku) => {
                sku.contains(CORE_RUNNING_SKU)
                    && !SPOT_SKUS.iter().any(|spot| sku.contains(spot))
            }
            None => false,
        }
    }

    fn work_hours(&self, cpu_hint: Option<i32>) -> f64 {
        let cpu = cpu_hint.filter(|&c| c > 0).unwrap_or(DEFAULT_CPU_COUNT);
        self.core_hours.unwrap_or(0.0) / f64::from(cpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn record(payload: serde_json::Value) -> GcpRecord {
        GcpRecord::parse(&ExpenseRow {
            cloud_account_id: Uuid::nil(),
            resource_id: None,
            start_date: Utc::now(),
            end_date: Utc::now(),
            cost: 1.0,
            sku: None,
            service: None,
            payload,
        })
    }

    #[test]
    fn core_running_sku_is_compute_charge() {
        let r = record(json!({
            "sku_description": "N1 Predefined Instance Core running in Americas",
            "core_hours": 48.0
        }));
        assert!(r.is_compute_charge());
    }

    #[test]
    fn core_hours_divided_by_cpu_count() {
        let r = record(json!({
            "sku_description": "N1 Predefined Instance Core running in Americas",
            "core_hours": 48.0
        }));
        assert_eq!(r.work_hours(Some(4)), 12.0);
    }

    #[test]
    fn unknown_cpu_count_falls_back_to_minimum() {
        let r = record(json!({
            "sku_description": "N1 Predefined Instance Core running in Americas",
            "core_hours": 48.0
        }));
        assert_eq!(r.work_hours(None), 48.0);
        assert_eq!(r.work_hours(Some(0)), 48.0);
    }

    #[test]
    fn preemptible_sku_is_excluded() {
        let r = record(json!({
            "sku_description": "Spot Preemptible N1 Instance Core running in Americas",
            "core_hours": 48.0
        }));
        assert!(!r.is_compute_charge());
    }
}
