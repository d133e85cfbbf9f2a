//! Azure consumption export adapter.
//!
//! The flavor charge carries meter category `Virtual Machines`; Spot
//! meters share the category but are carved out by meter name.

use serde::Deserialize;

use costplane_db::models::expense::ExpenseRow;

use crate::CostClassifier;

/// Meter category of the instance charge.
const VM_METER_CATEGORY: &str = "Virtual Machines";

/// Meter-name fragment marking spot capacity.
const SPOT_METER: &str = "Spot";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AzurePayload {
    meter_category: Option<String>,
    meter_name: Option<String>,
    usage_quantity: Option<f64>,
}

/// One Azure billing fact.
#[derive(Debug, Clone)]
pub struct AzureRecord {
    pub cost: f64,
    meter_category: Option<String>,
    meter_name: Option<String>,
    usage_quantity: Option<f64>,
}

impl AzureRecord {
    pub fn parse(row: &ExpenseRow) -> Self {
        let payload: AzurePayload =
            serde_json::from_value(row.payload.clone()).unwrap_or_default();
        Self {
            cost: row.cost,
            meter_category: payload.meter_category,
            meter_name: payload.meter_name,
            usage_quantity: payload.usage_quantity,
        }
    }
}

impl CostClassifier for AzureRecord {
    fn is_compute_charge(&self) -> bool {
        let vm_meter = self.meter_category.as_deref() == Some(VM_METER_CATEGORY);
        let spot = self
            .meter_name
            .as_deref()
            .is_some_and(|name| name.contains(SPOT_METER));
        vm_meter && !spot
    }

    fn work_hours(&self, _cpu_hint: Option<i32>) -> f64 {
        // Virtual Machines meters bill in instance-hours.
        self.usage_quantity.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn record(payload: serde_json::Value) -> AzureRecord {
        AzureRecord::parse(&ExpenseRow {
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
    fn vm_meter_is_compute_charge() {
        let r = record(json!({
            "meter_category": "Virtual Machines",
            "meter_name": "D2s v3",
            "usage_quantity": 12.0
        }));
        assert!(r.is_compute_charge());
        assert_eq!(r.work_hours(None), 12.0);
    }

    #[test]
    fn spot_meter_is_excluded() {
        let r = record(json!({
            "meter_category": "Virtual Machines",
            "meter_name": "D2s v3 Spot",
            "usage_quantity": 12.0
        }));
        assert!(!r.is_compute_charge());
    }

    #[test]
    fn storage_meter_is_not_compute() {
        let r = record(json!({"meter_category": "Storage", "meter_name": "LRS Data Stored"}));
        assert!(!r.is_compute_charge());
    }
}
