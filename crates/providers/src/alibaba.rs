//! Alibaba Cloud billing-item adapter.
//!
//! ECS exports name the instance charge by billing item; preemptible
//! (spot) capacity is identified by the spot strategy field.

use serde::Deserialize;

use costplane_db::models::expense::ExpenseRow;

use crate::CostClassifier;

/// Billing item of the instance configuration charge.
const INSTANCE_BILLING_ITEM: &str = "Cloud server configuration";

/// Spot strategies marking preemptible capacity.
const SPOT_STRATEGIES: [&str; 2] = ["SpotWithPriceLimit", "SpotAsPriceGo"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AlibabaPayload {
    billing_item: Option<String>,
    spot_strategy: Option<String>,
    usage_hours: Option<f64>,
}

/// One Alibaba billing fact.
#[derive(Debug, Clone)]
pub struct AlibabaRecord {
    pub cost: f64,
    billing_item: Option<String>,
    spot_strategy: Option<String>,
    usage_hours: Option<f64>,
}

impl AlibabaRecord {
    pub fn parse(row: &ExpenseRow) -> Self {
        let payload: AlibabaPayload =
            serde_json::from_value(row.payload.clone()).unwrap_or_default();
        Self {
            cost: row.cost,
            billing_item: payload.billing_item,
            spot_strategy: payload.spot_strategy,
            usage_hours: payload.usage_hours,
        }
    }
}

impl CostClassifier for AlibabaRecord {
    fn is_compute_charge(&self) -> bool {
        let instance_item = self.billing_item.as_deref() == Some(INSTANCE_BILLING_ITEM);
        let spot = self
            .spot_strategy
            .as_deref()
            .is_some_and(|s| SPOT_STRATEGIES.contains(&s));
        instance_item && !spot
    }

    fn work_hours(&self, _cpu_hint: Option<i32>) -> f64 {
        self.usage_hours.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn record(payload: serde_json::Value) -> AlibabaRecord {
        AlibabaRecord::parse(&ExpenseRow {
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
    fn instance_configuration_is_compute_charge() {
        let r = record(json!({
            "billing_item": "Cloud server configuration",
            "usage_hours": 6.0
        }));
        assert!(r.is_compute_charge());
        assert_eq!(r.work_hours(None), 6.0);
    }

    #[test]
    fn preemptible_strategies_are_excluded() {
        for strategy in ["SpotWithPriceLimit", "SpotAsPriceGo"] {
            let r = record(json!({
                "billing_item": "Cloud server configuration",
                "spot_strategy": strategy
            }));
            assert!(!r.is_compute_charge(), "{strategy} must be excluded");
        }
    }

    #[test]
    fn disk_billing_item_is_not_compute() {
        let r = record(json!({"billing_item": "Cloud disk"}));
        assert!(!r.is_compute_charge());
    }
}
