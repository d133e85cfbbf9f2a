//! AWS cost-and-usage report adapter.
//!
//! The flavor charge is the `BoxUsage` line item on the EC2 usage type.
//! Spot line items (`SpotUsage`) bill instance hours too but are excluded
//! from flavor-cost classification: their price already reflects the spot
//! discount, so counting them would understate the on-demand baseline.

use serde::Deserialize;

use costplane_db::models::expense::ExpenseRow;

use crate::CostClassifier;

/// Usage-type fragment marking the on-demand instance-hour charge.
const BOX_USAGE: &str = "BoxUsage";

/// Usage-type fragment marking spot instance hours.
const SPOT_USAGE: &str = "SpotUsage";

/// Payload fields of one AWS billing row.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AwsPayload {
    usage_type: Option<String>,
    usage_amount: Option<f64>,
}

/// One AWS billing fact.
#[derive(Debug, Clone)]
pub struct AwsRecord {
    pub cost: f64,
    usage_type: Option<String>,
    usage_amount: Option<f64>,
}

impl AwsRecord {
    pub fn parse(row: &ExpenseRow) -> Self {
        let payload: AwsPayload =
            serde_json::from_value(row.payload.clone()).unwrap_or_default();
        Self {
            cost: row.cost,
            usage_type: payload.usage_type,
            usage_amount: payload.usage_amount,
        }
    }
}

impl CostClassifier for AwsRecord {
    fn is_compute_charge(&self) -> bool {
        match self.usage_type.as_deref() {
            Some(usage_type) => {
                usage_type.contains(BOX_USAGE) && !usage_type.contains(SPOT_USAGE)
            }
            None => false,
        }
    }

    fn work_hours(&self, _cpu_hint: Option<i32>) -> f64 {
        // BoxUsage amounts are already instance-hours.
        self.usage_amount.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn record(payload: serde_json::Value) -> AwsRecord {
        AwsRecord::parse(&ExpenseRow {
            cloud_account_id: Uuid::nil(),
            resource_id: None,
            start_date: Utc::now(),
            end_date: Utc::now(),
            cost: 1.0,
            sku: None,
            service: Some("AmazonEC2".into()),
            payload,
        })
    }

    #[test]
    fn box_usage_is_compute_charge() {
        let r = record(json!({"usage_type": "USE1-BoxUsage:m5.large", "usage_amount": 24.0}));
        assert!(r.is_compute_charge());
        assert_eq!(r.work_hours(None), 24.0);
    }

    #[test]
    fn spot_usage_is_excluded() {
        let r = record(json!({"usage_type": "USE1-SpotUsage:m5.large", "usage_amount": 24.0}));
        assert!(!r.is_compute_charge());
    }

    #[test]
    fn volume_usage_is_not_compute() {
        let r = record(json!({"usage_type": "EBS:VolumeUsage.gp2"}));
        assert!(!r.is_compute_charge());
        assert_eq!(r.work_hours(None), 0.0);
    }

    #[test]
    fn missing_payload_fields_degrade_to_zero() {
        let r = record(json!({}));
        assert!(!r.is_compute_charge());
        assert_eq!(r.work_hours(Some(8)), 0.0);
    }
}
