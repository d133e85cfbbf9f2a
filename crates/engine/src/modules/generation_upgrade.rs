//! Generation upgrade: same shape, newer hardware, lower price.
//!
//! The last week of box-usage billing is bucketed into daily costs and
//! the busiest day becomes the current daily cost. The external
//! generation advisor is asked for a next-generation flavor; a candidate
//! is emitted only when the proposed daily price is strictly lower.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{Datelike, Duration};
use serde_json::json;
use uuid::Uuid;

use costplane_core::cloud::{CloudType, ResourceType};
use costplane_core::error::CoreError;
use costplane_core::options::{clean_excluded_pools, OptionDef};
use costplane_core::savings::daily_to_monthly;
use costplane_db::models::expense::merge_billing_facts;
use costplane_db::models::optimization::{NewOptimization, Optimization};
use costplane_db::models::resource::Resource;
use costplane_db::repositories::resource_repo::ResourceFilter;
use costplane_db::repositories::{ExpenseRepo, ResourceRepo};
use costplane_providers::{BillingRecord, CostClassifier};
use costplane_services::pricing::GenerationSearch;

use crate::context::DetectionContext;
use crate::detector::{
    detail_str, pool_excluded, DetectionOutcome, Detector, ModuleKind, RunInputs,
};
use crate::error::EngineError;
use crate::modules::sorted_account_ids;
use crate::options::ResolvedOptions;

/// Max ids per round trip for this module's bulk queries.
const BULK_SIZE: usize = 1000;

/// Fixed trailing window of billed days feeding the daily cost buckets.
const WINDOW_DAYS: i64 = 7;

/// Payload fields summed when folding split billing rows.
const SUMMABLE_PAYLOAD_FIELDS: [&str; 3] = ["usage_amount", "usage_quantity", "usage_hours"];

const SUPPORTED: [CloudType; 2] = [CloudType::AwsCnr, CloudType::AzureCnr];

#[derive(Debug)]
struct Options {
    excluded_pools: HashSet<Uuid>,
}

impl Options {
    fn parse(options: &ResolvedOptions) -> Result<Self, CoreError> {
        Ok(Self {
            excluded_pools: options.pool_set("excluded_pools")?,
        })
    }
}

/// Maximum daily compute cost across the window's day buckets.
///
/// Only flavor-charge rows count; a day key is (year, ordinal day).
fn max_daily_compute_cost(records: &[BillingRecord], starts: &[(i32, u32)]) -> f64 {
    let mut buckets: HashMap<(i32, u32), f64> = HashMap::new();
    for (record, day) in records.iter().zip(starts) {
        if record.is_compute_charge() {
            *buckets.entry(*day).or_insert(0.0) += record.cost();
        }
    }
    buckets.values().copied().fold(0.0, f64::max)
}

pub struct GenerationUpgrade;

#[async_trait]
impl Detector for GenerationUpgrade {
    fn kind(&self) -> ModuleKind {
        ModuleKind::GenerationUpgrade
    }

    fn supported_cloud_types(&self) -> &'static [CloudType] {
        &SUPPORTED
    }

    fn option_schema(&self) -> Vec<OptionDef> {
        vec![OptionDef::new("excluded_pools", json!([])).with_cleaner(clean_excluded_pools)]
    }

    async fn detect(
        &self,
        ctx: &DetectionContext,
        inputs: &RunInputs,
    ) -> Result<DetectionOutcome, EngineError> {
        let opts = Options::parse(&inputs.options)?;
        let window_start = ctx.now - Duration::days(WINDOW_DAYS);
        let mut outcome = DetectionOutcome::default();

        for account_id in sorted_account_ids(&inputs.accounts) {
            let account = &inputs.accounts[&account_id];
            let instances = ResourceRepo::list_by_accounts(
                &ctx.pool,
                &[account_id],
                ResourceType::Instance,
                &ResourceFilter {
                    active: Some(true),
                    ..Default::default()
                },
            )
            .await?;

            let flavored: Vec<&Resource> = instances
                .iter()
                .filter(|r| r.meta().flavor.is_some())
                .collect();
            if flavored.is_empty() {
                continue;
            }
            let ids: Vec<Uuid> = flavored.iter().map(|r| r.id).collect();

            let raw = ExpenseRepo::raw_by_resources(
                &ctx.pool,
                &ids,
                window_start,
                ctx.now,
                BULK_SIZE,
            )
            .await?;
            let merged = merge_billing_facts(raw, &SUMMABLE_PAYLOAD_FIELDS);

            for instance in flavored {
                let meta = instance.meta();
                let flavor = meta.flavor.clone().unwrap_or_default();

                let rows: Vec<_> = merged
                    .iter()
                    .filter(|row| row.resource_id == Some(instance.id))
                    .collect();
                let records: Vec<BillingRecord> = rows
                    .iter()
                    .map(|row| BillingRecord::from_expense(account.cloud_type, row))
                    .collect();
                let starts: Vec<(i32, u32)> = rows
                    .iter()
                    .map(|row| (row.start_date.year(), row.start_date.ordinal()))
                    .collect();

                let current_daily = max_daily_compute_cost(&records, &starts);
                if current_daily <= 0.0 {
                    continue;
                }

                let proposed = match ctx
                    .pricing
                    .find_generation(&GenerationSearch {
                        cloud_type: account.cloud_type,
                        region: instance.region.clone().unwrap_or_default(),
                        current_flavor: flavor.clone(),
                        os: meta.os.clone(),
                        currency: ctx.currency.clone(),
                        params: json!({ "cpu_count": meta.cpu_count }),
                    })
                    .await
                {
                    Ok(proposed) => proposed,
                    Err(e) => {
                        tracing::debug!(
                            resource_id = %instance.id,
                            error = %e,
                            "Generation advisor lookup failed",
                        );
                        outcome.failed_dependencies.insert(instance.id);
                        continue;
                    }
                };

                // No next generation known for this flavor: nothing to
                // recommend, nothing to archive as failed either.
                let Some(proposed) = proposed else {
                    continue;
                };

                if proposed.daily_price < current_daily {
                    outcome.candidates.push(NewOptimization {
                        cloud_account_id: account_id,
                        resource_id: instance.id,
                        cloud_resource_id: instance.cloud_resource_id.clone(),
                        resource_name: instance.name.clone(),
                        region: instance.region.clone(),
                        saving: daily_to_monthly(current_daily - proposed.daily_price),
                        detail: json!({
                            "current_flavor": flavor,
                            "recommended_flavor": proposed.flavor,
                            "current_daily_cost": current_daily,
                            "proposed_daily_price": proposed.daily_price,
                        }),
                        is_excluded: pool_excluded(&opts.excluded_pools, instance),
                    });
                } else {
                    outcome.irrelevant.insert(
                        instance.id,
                        "next generation not cheaper".to_string(),
                    );
                }
            }
        }

        Ok(outcome)
    }

    fn recommendation_applied(
        &self,
        previous: &Optimization,
        live: &Resource,
    ) -> Option<String> {
        let recommended = detail_str(previous, "recommended_flavor")?;
        let current = live.meta().flavor?;
        if current == recommended {
            Some("flavor changed".to_string())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use costplane_db::models::expense::ExpenseRow;

    fn aws_record(cost: f64, compute: bool) -> BillingRecord {
        let usage_type = if compute { "BoxUsage:m4.large" } else { "EBS:VolumeUsage" };
        BillingRecord::from_expense(
            CloudType::AwsCnr,
            &ExpenseRow {
                cloud_account_id: Uuid::nil(),
                resource_id: Some(Uuid::nil()),
                start_date: Utc::now(),
                end_date: Utc::now(),
                cost,
                sku: None,
                service: None,
                payload: json!({"usage_type": usage_type, "usage_amount": 24.0}),
            },
        )
    }

    fn day(d: u32) -> (i32, u32) {
        let date = Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap();
        (date.year(), date.ordinal())
    }

    #[test]
    fn busiest_day_sets_current_daily_cost() {
        let records = vec![
            aws_record(4.0, true),
            aws_record(2.0, true),
            aws_record(9.0, true),
        ];
        let starts = vec![day(1), day(1), day(2)];
        // Day 1 totals 6.0, day 2 totals 9.0.
        assert!((max_daily_compute_cost(&records, &starts) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn non_compute_rows_are_ignored() {
        let records = vec![aws_record(4.0, true), aws_record(100.0, false)];
        let starts = vec![day(1), day(1)];
        assert!((max_daily_compute_cost(&records, &starts) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn no_compute_rows_means_zero() {
        let records = vec![aws_record(5.0, false)];
        assert_eq!(max_daily_compute_cost(&records, &[day(1)]), 0.0);
    }
}
