//! Short-living instances: machines that came and went within hours.
//!
//! Instances first seen inside the trailing window that have already left
//! the live inventory are summed up from billing: if they worked fewer
//! hours than the live-hours floor and carried a positive flavor cost,
//! the same workload would have been cheaper on spot/preemptible
//! capacity. Instances already running on a discounted offering are
//! skipped.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use costplane_core::cloud::{CloudType, ResourceType};
use costplane_core::error::CoreError;
use costplane_core::options::{clean_excluded_pools, clean_positive_int, OptionDef};
use costplane_db::models::expense::merge_billing_facts;
use costplane_db::models::optimization::NewOptimization;
use costplane_db::repositories::resource_repo::ResourceFilter;
use costplane_db::repositories::{ExpenseRepo, ResourceRepo};
use costplane_providers::{BillingRecord, ComputeTotals};

use crate::context::DetectionContext;
use crate::detector::{pool_excluded, DetectionOutcome, Detector, ModuleKind, RunInputs};
use crate::error::EngineError;
use crate::modules::sorted_account_ids;
use crate::options::ResolvedOptions;

/// Max ids per round trip for this module's bulk queries.
const BULK_SIZE: usize = 1000;

const DEFAULT_DAYS_THRESHOLD: i64 = 3;

/// An instance that worked fewer hours than this is short-living.
const LIVE_HOURS_THRESHOLD: f64 = 6.0;

/// Fraction of the on-demand flavor cost a spot offering typically saves.
const SPOT_SAVING_COEFFICIENT: f64 = 0.72;

/// Payload fields summed when folding split billing rows.
const SUMMABLE_PAYLOAD_FIELDS: [&str; 3] = ["usage_amount", "usage_quantity", "usage_hours"];

const SUPPORTED: [CloudType; 4] = [
    CloudType::AwsCnr,
    CloudType::AzureCnr,
    CloudType::AlibabaCnr,
    CloudType::GcpCnr,
];

#[derive(Debug)]
struct Options {
    days_threshold: i64,
    excluded_pools: HashSet<Uuid>,
}

impl Options {
    fn parse(options: &ResolvedOptions) -> Result<Self, CoreError> {
        Ok(Self {
            days_threshold: options.get_i64("days_threshold")?,
            excluded_pools: options.pool_set("excluded_pools")?,
        })
    }
}

/// Threshold test over a departed instance's billing totals.
fn qualifies(totals: &ComputeTotals) -> bool {
    totals.work_hours < LIVE_HOURS_THRESHOLD && totals.flavor_cost > 0.0
}

/// Saving estimate: the flavor cost at the typical spot discount.
fn spot_saving(flavor_cost: f64) -> f64 {
    flavor_cost * SPOT_SAVING_COEFFICIENT
}

pub struct ShortLivingInstances;

#[async_trait]
impl Detector for ShortLivingInstances {
    fn kind(&self) -> ModuleKind {
        ModuleKind::ShortLivingInstances
    }

    fn supported_cloud_types(&self) -> &'static [CloudType] {
        &SUPPORTED
    }

    fn option_schema(&self) -> Vec<OptionDef> {
        vec![
            OptionDef::new("days_threshold", json!(DEFAULT_DAYS_THRESHOLD))
                .with_cleaner(clean_positive_int),
            OptionDef::new("excluded_pools", json!([])).with_cleaner(clean_excluded_pools),
        ]
    }

    async fn detect(
        &self,
        ctx: &DetectionContext,
        inputs: &RunInputs,
    ) -> Result<DetectionOutcome, EngineError> {
        let opts = Options::parse(&inputs.options)?;
        let window_start = ctx.now - Duration::days(opts.days_threshold);
        let mut outcome = DetectionOutcome::default();

        for account_id in sorted_account_ids(&inputs.accounts) {
            let account = &inputs.accounts[&account_id];

            // Instances born inside the window that no longer appear in
            // the live inventory.
            let departed = ResourceRepo::list_by_accounts(
                &ctx.pool,
                &[account_id],
                ResourceType::Instance,
                &ResourceFilter {
                    active: Some(false),
                    first_seen_after: Some(window_start),
                    ..Default::default()
                },
            )
            .await?;
            if departed.is_empty() {
                continue;
            }
            let ids: Vec<Uuid> = departed.iter().map(|r| r.id).collect();

            let raw = ExpenseRepo::raw_by_resources(
                &ctx.pool,
                &ids,
                window_start,
                ctx.now,
                BULK_SIZE,
            )
            .await?;
            let merged = merge_billing_facts(raw, &SUMMABLE_PAYLOAD_FIELDS);

            for instance in &departed {
                let meta = instance.meta();
                if meta.spot {
                    continue;
                }

                let records: Vec<BillingRecord> = merged
                    .iter()
                    .filter(|row| row.resource_id == Some(instance.id))
                    .map(|row| BillingRecord::from_expense(account.cloud_type, row))
                    .collect();
                let totals = ComputeTotals::accumulate(&records, meta.cpu_count);

                if !qualifies(&totals) {
                    continue;
                }

                outcome.candidates.push(NewOptimization {
                    cloud_account_id: account_id,
                    resource_id: instance.id,
                    cloud_resource_id: instance.cloud_resource_id.clone(),
                    resource_name: instance.name.clone(),
                    region: instance.region.clone(),
                    saving: spot_saving(totals.flavor_cost),
                    detail: json!({
                        "flavor_cost": totals.flavor_cost,
                        "total_cost": totals.total_cost(),
                        "work_hours": totals.work_hours,
                        "first_seen": instance.first_seen,
                        "last_seen": instance.last_seen,
                    }),
                    is_excluded: pool_excluded(&opts.excluded_pools, instance),
                });
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_lived_cheap_instance_qualifies() {
        let totals = ComputeTotals {
            flavor_cost: 10.0,
            other_cost: 1.0,
            work_hours: 2.0,
        };
        assert!(qualifies(&totals));
    }

    #[test]
    fn saving_applies_the_spot_coefficient() {
        // flavor_cost 10, coefficient 0.72: saving 7.2.
        assert!((spot_saving(10.0) - 7.2).abs() < 1e-9);
    }

    #[test]
    fn long_running_instance_does_not_qualify() {
        let totals = ComputeTotals {
            flavor_cost: 10.0,
            other_cost: 0.0,
            work_hours: 6.0,
        };
        assert!(!qualifies(&totals));
    }

    #[test]
    fn zero_flavor_cost_does_not_qualify() {
        let totals = ComputeTotals {
            flavor_cost: 0.0,
            other_cost: 5.0,
            work_hours: 2.0,
        };
        assert!(!qualifies(&totals));
    }
}
