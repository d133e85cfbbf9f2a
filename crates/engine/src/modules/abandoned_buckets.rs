//! Abandoned object-storage buckets.
//!
//! A bucket qualifies when every configured usage metric over the
//! trailing window sits at or below its threshold (average stored data
//! size, request counts per tier) and the bucket still accrues expense.
//! Saving is the window's average daily expense over a 30-day month.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use costplane_core::cloud::{CloudType, ResourceType};
use costplane_core::error::CoreError;
use costplane_core::options::{
    clean_excluded_pools, clean_non_negative_number, clean_positive_int, OptionDef,
};
use costplane_core::savings::{average_daily_expense, daily_to_monthly};
use costplane_db::models::bucket_usage::BucketUsageStats;
use costplane_db::models::optimization::{NewOptimization, Optimization};
use costplane_db::models::resource::Resource;
use costplane_db::repositories::resource_repo::ResourceFilter;
use costplane_db::repositories::{BucketUsageRepo, ExpenseRepo, ResourceRepo};

use crate::context::DetectionContext;
use crate::detector::{pool_excluded, DetectionOutcome, Detector, ModuleKind, RunInputs};
use crate::error::EngineError;
use crate::modules::sorted_account_ids;
use crate::options::ResolvedOptions;

/// Max ids per round trip for this module's bulk queries.
const BULK_SIZE: usize = 2000;

const DEFAULT_DAYS_THRESHOLD: i64 = 7;

/// Average stored data size threshold, megabytes.
const DEFAULT_DATA_SIZE_THRESHOLD_MB: f64 = 1024.0;

/// Retrieval-class (GET/HEAD) request count threshold over the window.
const DEFAULT_TIER_1_REQUESTS_THRESHOLD: i64 = 100;

/// Modification-class (PUT/POST/LIST) request count threshold.
const DEFAULT_TIER_2_REQUESTS_THRESHOLD: i64 = 2000;

const SUPPORTED: [CloudType; 4] = [
    CloudType::AwsCnr,
    CloudType::AzureCnr,
    CloudType::AlibabaCnr,
    CloudType::GcpCnr,
];

#[derive(Debug)]
struct Options {
    days_threshold: i64,
    data_size_threshold_mb: f64,
    tier_1_requests_threshold: i64,
    tier_2_requests_threshold: i64,
    excluded_pools: HashSet<Uuid>,
}

impl Options {
    fn parse(options: &ResolvedOptions) -> Result<Self, CoreError> {
        Ok(Self {
            days_threshold: options.get_i64("days_threshold")?,
            data_size_threshold_mb: options.get_f64("data_size_threshold")?,
            tier_1_requests_threshold: options.get_i64("tier_1_request_quantity_threshold")?,
            tier_2_requests_threshold: options.get_i64("tier_2_request_quantity_threshold")?,
            excluded_pools: options.pool_set("excluded_pools")?,
        })
    }
}

/// Threshold test: every usage metric at or below its configured limit.
fn within_thresholds(stats: &BucketUsageStats, opts: &Options) -> bool {
    stats.avg_data_size_mb <= opts.data_size_threshold_mb
        && stats.tier1_requests <= opts.tier_1_requests_threshold
        && stats.tier2_requests <= opts.tier_2_requests_threshold
}

pub struct AbandonedBuckets;

#[async_trait]
impl Detector for AbandonedBuckets {
    fn kind(&self) -> ModuleKind {
        ModuleKind::AbandonedBuckets
    }

    fn supported_cloud_types(&self) -> &'static [CloudType] {
        &SUPPORTED
    }

    fn option_schema(&self) -> Vec<OptionDef> {
        vec![
            OptionDef::new("days_threshold", json!(DEFAULT_DAYS_THRESHOLD))
                .with_cleaner(clean_positive_int),
            OptionDef::new("data_size_threshold", json!(DEFAULT_DATA_SIZE_THRESHOLD_MB))
                .with_cleaner(clean_non_negative_number),
            OptionDef::new(
                "tier_1_request_quantity_threshold",
                json!(DEFAULT_TIER_1_REQUESTS_THRESHOLD),
            )
            .with_cleaner(clean_non_negative_number),
            OptionDef::new(
                "tier_2_request_quantity_threshold",
                json!(DEFAULT_TIER_2_REQUESTS_THRESHOLD),
            )
            .with_cleaner(clean_non_negative_number),
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
            let buckets = ResourceRepo::list_by_accounts(
                &ctx.pool,
                &[account_id],
                ResourceType::Bucket,
                &ResourceFilter {
                    active: Some(true),
                    ..Default::default()
                },
            )
            .await?;
            if buckets.is_empty() {
                continue;
            }
            let ids: Vec<Uuid> = buckets.iter().map(|b| b.id).collect();

            let usage =
                BucketUsageRepo::window_stats(&ctx.pool, &ids, window_start, ctx.now, BULK_SIZE)
                    .await?;
            let costs = ExpenseRepo::total_cost_by_resource(
                &ctx.pool,
                &ids,
                window_start,
                ctx.now,
                BULK_SIZE,
            )
            .await?;

            for bucket in &buckets {
                // No usage rows in the window means the analytical store
                // has not aggregated this bucket yet; skip rather than
                // guess.
                let Some(stats) = usage.get(&bucket.id) else {
                    continue;
                };
                if !within_thresholds(stats, &opts) {
                    continue;
                }

                let total = costs.get(&bucket.id).copied().unwrap_or(0.0);
                let daily = average_daily_expense(total, opts.days_threshold as u32);
                let saving = daily_to_monthly(daily);
                if saving <= 0.0 {
                    outcome
                        .irrelevant
                        .insert(bucket.id, "no recent expenses".to_string());
                    continue;
                }

                outcome.candidates.push(NewOptimization {
                    cloud_account_id: account_id,
                    resource_id: bucket.id,
                    cloud_resource_id: bucket.cloud_resource_id.clone(),
                    resource_name: bucket.name.clone(),
                    region: bucket.region.clone(),
                    saving,
                    detail: json!({
                        "avg_data_size_mb": stats.avg_data_size_mb,
                        "tier_1_request_quantity": stats.tier1_requests,
                        "tier_2_request_quantity": stats.tier2_requests,
                        "last_activity": stats.last_activity,
                        "avg_daily_expense": daily,
                    }),
                    is_excluded: pool_excluded(&opts.excluded_pools, bucket),
                });
            }
        }

        Ok(outcome)
    }

    fn recommendation_applied(
        &self,
        _previous: &Optimization,
        live: &Resource,
    ) -> Option<String> {
        if !live.active {
            Some("bucket deleted".to_string())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Options {
        Options {
            days_threshold: 7,
            data_size_threshold_mb: 1024.0,
            tier_1_requests_threshold: 100,
            tier_2_requests_threshold: 2000,
            excluded_pools: HashSet::new(),
        }
    }

    fn stats(size_mb: f64, tier1: i64, tier2: i64) -> BucketUsageStats {
        BucketUsageStats {
            resource_id: Uuid::nil(),
            avg_data_size_mb: size_mb,
            tier1_requests: tier1,
            tier2_requests: tier2,
            last_activity: None,
        }
    }

    #[test]
    fn low_usage_bucket_is_within_thresholds() {
        // avg size 500 (limit 1024), tier1 50 (limit 100), tier2 10
        // (limit 2000): all at or below, so the bucket qualifies.
        assert!(within_thresholds(&stats(500.0, 50, 10), &options()));
    }

    #[test]
    fn any_metric_above_threshold_disqualifies() {
        assert!(!within_thresholds(&stats(2048.0, 50, 10), &options()));
        assert!(!within_thresholds(&stats(500.0, 101, 10), &options()));
        assert!(!within_thresholds(&stats(500.0, 50, 2001), &options()));
    }

    #[test]
    fn thresholds_are_inclusive() {
        assert!(within_thresholds(&stats(1024.0, 100, 2000), &options()));
    }

    #[test]
    fn qualifying_bucket_with_expense_yields_positive_saving() {
        // The saving path: positive average daily expense over the window
        // extrapolates to a positive monthly saving.
        let daily = average_daily_expense(3.5, 7);
        assert!(daily > 0.0);
        assert!(daily_to_monthly(daily) > 0.0);
    }
}
