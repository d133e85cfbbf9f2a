//! Shutdown candidates: instances idle on a predictable weekly schedule.
//!
//! The utilization-metrics service supplies a 168-slot weekly activity
//! grid per instance. A slot is inactive when CPU and combined network
//! traffic sit at or below their thresholds for every metric present.
//! Inactive slots merge into contiguous (day, hour) ranges; the saving is
//! the share of the daily expense covered by those hours, scaled to a
//! 30-day month.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use costplane_core::cloud::{CloudType, ResourceType};
use costplane_core::error::CoreError;
use costplane_core::intervals::{merge_inactive_slots, SlotRange, SLOTS_PER_WEEK};
use costplane_core::options::{
    clean_excluded_pools, clean_non_negative_number, clean_positive_int, OptionDef,
};
use costplane_core::savings::{average_daily_expense, shutdown_saving};
use costplane_db::models::optimization::{NewOptimization, Optimization};
use costplane_db::models::resource::Resource;
use costplane_db::repositories::resource_repo::ResourceFilter;
use costplane_db::repositories::{ExpenseRepo, ResourceRepo};
use costplane_services::metrics::{
    ActivityBreakdown, METRIC_CPU, METRIC_NETWORK_IN, METRIC_NETWORK_OUT,
};

use crate::context::DetectionContext;
use crate::detector::{pool_excluded, DetectionOutcome, Detector, ModuleKind, RunInputs};
use crate::error::EngineError;
use crate::modules::sorted_account_ids;
use crate::options::ResolvedOptions;

/// Max ids per round trip for this module's bulk queries.
const BULK_SIZE: usize = 500;

const DEFAULT_DAYS_THRESHOLD: i64 = 14;

/// CPU utilization at or below this percentage counts as idle.
const DEFAULT_CPU_PERCENT_THRESHOLD: f64 = 5.0;

/// Combined in+out traffic at or below this many bytes/s counts as idle.
const DEFAULT_NETWORK_BPS_THRESHOLD: f64 = 1000.0;

const SUPPORTED: [CloudType; 4] = [
    CloudType::AwsCnr,
    CloudType::AzureCnr,
    CloudType::AlibabaCnr,
    CloudType::GcpCnr,
];

#[derive(Debug)]
struct Options {
    days_threshold: i64,
    cpu_percent_threshold: f64,
    network_bps_threshold: f64,
    excluded_pools: HashSet<Uuid>,
}

impl Options {
    fn parse(options: &ResolvedOptions) -> Result<Self, CoreError> {
        Ok(Self {
            days_threshold: options.get_i64("days_threshold")?,
            cpu_percent_threshold: options.get_f64("cpu_percent_threshold")?,
            network_bps_threshold: options.get_f64("network_bps_threshold")?,
            excluded_pools: options.pool_set("excluded_pools")?,
        })
    }
}

fn slot_value(grid: &ActivityBreakdown, metric: &str, slot: usize) -> Option<f64> {
    grid.get(metric).and_then(|values| values.get(slot).copied().flatten())
}

/// Indices of the inactive slots in a weekly activity grid.
///
/// A slot is inactive when every metric present passes its threshold:
/// CPU at or below the CPU threshold, and combined network traffic at or
/// below the network threshold. A slot with no CPU sample cannot be
/// judged and stays active.
fn inactive_slots(
    grid: &ActivityBreakdown,
    cpu_threshold: f64,
    network_threshold: f64,
) -> Vec<usize> {
    let mut slots = Vec::new();
    for slot in 0..SLOTS_PER_WEEK {
        let Some(cpu) = slot_value(grid, METRIC_CPU, slot) else {
            continue;
        };
        if cpu > cpu_threshold {
            continue;
        }

        let net_in = slot_value(grid, METRIC_NETWORK_IN, slot);
        let net_out = slot_value(grid, METRIC_NETWORK_OUT, slot);
        if net_in.is_some() || net_out.is_some() {
            let combined = net_in.unwrap_or(0.0) + net_out.unwrap_or(0.0);
            if combined > network_threshold {
                continue;
            }
        }

        slots.push(slot);
    }
    slots
}

/// A stopped instance with allocated storage is idle around the clock.
fn full_week() -> Vec<usize> {
    (0..SLOTS_PER_WEEK).collect()
}

fn ranges_payload(ranges: &[SlotRange]) -> serde_json::Value {
    json!(ranges
        .iter()
        .map(|r| {
            json!({
                "start": {"day_of_week": r.start.day_of_week, "hour": r.start.hour},
                "end": {"day_of_week": r.end.day_of_week, "hour": r.end.hour},
            })
        })
        .collect::<Vec<_>>())
}

pub struct InstancesForShutdown;

#[async_trait]
impl Detector for InstancesForShutdown {
    fn kind(&self) -> ModuleKind {
        ModuleKind::InstancesForShutdown
    }

    fn supported_cloud_types(&self) -> &'static [CloudType] {
        &SUPPORTED
    }

    fn option_schema(&self) -> Vec<OptionDef> {
        vec![
            OptionDef::new("days_threshold", json!(DEFAULT_DAYS_THRESHOLD))
                .with_cleaner(clean_positive_int),
            OptionDef::new(
                "cpu_percent_threshold",
                json!(DEFAULT_CPU_PERCENT_THRESHOLD),
            )
            .with_cleaner(clean_non_negative_number),
            OptionDef::new(
                "network_bps_threshold",
                json!(DEFAULT_NETWORK_BPS_THRESHOLD),
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
            let instances = ResourceRepo::list_by_accounts(
                &ctx.pool,
                &[account_id],
                ResourceType::Instance,
                &ResourceFilter {
                    active: Some(true),
                    first_seen_before: Some(window_start),
                    ..Default::default()
                },
            )
            .await?;
            if instances.is_empty() {
                continue;
            }
            let ids: Vec<Uuid> = instances.iter().map(|r| r.id).collect();

            let breakdown = match ctx
                .metrics
                .activity_breakdown(
                    account_id,
                    &ids,
                    window_start,
                    ctx.now,
                    &[METRIC_CPU, METRIC_NETWORK_IN, METRIC_NETWORK_OUT],
                )
                .await
            {
                Ok(breakdown) => breakdown,
                Err(e) => {
                    tracing::warn!(
                        cloud_account_id = %account_id,
                        error = %e,
                        "Activity breakdown lookup failed; skipping account for this run",
                    );
                    outcome.failed_dependencies.extend(ids);
                    continue;
                }
            };

            let costs = ExpenseRepo::total_cost_by_resource(
                &ctx.pool,
                &ids,
                window_start,
                ctx.now,
                BULK_SIZE,
            )
            .await?;

            for instance in &instances {
                let meta = instance.meta();

                let slots = if meta.stopped_allocated {
                    full_week()
                } else {
                    match breakdown.get(&instance.id) {
                        Some(grid) => inactive_slots(
                            grid,
                            opts.cpu_percent_threshold,
                            opts.network_bps_threshold,
                        ),
                        None => {
                            outcome.failed_dependencies.insert(instance.id);
                            continue;
                        }
                    }
                };
                if slots.is_empty() {
                    continue;
                }

                let ranges = merge_inactive_slots(&slots);
                let inactive_hours: usize = ranges.iter().map(|r| r.hours()).sum();

                let total = costs.get(&instance.id).copied().unwrap_or(0.0);
                let daily = average_daily_expense(total, opts.days_threshold as u32);
                let saving = shutdown_saving(daily, inactive_hours);
                if saving <= 0.0 {
                    outcome
                        .irrelevant
                        .insert(instance.id, "no recent expenses".to_string());
                    continue;
                }

                outcome.candidates.push(NewOptimization {
                    cloud_account_id: account_id,
                    resource_id: instance.id,
                    cloud_resource_id: instance.cloud_resource_id.clone(),
                    resource_name: instance.name.clone(),
                    region: instance.region.clone(),
                    saving,
                    detail: json!({
                        "inactivity_ranges": ranges_payload(&ranges),
                        "inactive_hours_per_week": inactive_hours,
                        "avg_daily_expense": daily,
                    }),
                    is_excluded: pool_excluded(&opts.excluded_pools, instance),
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
        if !live.active || live.meta().stopped_allocated {
            Some("instance stopped".to_string())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn grid(cpu: Vec<Option<f64>>, net_in: Vec<Option<f64>>, net_out: Vec<Option<f64>>) -> ActivityBreakdown {
        let mut grid = HashMap::new();
        grid.insert(METRIC_CPU.to_string(), cpu);
        grid.insert(METRIC_NETWORK_IN.to_string(), net_in);
        grid.insert(METRIC_NETWORK_OUT.to_string(), net_out);
        grid
    }

    fn full(value: f64) -> Vec<Option<f64>> {
        vec![Some(value); SLOTS_PER_WEEK]
    }

    #[test]
    fn idle_slots_are_detected() {
        let mut cpu = full(50.0);
        for slot in [0, 1, 2, 3, 4, 5, 9, 10] {
            cpu[slot] = Some(1.0);
        }
        let g = grid(cpu, full(100.0), full(100.0));
        assert_eq!(
            inactive_slots(&g, 5.0, 1000.0),
            vec![0, 1, 2, 3, 4, 5, 9, 10]
        );
    }

    #[test]
    fn busy_network_keeps_slot_active() {
        let g = grid(full(1.0), full(900.0), full(200.0));
        // cpu idle everywhere but in+out = 1100 > 1000.
        assert!(inactive_slots(&g, 5.0, 1000.0).is_empty());
    }

    #[test]
    fn missing_cpu_sample_keeps_slot_active() {
        let mut cpu = full(1.0);
        cpu[7] = None;
        let g = grid(cpu, full(0.0), full(0.0));
        let slots = inactive_slots(&g, 5.0, 1000.0);
        assert!(!slots.contains(&7));
        assert_eq!(slots.len(), SLOTS_PER_WEEK - 1);
    }

    #[test]
    fn missing_network_metrics_do_not_block_idle_cpu() {
        let mut g = HashMap::new();
        g.insert(METRIC_CPU.to_string(), full(1.0));
        assert_eq!(inactive_slots(&g, 5.0, 1000.0).len(), SLOTS_PER_WEEK);
    }

    #[test]
    fn weekly_saving_scales_to_thirty_days() {
        // One fully idle day per week at 24 units/day daily expense:
        // hourly 1.0 * 24h = 24 weekly, / 7 * 30 ≈ 102.86 monthly.
        let saving = shutdown_saving(24.0, 24);
        assert!((saving - 24.0 / 7.0 * 30.0).abs() < 1e-9);
    }
}
