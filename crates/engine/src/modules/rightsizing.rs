//! Rightsizing: instances whose CPU load fits a cheaper flavor.
//!
//! For each mature instance the module reads average CPU utilization,
//! derives the recommended CPU count, and asks the pricing service for
//! the cheapest same-family flavor satisfying it. A candidate is emitted
//! only when the projected monthly cost with the recommended flavor is
//! strictly lower than the current monthly cost (current = day cost x 30).

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
use costplane_core::savings::daily_to_monthly;
use costplane_db::models::optimization::{NewOptimization, Optimization};
use costplane_db::models::resource::Resource;
use costplane_db::repositories::resource_repo::ResourceFilter;
use costplane_db::repositories::{ExpenseRepo, ResourceRepo};
use costplane_providers::DEFAULT_CPU_COUNT;
use costplane_services::metrics::METRIC_CPU;
use costplane_services::pricing::{FlavorSearch, FlavorSearchMode};

use crate::context::DetectionContext;
use crate::detector::{
    detail_str, pool_excluded, DetectionOutcome, Detector, ModuleKind, RunInputs,
};
use crate::error::EngineError;
use crate::options::ResolvedOptions;
use crate::modules::sorted_account_ids;

/// Max ids per round trip for this module's bulk queries.
const BULK_SIZE: usize = 500;

const DEFAULT_DAYS_THRESHOLD: i64 = 3;

/// Target CPU load percentage a rightsized instance should run at.
const DEFAULT_OPTIMAL_CPU_LOAD: f64 = 80.0;

const SUPPORTED: [CloudType; 4] = [
    CloudType::AwsCnr,
    CloudType::AzureCnr,
    CloudType::AlibabaCnr,
    CloudType::GcpCnr,
];

#[derive(Debug)]
struct Options {
    days_threshold: i64,
    optimal_cpu_load: f64,
    excluded_pools: HashSet<Uuid>,
}

impl Options {
    fn parse(options: &ResolvedOptions) -> Result<Self, CoreError> {
        Ok(Self {
            days_threshold: options.get_i64("days_threshold")?,
            optimal_cpu_load: options.get_f64("optimal_cpu_load")?,
            excluded_pools: options.pool_set("excluded_pools")?,
        })
    }
}

/// CPU count the instance actually needs, given its observed average
/// load and the target load. Never below 1, never above the current
/// count (this module only sizes down).
fn recommended_cpu(current_cpu: i32, avg_cpu_percent: f64, optimal_load: f64) -> i32 {
    if optimal_load <= 0.0 {
        return current_cpu;
    }
    let needed = (f64::from(current_cpu) * avg_cpu_percent / optimal_load).ceil() as i32;
    needed.clamp(1, current_cpu.max(1))
}

pub struct Rightsizing;

#[async_trait]
impl Detector for Rightsizing {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Rightsizing
    }

    fn supported_cloud_types(&self) -> &'static [CloudType] {
        &SUPPORTED
    }

    fn option_schema(&self) -> Vec<OptionDef> {
        vec![
            OptionDef::new("days_threshold", json!(DEFAULT_DAYS_THRESHOLD))
                .with_cleaner(clean_positive_int),
            OptionDef::new("optimal_cpu_load", json!(DEFAULT_OPTIMAL_CPU_LOAD))
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
            let account = &inputs.accounts[&account_id];
            let resources = ResourceRepo::list_by_accounts(
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

            let sized: Vec<&Resource> = resources
                .iter()
                .filter(|r| r.meta().flavor.is_some())
                .collect();
            if sized.is_empty() {
                continue;
            }
            let ids: Vec<Uuid> = sized.iter().map(|r| r.id).collect();

            let averages = match ctx
                .metrics
                .average_metrics(account_id, &ids, window_start, ctx.now, &[METRIC_CPU])
                .await
            {
                Ok(averages) => averages,
                Err(e) => {
                    tracing::warn!(
                        cloud_account_id = %account_id,
                        error = %e,
                        "Metrics lookup failed; skipping account for this run",
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

            for resource in sized {
                let meta = resource.meta();
                let flavor = meta.flavor.clone().unwrap_or_default();
                let region = resource.region.clone().unwrap_or_default();

                let Some(avg_cpu) = averages
                    .get(&resource.id)
                    .and_then(|m| m.get(METRIC_CPU))
                    .copied()
                else {
                    outcome.failed_dependencies.insert(resource.id);
                    continue;
                };

                let current = match ctx
                    .pricing
                    .find_flavor(&FlavorSearch {
                        cloud_type: account.cloud_type,
                        region: region.clone(),
                        mode: FlavorSearchMode::Current,
                        flavor: Some(flavor.clone()),
                        min_cpu: None,
                        os: meta.os.clone(),
                        currency: ctx.currency.clone(),
                        params: serde_json::Value::Null,
                    })
                    .await
                {
                    Ok(Some(current)) => current,
                    Ok(None) | Err(_) => {
                        outcome.failed_dependencies.insert(resource.id);
                        continue;
                    }
                };

                let cpu_count = meta.cpu_count.unwrap_or(current.cpu.max(DEFAULT_CPU_COUNT));
                let target_cpu = recommended_cpu(cpu_count, avg_cpu, opts.optimal_cpu_load);

                let recommended = match ctx
                    .pricing
                    .find_flavor(&FlavorSearch {
                        cloud_type: account.cloud_type,
                        region: region.clone(),
                        mode: FlavorSearchMode::CheapestInFamily,
                        flavor: Some(flavor.clone()),
                        min_cpu: Some(target_cpu),
                        os: meta.os.clone(),
                        currency: ctx.currency.clone(),
                        params: serde_json::Value::Null,
                    })
                    .await
                {
                    Ok(Some(recommended)) => recommended,
                    Ok(None) | Err(_) => {
                        outcome.failed_dependencies.insert(resource.id);
                        continue;
                    }
                };

                // Billing-derived day cost; catalog price when the window
                // has no billed rows yet.
                let billed = costs.get(&resource.id).copied().unwrap_or(0.0);
                let day_cost = if billed > 0.0 {
                    billed / opts.days_threshold as f64
                } else {
                    current.daily_price
                };

                let current_monthly = daily_to_monthly(day_cost);
                let recommended_monthly = daily_to_monthly(recommended.daily_price);

                if recommended_monthly < current_monthly && recommended.name != flavor {
                    outcome.candidates.push(NewOptimization {
                        cloud_account_id: account_id,
                        resource_id: resource.id,
                        cloud_resource_id: resource.cloud_resource_id.clone(),
                        resource_name: resource.name.clone(),
                        region: resource.region.clone(),
                        saving: current_monthly - recommended_monthly,
                        detail: json!({
                            "current_flavor": flavor,
                            "recommended_flavor": recommended.name,
                            "recommended_cpu": recommended.cpu,
                            "cpu_avg_percent": avg_cpu,
                            "current_monthly_cost": current_monthly,
                            "recommended_monthly_cost": recommended_monthly,
                        }),
                        is_excluded: pool_excluded(&opts.excluded_pools, resource),
                    });
                } else {
                    outcome.irrelevant.insert(
                        resource.id,
                        "recommended flavor more expensive".to_string(),
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
    use chrono::Utc;

    #[test]
    fn recommended_cpu_sizes_down_to_fit_target_load() {
        // 8 cores at 15% average load against an 80% target: ceil(1.5) = 2.
        assert_eq!(recommended_cpu(8, 15.0, 80.0), 2);
    }

    #[test]
    fn recommended_cpu_never_sizes_up() {
        assert_eq!(recommended_cpu(2, 95.0, 80.0), 2);
    }

    #[test]
    fn recommended_cpu_floor_is_one() {
        assert_eq!(recommended_cpu(4, 0.0, 80.0), 1);
    }

    fn previous_with_recommendation(flavor: &str) -> Optimization {
        Optimization {
            id: Uuid::now_v7(),
            organization_id: Uuid::nil(),
            cloud_account_id: Uuid::now_v7(),
            module: "rightsizing".into(),
            resource_id: Uuid::now_v7(),
            cloud_resource_id: "i-123".into(),
            resource_name: None,
            region: None,
            saving: 10.0,
            detail: json!({"recommended_flavor": flavor, "current_flavor": "m5.xlarge"}),
            is_excluded: false,
            detected_at: Utc::now(),
        }
    }

    fn live_with_flavor(flavor: &str) -> Resource {
        Resource {
            id: Uuid::now_v7(),
            cloud_resource_id: "i-123".into(),
            cloud_account_id: Uuid::now_v7(),
            resource_type: ResourceType::Instance,
            name: None,
            region: None,
            pool_id: None,
            employee_id: None,
            tags: json!({}),
            first_seen: Utc::now(),
            last_seen: Utc::now(),
            active: true,
            meta: json!({"flavor": flavor}),
        }
    }

    #[test]
    fn applied_when_live_flavor_matches_recommendation() {
        let detector = Rightsizing;
        let description = detector.recommendation_applied(
            &previous_with_recommendation("m5.large"),
            &live_with_flavor("m5.large"),
        );
        assert_eq!(description.as_deref(), Some("flavor changed"));
    }

    #[test]
    fn not_applied_while_flavor_unchanged() {
        let detector = Rightsizing;
        let description = detector.recommendation_applied(
            &previous_with_recommendation("m5.large"),
            &live_with_flavor("m5.xlarge"),
        );
        assert!(description.is_none());
    }

    #[test]
    fn schema_declares_options_in_positional_order() {
        let schema = Rightsizing.option_schema();
        let names: Vec<&str> = schema.iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["days_threshold", "optimal_cpu_load", "excluded_pools"]
        );
    }
}
