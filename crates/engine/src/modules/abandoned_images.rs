//! Abandoned images: machine images nothing has used in a while.
//!
//! An image's last-used timestamp is derived from the activity of volumes
//! and snapshots created from it. Images unreferenced for longer than the
//! threshold keep costing storage; the saving is the trailing window's
//! average daily expense extrapolated to a month.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use costplane_core::cloud::{CloudType, ResourceType};
use costplane_core::error::CoreError;
use costplane_core::options::{clean_excluded_pools, clean_positive_int, OptionDef};
use costplane_core::savings::{average_daily_expense, daily_to_monthly};
use costplane_core::types::Timestamp;
use costplane_db::models::optimization::{NewOptimization, Optimization};
use costplane_db::models::resource::Resource;
use costplane_db::repositories::resource_repo::ResourceFilter;
use costplane_db::repositories::{ExpenseRepo, ResourceRepo};

use crate::context::DetectionContext;
use crate::detector::{pool_excluded, DetectionOutcome, Detector, ModuleKind, RunInputs};
use crate::error::EngineError;
use crate::modules::sorted_account_ids;
use crate::options::ResolvedOptions;

/// Max ids per round trip for this module's bulk queries.
const BULK_SIZE: usize = 1000;

const DEFAULT_DAYS_THRESHOLD: i64 = 7;

const SUPPORTED: [CloudType; 3] = [
    CloudType::AwsCnr,
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

/// Whether an image with the given last-used timestamp counts as
/// abandoned at `now`.
fn is_abandoned(last_used: Timestamp, now: Timestamp, days_threshold: i64) -> bool {
    last_used < now - Duration::days(days_threshold)
}

pub struct AbandonedImages;

#[async_trait]
impl Detector for AbandonedImages {
    fn kind(&self) -> ModuleKind {
        ModuleKind::AbandonedImages
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
            let images = ResourceRepo::list_by_accounts(
                &ctx.pool,
                &[account_id],
                ResourceType::Image,
                &ResourceFilter {
                    active: Some(true),
                    ..Default::default()
                },
            )
            .await?;
            if images.is_empty() {
                continue;
            }

            let image_cloud_ids: Vec<String> =
                images.iter().map(|i| i.cloud_resource_id.clone()).collect();
            let references = ResourceRepo::last_image_reference(
                &ctx.pool,
                &[account_id],
                &image_cloud_ids,
                BULK_SIZE,
            )
            .await?;

            let ids: Vec<Uuid> = images.iter().map(|i| i.id).collect();
            let costs = ExpenseRepo::total_cost_by_resource(
                &ctx.pool,
                &ids,
                window_start,
                ctx.now,
                BULK_SIZE,
            )
            .await?;

            for image in &images {
                // Images nothing ever referenced age out from first_seen.
                let last_used = references
                    .get(&image.cloud_resource_id)
                    .copied()
                    .unwrap_or(image.first_seen);
                if !is_abandoned(last_used, ctx.now, opts.days_threshold) {
                    continue;
                }

                let total = costs.get(&image.id).copied().unwrap_or(0.0);
                let daily = average_daily_expense(total, opts.days_threshold as u32);
                let saving = daily_to_monthly(daily);
                if saving <= 0.0 {
                    outcome
                        .irrelevant
                        .insert(image.id, "no recent expenses".to_string());
                    continue;
                }

                outcome.candidates.push(NewOptimization {
                    cloud_account_id: account_id,
                    resource_id: image.id,
                    cloud_resource_id: image.cloud_resource_id.clone(),
                    resource_name: image.name.clone(),
                    region: image.region.clone(),
                    saving,
                    detail: json!({
                        "last_used": last_used,
                        "avg_daily_expense": daily,
                    }),
                    is_excluded: pool_excluded(&opts.excluded_pools, image),
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
        // Deleting the image is the recommendation; the inventory keeps
        // the row with `active = false` once the cloud-side object is
        // gone, which is how an applied deletion is distinguished from a
        // purged inventory row (RESOURCE_DELETED).
        if !live.active {
            Some("image deleted".to_string())
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
    fn stale_reference_is_abandoned() {
        let now = Utc::now();
        assert!(is_abandoned(now - Duration::days(10), now, 7));
    }

    #[test]
    fn recent_reference_is_not_abandoned() {
        let now = Utc::now();
        assert!(!is_abandoned(now - Duration::days(2), now, 7));
    }

    #[test]
    fn threshold_boundary_is_exclusive() {
        let now = Utc::now();
        // Exactly at the boundary: not older than the threshold.
        assert!(!is_abandoned(now - Duration::days(7), now, 7));
    }

    fn live_image(active: bool) -> Resource {
        Resource {
            id: Uuid::now_v7(),
            cloud_resource_id: "ami-123".into(),
            cloud_account_id: Uuid::now_v7(),
            resource_type: ResourceType::Image,
            name: None,
            region: None,
            pool_id: None,
            employee_id: None,
            tags: json!({}),
            first_seen: Utc::now(),
            last_seen: Utc::now(),
            active,
            meta: json!({}),
        }
    }

    fn previous() -> Optimization {
        Optimization {
            id: Uuid::now_v7(),
            organization_id: Uuid::nil(),
            cloud_account_id: Uuid::now_v7(),
            module: "abandoned_images".into(),
            resource_id: Uuid::now_v7(),
            cloud_resource_id: "ami-123".into(),
            resource_name: None,
            region: None,
            saving: 5.0,
            detail: json!({}),
            is_excluded: false,
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn deleted_image_counts_as_applied() {
        let description = AbandonedImages.recommendation_applied(&previous(), &live_image(false));
        assert_eq!(description.as_deref(), Some("image deleted"));
    }

    #[test]
    fn active_image_is_not_applied() {
        assert!(AbandonedImages
            .recommendation_applied(&previous(), &live_image(true))
            .is_none());
    }
}
