//! Archival reclassification.
//!
//! After a detection pass, every previously active optimization whose
//! resource is absent from the fresh candidate set must be archived with
//! exactly one reason. The predicate order below is a compatibility
//! contract: the same input must always produce the same observable
//! reason, and reordering the checks changes reasons for real data (a
//! deleted account whose resource is also gone must read
//! CLOUD_ACCOUNT_DELETED, never RESOURCE_DELETED).

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use costplane_core::archive::ArchiveReason;
use costplane_core::types::Timestamp;
use costplane_db::models::cloud_account::CloudAccountSummary;
use costplane_db::models::optimization::{ArchivedOptimization, Optimization};
use costplane_db::models::resource::Resource;

/// Everything the reclassifier needs about the current run.
pub struct ReclassifyInputs<'a> {
    /// The previous run's active set, loaded read-only up front.
    pub previous: &'a [Optimization],
    /// Resource ids of the current run's candidates.
    pub current_keys: &'a HashSet<Uuid>,
    /// Authoritative eligible account set from the account selector.
    pub eligible_accounts: &'a HashMap<Uuid, CloudAccountSummary>,
    /// Current inventory snapshot for the previous optimizations'
    /// resources.
    pub live_resources: &'a HashMap<Uuid, Resource>,
    /// Resources whose required external lookup failed this run.
    pub failed_dependencies: &'a HashSet<Uuid>,
    /// Resources evaluated but no longer yielding a positive saving,
    /// with module-supplied descriptions.
    pub irrelevant: &'a HashMap<Uuid, String>,
    /// Module-supplied applied-recommendation descriptions per resource.
    pub applied: &'a HashMap<Uuid, String>,
    pub now: Timestamp,
}

/// Diff the previous active set against the current candidates and assign
/// an archive reason to every optimization that disappeared.
///
/// For each disappeared optimization the first matching predicate wins:
/// 1. CLOUD_ACCOUNT_DELETED
/// 2. RESOURCE_DELETED
/// 3. RECOMMENDATION_APPLIED
/// 4. FAILED_DEPENDENCY
/// 5. RECOMMENDATION_IRRELEVANT
/// 6. OPTIONS_CHANGED
pub fn reclassify(inputs: &ReclassifyInputs<'_>) -> Vec<ArchivedOptimization> {
    let mut archived = Vec::new();

    for previous in inputs.previous {
        if inputs.current_keys.contains(&previous.resource_id) {
            continue;
        }

        let (reason, description) = resolve_reason(inputs, previous);
        archived.push(ArchivedOptimization::from_active(
            previous,
            reason,
            description,
            inputs.now,
        ));
    }

    archived
}

fn resolve_reason(
    inputs: &ReclassifyInputs<'_>,
    previous: &Optimization,
) -> (ArchiveReason, String) {
    if !inputs
        .eligible_accounts
        .contains_key(&previous.cloud_account_id)
    {
        let reason = ArchiveReason::CloudAccountDeleted;
        return (reason, reason.default_description().to_string());
    }

    if !inputs.live_resources.contains_key(&previous.resource_id) {
        let reason = ArchiveReason::ResourceDeleted;
        return (reason, reason.default_description().to_string());
    }

    if let Some(description) = inputs.applied.get(&previous.resource_id) {
        return (ArchiveReason::RecommendationApplied, description.clone());
    }

    if inputs.failed_dependencies.contains(&previous.resource_id) {
        let reason = ArchiveReason::FailedDependency;
        return (reason, reason.default_description().to_string());
    }

    if let Some(description) = inputs.irrelevant.get(&previous.resource_id) {
        return (ArchiveReason::RecommendationIrrelevant, description.clone());
    }

    let reason = ArchiveReason::OptionsChanged;
    (reason, reason.default_description().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use costplane_core::cloud::{CloudType, ResourceType};

    fn optimization(account: Uuid, resource: Uuid) -> Optimization {
        Optimization {
            id: Uuid::now_v7(),
            organization_id: Uuid::nil(),
            cloud_account_id: account,
            module: "rightsizing".into(),
            resource_id: resource,
            cloud_resource_id: "i-123".into(),
            resource_name: Some("worker".into()),
            region: Some("us-east-1".into()),
            saving: 12.0,
            detail: serde_json::json!({}),
            is_excluded: false,
            detected_at: Utc::now(),
        }
    }

    fn live_resource(id: Uuid, account: Uuid) -> Resource {
        Resource {
            id,
            cloud_resource_id: "i-123".into(),
            cloud_account_id: account,
            resource_type: ResourceType::Instance,
            name: None,
            region: None,
            pool_id: None,
            employee_id: None,
            tags: serde_json::json!({}),
            first_seen: Utc::now(),
            last_seen: Utc::now(),
            active: true,
            meta: serde_json::json!({}),
        }
    }

    fn summary(id: Uuid) -> CloudAccountSummary {
        CloudAccountSummary {
            id,
            name: "acct".into(),
            cloud_type: CloudType::AwsCnr,
        }
    }

    struct Fixture {
        previous: Vec<Optimization>,
        current_keys: HashSet<Uuid>,
        eligible: HashMap<Uuid, CloudAccountSummary>,
        live: HashMap<Uuid, Resource>,
        failed: HashSet<Uuid>,
        irrelevant: HashMap<Uuid, String>,
        applied: HashMap<Uuid, String>,
    }

    impl Fixture {
        fn new(previous: Vec<Optimization>) -> Self {
            Self {
                previous,
                current_keys: HashSet::new(),
                eligible: HashMap::new(),
                live: HashMap::new(),
                failed: HashSet::new(),
                irrelevant: HashMap::new(),
                applied: HashMap::new(),
            }
        }

        fn run(&self) -> Vec<ArchivedOptimization> {
            reclassify(&ReclassifyInputs {
                previous: &self.previous,
                current_keys: &self.current_keys,
                eligible_accounts: &self.eligible,
                live_resources: &self.live,
                failed_dependencies: &self.failed,
                irrelevant: &self.irrelevant,
                applied: &self.applied,
                now: Utc::now(),
            })
        }
    }

    #[test]
    fn still_active_candidates_are_not_archived() {
        let account = Uuid::now_v7();
        let resource = Uuid::now_v7();
        let mut fx = Fixture::new(vec![optimization(account, resource)]);
        fx.current_keys.insert(resource);
        assert!(fx.run().is_empty());
    }

    #[test]
    fn account_deleted_wins_over_resource_deleted() {
        // Both the account and the resource are gone; the reason must be
        // CLOUD_ACCOUNT_DELETED.
        let account = Uuid::now_v7();
        let resource = Uuid::now_v7();
        let fx = Fixture::new(vec![optimization(account, resource)]);
        let archived = fx.run();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].reason, ArchiveReason::CloudAccountDeleted);
    }

    #[test]
    fn resource_deleted_when_account_still_eligible() {
        let account = Uuid::now_v7();
        let resource = Uuid::now_v7();
        let mut fx = Fixture::new(vec![optimization(account, resource)]);
        fx.eligible.insert(account, summary(account));
        let archived = fx.run();
        assert_eq!(archived[0].reason, ArchiveReason::ResourceDeleted);
        assert_eq!(archived[0].description, "resource deleted");
    }

    #[test]
    fn applied_wins_over_failed_dependency_and_irrelevant() {
        let account = Uuid::now_v7();
        let resource = Uuid::now_v7();
        let mut fx = Fixture::new(vec![optimization(account, resource)]);
        fx.eligible.insert(account, summary(account));
        fx.live.insert(resource, live_resource(resource, account));
        fx.applied.insert(resource, "flavor changed".into());
        fx.failed.insert(resource);
        fx.irrelevant
            .insert(resource, "recommended flavor more expensive".into());

        let archived = fx.run();
        assert_eq!(archived[0].reason, ArchiveReason::RecommendationApplied);
        assert_eq!(archived[0].description, "flavor changed");
    }

    #[test]
    fn failed_dependency_wins_over_irrelevant() {
        let account = Uuid::now_v7();
        let resource = Uuid::now_v7();
        let mut fx = Fixture::new(vec![optimization(account, resource)]);
        fx.eligible.insert(account, summary(account));
        fx.live.insert(resource, live_resource(resource, account));
        fx.failed.insert(resource);
        fx.irrelevant.insert(resource, "no positive saving".into());

        let archived = fx.run();
        assert_eq!(archived[0].reason, ArchiveReason::FailedDependency);
    }

    #[test]
    fn irrelevant_carries_module_description() {
        let account = Uuid::now_v7();
        let resource = Uuid::now_v7();
        let mut fx = Fixture::new(vec![optimization(account, resource)]);
        fx.eligible.insert(account, summary(account));
        fx.live.insert(resource, live_resource(resource, account));
        fx.irrelevant
            .insert(resource, "recommended flavor more expensive".into());

        let archived = fx.run();
        assert_eq!(archived[0].reason, ArchiveReason::RecommendationIrrelevant);
        assert_eq!(archived[0].description, "recommended flavor more expensive");
    }

    #[test]
    fn options_changed_is_the_fallback() {
        let account = Uuid::now_v7();
        let resource = Uuid::now_v7();
        let mut fx = Fixture::new(vec![optimization(account, resource)]);
        fx.eligible.insert(account, summary(account));
        fx.live.insert(resource, live_resource(resource, account));

        let archived = fx.run();
        assert_eq!(archived[0].reason, ArchiveReason::OptionsChanged);
    }

    #[test]
    fn every_disappeared_optimization_is_archived_exactly_once() {
        let account = Uuid::now_v7();
        let kept = Uuid::now_v7();
        let dropped_a = Uuid::now_v7();
        let dropped_b = Uuid::now_v7();
        let mut fx = Fixture::new(vec![
            optimization(account, kept),
            optimization(account, dropped_a),
            optimization(account, dropped_b),
        ]);
        fx.eligible.insert(account, summary(account));
        fx.current_keys.insert(kept);

        let archived = fx.run();
        assert_eq!(archived.len(), 2);
        let ids: HashSet<Uuid> = archived.iter().map(|a| a.resource_id).collect();
        assert!(ids.contains(&dropped_a) && ids.contains(&dropped_b));
    }
}
