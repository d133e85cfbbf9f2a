//! The detector module contract and static registry.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use uuid::Uuid;

use costplane_core::cloud::CloudType;
use costplane_core::options::OptionDef;
use costplane_db::models::cloud_account::CloudAccountSummary;
use costplane_db::models::optimization::{NewOptimization, Optimization};
use costplane_db::models::resource::Resource;

use crate::context::DetectionContext;
use crate::error::EngineError;
use crate::options::ResolvedOptions;

/// One optimization family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Rightsizing,
    AbandonedImages,
    AbandonedBuckets,
    ShortLivingInstances,
    InstancesForShutdown,
    GenerationUpgrade,
}

impl ModuleKind {
    /// Every registered module, in scheduling order.
    pub const ALL: [ModuleKind; 6] = [
        ModuleKind::Rightsizing,
        ModuleKind::AbandonedImages,
        ModuleKind::AbandonedBuckets,
        ModuleKind::ShortLivingInstances,
        ModuleKind::InstancesForShutdown,
        ModuleKind::GenerationUpgrade,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKind::Rightsizing => "rightsizing",
            ModuleKind::AbandonedImages => "abandoned_images",
            ModuleKind::AbandonedBuckets => "abandoned_buckets",
            ModuleKind::ShortLivingInstances => "short_living_instances",
            ModuleKind::InstancesForShutdown => "instances_for_shutdown",
            ModuleKind::GenerationUpgrade => "generation_upgrade",
        }
    }

    /// Construct the detector for this module. Static dispatch table;
    /// there is deliberately no string-keyed factory.
    pub fn detector(self) -> Box<dyn Detector> {
        use crate::modules;
        match self {
            ModuleKind::Rightsizing => Box::new(modules::rightsizing::Rightsizing),
            ModuleKind::AbandonedImages => Box::new(modules::abandoned_images::AbandonedImages),
            ModuleKind::AbandonedBuckets => {
                Box::new(modules::abandoned_buckets::AbandonedBuckets)
            }
            ModuleKind::ShortLivingInstances => {
                Box::new(modules::short_living_instances::ShortLivingInstances)
            }
            ModuleKind::InstancesForShutdown => {
                Box::new(modules::instances_for_shutdown::InstancesForShutdown)
            }
            ModuleKind::GenerationUpgrade => {
                Box::new(modules::generation_upgrade::GenerationUpgrade)
            }
        }
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run inputs shared by every detector.
#[derive(Debug, Clone)]
pub struct RunInputs {
    /// Eligible accounts for this run, keyed by account id.
    pub accounts: HashMap<Uuid, CloudAccountSummary>,
    /// Options resolved against the module's schema.
    pub options: ResolvedOptions,
}

/// What one detection pass produced.
#[derive(Debug, Default)]
pub struct DetectionOutcome {
    /// Fresh optimization candidates.
    pub candidates: Vec<NewOptimization>,
    /// Resources whose required external lookup failed this run. Fresh
    /// detection skips them; archival records FAILED_DEPENDENCY.
    pub failed_dependencies: HashSet<Uuid>,
    /// Resources that were evaluated, still structurally qualify, but no
    /// longer yield a positive saving. Keyed by resource id with a
    /// module-supplied description for the archive record.
    pub irrelevant: HashMap<Uuid, String>,
}

/// One pluggable optimization family.
#[async_trait]
pub trait Detector: Send + Sync {
    fn kind(&self) -> ModuleKind;

    /// Cloud types this module understands. The account selector filters
    /// on it; an empty slice means all known types.
    fn supported_cloud_types(&self) -> &'static [CloudType];

    /// Ordered option schema (defaults and cleaners).
    fn option_schema(&self) -> Vec<OptionDef>;

    /// Produce the current run's candidates.
    async fn detect(
        &self,
        ctx: &DetectionContext,
        inputs: &RunInputs,
    ) -> Result<DetectionOutcome, EngineError>;

    /// Archival hook: has the previously recommended change been applied
    /// to the live resource? Returns the archive description if so.
    fn recommendation_applied(
        &self,
        _previous: &Optimization,
        _live: &Resource,
    ) -> Option<String> {
        None
    }
}

/// Read a string field out of a candidate's detail payload.
pub(crate) fn detail_str<'a>(optimization: &'a Optimization, field: &str) -> Option<&'a str> {
    optimization.detail.get(field).and_then(|v| v.as_str())
}

/// Shared helper: is the resource's pool administratively excluded?
pub(crate) fn pool_excluded(
    excluded_pools: &HashSet<Uuid>,
    resource: &Resource,
) -> bool {
    resource
        .pool_id
        .map(|pool| excluded_pools.contains(&pool))
        .unwrap_or(false)
}
