//! Archive reason taxonomy for the optimization lifecycle.
//!
//! When a previously active optimization disappears from a detection run,
//! exactly one [`ArchiveReason`] is assigned by the reclassifier. The
//! evaluation order of the reasons is a compatibility contract; see the
//! reclassifier in the engine crate.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Why an optimization left the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveReason {
    /// The owning cloud account was deleted or filtered out.
    CloudAccountDeleted,
    /// The resource no longer exists in the inventory snapshot.
    ResourceDeleted,
    /// The resource's live configuration now matches the recommendation.
    RecommendationApplied,
    /// The opportunity still exists but no longer yields a positive saving.
    RecommendationIrrelevant,
    /// A required external lookup could not be resolved this run.
    FailedDependency,
    /// Organization-level thresholds changed; nothing else explains the drop.
    OptionsChanged,
}

impl ArchiveReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchiveReason::CloudAccountDeleted => "cloud_account_deleted",
            ArchiveReason::ResourceDeleted => "resource_deleted",
            ArchiveReason::RecommendationApplied => "recommendation_applied",
            ArchiveReason::RecommendationIrrelevant => "recommendation_irrelevant",
            ArchiveReason::FailedDependency => "failed_dependency",
            ArchiveReason::OptionsChanged => "options_changed",
        }
    }

    /// Default human-readable description, used when the detector module
    /// does not supply a more specific one.
    pub fn default_description(self) -> &'static str {
        match self {
            ArchiveReason::CloudAccountDeleted => "cloud account deleted",
            ArchiveReason::ResourceDeleted => "resource deleted",
            ArchiveReason::RecommendationApplied => "recommendation applied",
            ArchiveReason::RecommendationIrrelevant => "recommendation irrelevant",
            ArchiveReason::FailedDependency => "failed to resolve a required dependency",
            ArchiveReason::OptionsChanged => "organization options changed",
        }
    }
}

impl std::str::FromStr for ArchiveReason {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cloud_account_deleted" => Ok(ArchiveReason::CloudAccountDeleted),
            "resource_deleted" => Ok(ArchiveReason::ResourceDeleted),
            "recommendation_applied" => Ok(ArchiveReason::RecommendationApplied),
            "recommendation_irrelevant" => Ok(ArchiveReason::RecommendationIrrelevant),
            "failed_dependency" => Ok(ArchiveReason::FailedDependency),
            "options_changed" => Ok(ArchiveReason::OptionsChanged),
            other => Err(CoreError::Validation(format!(
                "Unknown archive reason: \"{other}\""
            ))),
        }
    }
}

impl TryFrom<String> for ArchiveReason {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for ArchiveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
