//! Detector module implementations, one per optimization family.

use std::collections::HashMap;

use uuid::Uuid;

use costplane_db::models::cloud_account::CloudAccountSummary;

pub mod abandoned_buckets;
pub mod abandoned_images;
pub mod generation_upgrade;
pub mod instances_for_shutdown;
pub mod rightsizing;
pub mod short_living_instances;

/// Account ids in a stable order so run output ordering is deterministic.
pub(crate) fn sorted_account_ids(accounts: &HashMap<Uuid, CloudAccountSummary>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = accounts.keys().copied().collect();
    ids.sort();
    ids
}
