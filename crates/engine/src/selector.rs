//! Eligible cloud account selection.
//!
//! The returned map is the authoritative "currently eligible accounts"
//! set for a run: detectors scope their queries to it, and the archival
//! reclassifier treats any account outside it as deleted.

use std::collections::{HashMap, HashSet};

use sqlx::PgPool;
use uuid::Uuid;

use costplane_core::cloud::CloudType;
use costplane_db::models::cloud_account::{CloudAccount, CloudAccountSummary};
use costplane_db::repositories::CloudAccountRepo;

use crate::error::EngineError;

/// Select the eligible accounts for an organization.
///
/// Only non-deleted accounts whose type is in `supported_cloud_types`
/// (default: all known types) and whose id is not in the skip set.
pub async fn select_accounts(
    pool: &PgPool,
    organization_id: Uuid,
    supported_cloud_types: &[CloudType],
    skip_cloud_account_ids: &HashSet<Uuid>,
) -> Result<HashMap<Uuid, CloudAccountSummary>, EngineError> {
    let accounts = CloudAccountRepo::list_active(pool, organization_id).await?;
    Ok(filter_accounts(
        accounts,
        supported_cloud_types,
        skip_cloud_account_ids,
    ))
}

/// The pure eligibility filter behind [`select_accounts`].
pub fn filter_accounts(
    accounts: Vec<CloudAccount>,
    supported_cloud_types: &[CloudType],
    skip_cloud_account_ids: &HashSet<Uuid>,
) -> HashMap<Uuid, CloudAccountSummary> {
    let supported: &[CloudType] = if supported_cloud_types.is_empty() {
        &CloudType::ALL
    } else {
        supported_cloud_types
    };

    accounts
        .iter()
        .filter(|a| !a.deleted)
        .filter(|a| supported.contains(&a.cloud_type))
        .filter(|a| !skip_cloud_account_ids.contains(&a.id))
        .map(|a| (a.id, CloudAccountSummary::from(a)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(cloud_type: CloudType, deleted: bool) -> CloudAccount {
        CloudAccount {
            id: Uuid::now_v7(),
            organization_id: Uuid::nil(),
            name: "acct".into(),
            cloud_type,
            deleted,
            config: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn deleted_accounts_are_never_eligible() {
        let accounts = vec![
            account(CloudType::AwsCnr, false),
            account(CloudType::AwsCnr, true),
        ];
        let eligible = filter_accounts(accounts, &CloudType::ALL, &HashSet::new());
        assert_eq!(eligible.len(), 1);
    }

    #[test]
    fn type_filter_restricts_eligibility() {
        let accounts = vec![
            account(CloudType::AwsCnr, false),
            account(CloudType::KubernetesCnr, false),
        ];
        let eligible = filter_accounts(accounts, &[CloudType::AwsCnr], &HashSet::new());
        assert_eq!(eligible.len(), 1);
        assert!(eligible.values().all(|a| a.cloud_type == CloudType::AwsCnr));
    }

    #[test]
    fn empty_type_filter_defaults_to_all_known_types() {
        let accounts = vec![
            account(CloudType::AwsCnr, false),
            account(CloudType::Environment, false),
        ];
        let eligible = filter_accounts(accounts, &[], &HashSet::new());
        assert_eq!(eligible.len(), 2);
    }

    #[test]
    fn skip_set_is_honored() {
        let keep = account(CloudType::AwsCnr, false);
        let skip = account(CloudType::AwsCnr, false);
        let skip_ids: HashSet<Uuid> = [skip.id].into_iter().collect();
        let eligible = filter_accounts(vec![keep.clone(), skip], &CloudType::ALL, &skip_ids);
        assert_eq!(eligible.len(), 1);
        assert!(eligible.contains_key(&keep.id));
    }
}
