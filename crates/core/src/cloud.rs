//! Cloud account and resource type enums.
//!
//! Discriminant strings match the values stored in the `cloud_accounts`
//! and `resources` tables. `TryFrom<String>` is provided so row structs
//! in the db crate can decode TEXT columns directly.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Provider family of a cloud account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudType {
    AwsCnr,
    AzureCnr,
    AlibabaCnr,
    GcpCnr,
    KubernetesCnr,
    Environment,
}

impl CloudType {
    /// Every known cloud type. Used as the default account filter.
    pub const ALL: [CloudType; 6] = [
        CloudType::AwsCnr,
        CloudType::AzureCnr,
        CloudType::AlibabaCnr,
        CloudType::GcpCnr,
        CloudType::KubernetesCnr,
        CloudType::Environment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CloudType::AwsCnr => "aws_cnr",
            CloudType::AzureCnr => "azure_cnr",
            CloudType::AlibabaCnr => "alibaba_cnr",
            CloudType::GcpCnr => "gcp_cnr",
            CloudType::KubernetesCnr => "kubernetes_cnr",
            CloudType::Environment => "environment",
        }
    }
}

impl std::str::FromStr for CloudType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws_cnr" => Ok(CloudType::AwsCnr),
            "azure_cnr" => Ok(CloudType::AzureCnr),
            "alibaba_cnr" => Ok(CloudType::AlibabaCnr),
            "gcp_cnr" => Ok(CloudType::GcpCnr),
            "kubernetes_cnr" => Ok(CloudType::KubernetesCnr),
            "environment" => Ok(CloudType::Environment),
            other => Err(CoreError::Validation(format!(
                "Unknown cloud type: \"{other}\""
            ))),
        }
    }
}

impl TryFrom<String> for CloudType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for CloudType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inventory resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Instance,
    Volume,
    Snapshot,
    Bucket,
    Image,
    RdsInstance,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Instance => "instance",
            ResourceType::Volume => "volume",
            ResourceType::Snapshot => "snapshot",
            ResourceType::Bucket => "bucket",
            ResourceType::Image => "image",
            ResourceType::RdsInstance => "rds_instance",
        }
    }
}

impl std::str::FromStr for ResourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instance" => Ok(ResourceType::Instance),
            "volume" => Ok(ResourceType::Volume),
            "snapshot" => Ok(ResourceType::Snapshot),
            "bucket" => Ok(ResourceType::Bucket),
            "image" => Ok(ResourceType::Image),
            "rds_instance" => Ok(ResourceType::RdsInstance),
            other => Err(CoreError::Validation(format!(
                "Unknown resource type: \"{other}\""
            ))),
        }
    }
}

impl TryFrom<String> for ResourceType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_type_serde_round_trip() {
        let json = serde_json::to_string(&CloudType::AwsCnr).unwrap();
        assert_eq!(json, "\"aws_cnr\"");
        let back: CloudType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CloudType::AwsCnr);
    }

    #[test]
    fn cloud_type_parse_rejects_unknown() {
        assert!("digitalocean".parse::<CloudType>().is_err());
    }

    #[test]
    fn all_contains_every_variant() {
        assert_eq!(CloudType::ALL.len(), 6);
    }

    #[test]
    fn resource_type_display_matches_parse() {
        for rt in [
            ResourceType::Instance,
            ResourceType::Volume,
            ResourceType::Snapshot,
            ResourceType::Bucket,
            ResourceType::Image,
            ResourceType::RdsInstance,
        ] {
            assert_eq!(rt.to_string().parse::<ResourceType>().unwrap(), rt);
        }
    }
}
