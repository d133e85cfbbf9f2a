//! Option resolution for detector modules.
//!
//! The stored (organization, module) option values are fetched, cleaned,
//! and defaulted against the module's declared schema, in schema order.
//! [`ResolvedOptions`] then gives modules typed access; each module parses
//! the values it declared into a plain struct up front, so a bad value
//! fails the run before any detection work starts.

use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use costplane_core::error::CoreError;
use costplane_core::options::{apply_schema, OptionDef};
use costplane_db::repositories::OptionRepo;

use crate::error::EngineError;

/// Resolved option values for one module run, in schema order.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    values: Vec<(String, serde_json::Value)>,
}

impl ResolvedOptions {
    pub fn from_values(values: Vec<(String, serde_json::Value)>) -> Self {
        Self { values }
    }

    /// Values in schema order, for modules that unpack positionally.
    pub fn as_slice(&self) -> &[(String, serde_json::Value)] {
        &self.values
    }

    fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn get_i64(&self, name: &str) -> Result<i64, CoreError> {
        self.get(name)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| CoreError::Configuration {
                option: name.to_string(),
                message: "expected an integer".to_string(),
            })
    }

    pub fn get_f64(&self, name: &str) -> Result<f64, CoreError> {
        self.get(name)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| CoreError::Configuration {
                option: name.to_string(),
                message: "expected a number".to_string(),
            })
    }

    /// Parse an excluded-pools array (already normalized by the cleaner)
    /// into a pool id set. Ids that are not UUIDs are rejected rather
    /// than silently dropped.
    pub fn pool_set(&self, name: &str) -> Result<HashSet<Uuid>, CoreError> {
        let Some(value) = self.get(name) else {
            return Ok(HashSet::new());
        };
        let items = value.as_array().ok_or_else(|| CoreError::Configuration {
            option: name.to_string(),
            message: "expected an array of pool ids".to_string(),
        })?;
        let mut pools = HashSet::with_capacity(items.len());
        for item in items {
            let id = item
                .as_str()
                .and_then(|s| s.parse::<Uuid>().ok())
                .ok_or_else(|| CoreError::Configuration {
                    option: name.to_string(),
                    message: format!("invalid pool id: {item}"),
                })?;
            pools.insert(id);
        }
        Ok(pools)
    }
}

/// Resolve a module's options for an organization.
///
/// Reads stored values, applies cleaners, substitutes defaults, and
/// returns values in the schema's declared order.
pub async fn resolve(
    pool: &PgPool,
    organization_id: Uuid,
    module: &str,
    schema: &[OptionDef],
) -> Result<ResolvedOptions, EngineError> {
    let stored = OptionRepo::stored_values(pool, organization_id, module).await?;
    let values = apply_schema(schema, stored).map_err(EngineError::Configuration)?;
    Ok(ResolvedOptions::from_values(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use costplane_core::options::{clean_excluded_pools, clean_positive_int};
    use serde_json::json;

    fn resolved(values: Vec<(&str, serde_json::Value)>) -> ResolvedOptions {
        ResolvedOptions::from_values(
            values.into_iter().map(|(n, v)| (n.to_string(), v)).collect(),
        )
    }

    #[test]
    fn typed_getters_read_schema_values() {
        let options = resolved(vec![
            ("days_threshold", json!(7)),
            ("cpu_percent_threshold", json!(5.0)),
        ]);
        assert_eq!(options.get_i64("days_threshold").unwrap(), 7);
        assert_eq!(options.get_f64("cpu_percent_threshold").unwrap(), 5.0);
    }

    #[test]
    fn missing_option_is_a_configuration_error() {
        let options = resolved(vec![]);
        assert_matches!(
            options.get_i64("days_threshold"),
            Err(CoreError::Configuration { .. })
        );
    }

    #[test]
    fn pool_set_parses_uuids() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let options = resolved(vec![(
            "excluded_pools",
            json!([a.to_string(), b.to_string()]),
        )]);
        let pools = options.pool_set("excluded_pools").unwrap();
        assert_eq!(pools.len(), 2);
        assert!(pools.contains(&a));
    }

    #[test]
    fn pool_set_rejects_non_uuid_entries() {
        let options = resolved(vec![("excluded_pools", json!(["not-a-uuid"]))]);
        assert!(options.pool_set("excluded_pools").is_err());
    }

    #[test]
    fn schema_order_is_preserved_for_positional_unpacking() {
        let schema = vec![
            OptionDef::new("days_threshold", json!(3)).with_cleaner(clean_positive_int),
            OptionDef::new("excluded_pools", json!([])).with_cleaner(clean_excluded_pools),
        ];
        let values = apply_schema(&schema, Default::default()).unwrap();
        let names: Vec<&str> = values.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["days_threshold", "excluded_pools"]);
    }
}
