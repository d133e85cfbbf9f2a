//! Stored per-organization module option values.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `option_sets` table: one configured option value for one
/// (organization, module) pair. Absence of a row means the module default
/// applies; the resolver fills it in.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OptionValue {
    pub organization_id: Uuid,
    pub module: String,
    pub name: String,
    pub value: serde_json::Value,
}
