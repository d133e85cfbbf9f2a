//! Option schema primitives for detector modules.
//!
//! Each module declares an ordered schema of named options with a default
//! value and an optional cleaning function. The resolver in the engine
//! crate reads stored values, cleans them, substitutes defaults, and
//! returns the values in declared order (some modules unpack the resolved
//! list positionally into typed structs).

use serde_json::Value;

use crate::error::CoreError;

/// Normalizes or validates a stored option value.
pub type OptionCleaner = fn(&str, Value) -> Result<Value, CoreError>;

/// One entry in a module's option schema.
#[derive(Debug, Clone)]
pub struct OptionDef {
    /// Option name as stored per (organization, module).
    pub name: &'static str,
    /// Value used when the organization has not configured the option.
    pub default: Value,
    /// Applied to stored values only; defaults are assumed clean.
    pub cleaner: Option<OptionCleaner>,
}

impl OptionDef {
    pub fn new(name: &'static str, default: Value) -> Self {
        Self {
            name,
            default,
            cleaner: None,
        }
    }

    pub fn with_cleaner(mut self, cleaner: OptionCleaner) -> Self {
        self.cleaner = Some(cleaner);
        self
    }
}

/// Apply a schema to stored values, producing `(name, value)` pairs in
/// schema order. Fails with a configuration error if a stored value cannot
/// be cleaned.
pub fn apply_schema(
    schema: &[OptionDef],
    mut stored: std::collections::HashMap<String, Value>,
) -> Result<Vec<(String, Value)>, CoreError> {
    let mut resolved = Vec::with_capacity(schema.len());
    for def in schema {
        let value = match stored.remove(def.name) {
            Some(raw) => match def.cleaner {
                Some(clean) => clean(def.name, raw)?,
                None => raw,
            },
            None => def.default.clone(),
        };
        resolved.push((def.name.to_string(), value));
    }
    Ok(resolved)
}

// ---------------------------------------------------------------------------
// Cleaners
// ---------------------------------------------------------------------------

/// Normalize an excluded-pools structure into a sorted array of pool ids.
///
/// Accepts either an object mapping pool id to a boolean flag (only ids
/// flagged `true` are kept) or an array of pool id strings.
pub fn clean_excluded_pools(name: &str, value: Value) -> Result<Value, CoreError> {
    let mut ids: Vec<String> = match value {
        Value::Object(map) => map
            .into_iter()
            .filter(|(_, flag)| flag.as_bool().unwrap_or(false))
            .map(|(id, _)| id)
            .collect(),
        Value::Array(items) => {
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(id) => ids.push(id),
                    other => {
                        return Err(CoreError::Configuration {
                            option: name.to_string(),
                            message: format!("expected pool id string, got {other}"),
                        })
                    }
                }
            }
            ids
        }
        other => {
            return Err(CoreError::Configuration {
                option: name.to_string(),
                message: format!("expected object or array, got {other}"),
            })
        }
    };
    ids.sort();
    ids.dedup();
    Ok(Value::Array(ids.into_iter().map(Value::String).collect()))
}

/// Require a positive integer.
pub fn clean_positive_int(name: &str, value: Value) -> Result<Value, CoreError> {
    match value.as_i64() {
        Some(n) if n > 0 => Ok(Value::from(n)),
        _ => Err(CoreError::Configuration {
            option: name.to_string(),
            message: format!("expected a positive integer, got {value}"),
        }),
    }
}

/// Require a non-negative number (integer or float).
pub fn clean_non_negative_number(name: &str, value: Value) -> Result<Value, CoreError> {
    match value.as_f64() {
        Some(n) if n >= 0.0 => Ok(value),
        _ => Err(CoreError::Configuration {
            option: name.to_string(),
            message: format!("expected a non-negative number, got {value}"),
        }),
    }
}
