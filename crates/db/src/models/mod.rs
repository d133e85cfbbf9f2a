//! Domain model structs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct
//! matching the database row, plus any insert payloads the engine
//! produces. Enum-typed TEXT columns decode through
//! `#[sqlx(try_from = "String")]` into the core crate's enums.

pub mod bucket_usage;
pub mod cloud_account;
pub mod expense;
pub mod optimization;
pub mod option_set;
pub mod resource;
