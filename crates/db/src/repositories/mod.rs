//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Multi-id queries never request
//! more than the caller's chunk size per round trip, and concatenated
//! chunk results are required to equal a single-query result.

pub mod bucket_usage_repo;
pub mod cloud_account_repo;
pub mod expense_repo;
pub mod optimization_repo;
pub mod option_repo;
pub mod resource_repo;

pub use bucket_usage_repo::BucketUsageRepo;
pub use cloud_account_repo::CloudAccountRepo;
pub use expense_repo::ExpenseRepo;
pub use optimization_repo::OptimizationRepo;
pub use option_repo::OptionRepo;
pub use resource_repo::ResourceRepo;

/// Default chunk size for bulk id queries. Modules may pass their own
/// constant in the 500-2000 range.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
