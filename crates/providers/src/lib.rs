//! Billing normalization adapters.
//!
//! Each cloud provider family exports billing facts with its own field
//! set. The adapters translate a raw [`ExpenseRow`] into a typed
//! [`BillingRecord`] variant exposing the two questions every detector
//! asks: is this row the instance/flavor charge, and how many compute
//! hours does it represent.
//!
//! An account whose cloud type has no billing adapter (kubernetes,
//! environment) and any row whose fields match no heuristic degrade to
//! "not a compute charge" / zero hours rather than erroring. Totals stay
//! correct because [`ComputeTotals`] accumulates unclassified cost
//! separately.

use costplane_core::cloud::CloudType;
use costplane_db::models::expense::ExpenseRow;

pub mod alibaba;
pub mod aws;
pub mod azure;
pub mod gcp;

pub use alibaba::AlibabaRecord;
pub use aws::AwsRecord;
pub use azure::AzureRecord;
pub use gcp::GcpRecord;

/// CPU count assumed when a record needs one and the inventory does not
/// know it.
pub const DEFAULT_CPU_COUNT: i32 = 1;

/// Provider-agnostic cost classification contract.
pub trait CostClassifier {
    /// Whether this row bills the instance/flavor charge itself (spot and
    /// preemptible line items are deliberately excluded).
    fn is_compute_charge(&self) -> bool;

    /// Billed compute hours this row represents. `cpu_hint` feeds
    /// providers that bill in core-hours.
    fn work_hours(&self, cpu_hint: Option<i32>) -> f64;
}

/// A billing fact normalized into its provider family.
#[derive(Debug, Clone)]
pub enum BillingRecord {
    Aws(AwsRecord),
    Azure(AzureRecord),
    Alibaba(AlibabaRecord),
    Gcp(GcpRecord),
    /// Provider family without a billing adapter. Never a compute charge.
    Unknown { cost: f64 },
}

impl BillingRecord {
    /// Look up the adapter for the owning account's provider family and
    /// parse the row's payload. Unrecognized combinations never fail.
    pub fn from_expense(cloud_type: CloudType, row: &ExpenseRow) -> Self {
        match cloud_type {
            CloudType::AwsCnr => BillingRecord::Aws(AwsRecord::parse(row)),
            CloudType::AzureCnr => BillingRecord::Azure(AzureRecord::parse(row)),
            CloudType::AlibabaCnr => BillingRecord::Alibaba(AlibabaRecord::parse(row)),
            CloudType::GcpCnr => BillingRecord::Gcp(GcpRecord::parse(row)),
            CloudType::KubernetesCnr | CloudType::Environment => {
                BillingRecord::Unknown { cost: row.cost }
            }
        }
    }

    pub fn cost(&self) -> f64 {
        match self {
            BillingRecord::Aws(r) => r.cost,
            BillingRecord::Azure(r) => r.cost,
            BillingRecord::Alibaba(r) => r.cost,
            BillingRecord::Gcp(r) => r.cost,
            BillingRecord::Unknown { cost } => *cost,
        }
    }
}

impl CostClassifier for BillingRecord {
    fn is_compute_charge(&self) -> bool {
        match self {
            BillingRecord::Aws(r) => r.is_compute_charge(),
            BillingRecord::Azure(r) => r.is_compute_charge(),
            BillingRecord::Alibaba(r) => r.is_compute_charge(),
            BillingRecord::Gcp(r) => r.is_compute_charge(),
            BillingRecord::Unknown { .. } => false,
        }
    }

    fn work_hours(&self, cpu_hint: Option<i32>) -> f64 {
        match self {
            BillingRecord::Aws(r) => r.work_hours(cpu_hint),
            BillingRecord::Azure(r) => r.work_hours(cpu_hint),
            BillingRecord::Alibaba(r) => r.work_hours(cpu_hint),
            BillingRecord::Gcp(r) => r.work_hours(cpu_hint),
            BillingRecord::Unknown { .. } => 0.0,
        }
    }
}

/// Accumulated compute classification over a resource's billing rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComputeTotals {
    /// Cost of rows classified as the instance/flavor charge.
    pub flavor_cost: f64,
    /// Cost of every other row, kept so the resource's total is preserved.
    pub other_cost: f64,
    /// Billed compute hours across the flavor-charge rows.
    pub work_hours: f64,
}

impl ComputeTotals {
    /// Fold a set of normalized records into totals.
    pub fn accumulate<'a, I>(records: I, cpu_hint: Option<i32>) -> Self
    where
        I: IntoIterator<Item = &'a BillingRecord>,
    {
        let mut totals = ComputeTotals::default();
        for record in records {
            if record.is_compute_charge() {
                totals.flavor_cost += record.cost();
                totals.work_hours += record.work_hours(cpu_hint);
            } else {
                totals.other_cost += record.cost();
            }
        }
        totals
    }

    pub fn total_cost(&self) -> f64 {
        self.flavor_cost + self.other_cost
    }
}
