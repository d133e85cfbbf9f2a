/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Days in the month used for all saving extrapolations.
pub const DAYS_IN_MONTH: f64 = 30.0;

/// Hours in a day.
pub const HOURS_IN_DAY: f64 = 24.0;

/// Days in a week, used when scaling weekly activity to a monthly figure.
pub const DAYS_IN_WEEK: f64 = 7.0;
