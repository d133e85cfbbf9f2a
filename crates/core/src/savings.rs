//! Saving extrapolation across irregular time windows.
//!
//! Detector modules observe cost over trailing windows of varying length
//! (a week of activity slots, a configurable number of days of expenses)
//! and must always report a 30-day monthly saving estimate.

use crate::types::{DAYS_IN_MONTH, DAYS_IN_WEEK, HOURS_IN_DAY};

/// Scale a saving observed over one week to a 30-day month.
pub fn weekly_to_monthly(weekly_saving: f64) -> f64 {
    weekly_saving / DAYS_IN_WEEK * DAYS_IN_MONTH
}

/// Scale an average daily cost to a 30-day month.
pub fn daily_to_monthly(daily_cost: f64) -> f64 {
    daily_cost * DAYS_IN_MONTH
}

/// Average daily expense over a trailing window.
///
/// Returns `0.0` for an empty window so callers can treat "no expense
/// history" and "no expense" identically.
pub fn average_daily_expense(total_expense: f64, window_days: u32) -> f64 {
    if window_days == 0 {
        return 0.0;
    }
    total_expense / f64::from(window_days)
}

/// Saving from keeping an instance off during its inactive weekly hours.
///
/// `daily_expense` is spread evenly across the day; the weekly figure is
/// then scaled to a 30-day month.
pub fn shutdown_saving(daily_expense: f64, inactive_hours_per_week: usize) -> f64 {
    let hourly = daily_expense / HOURS_IN_DAY;
    weekly_to_monthly(hourly * inactive_hours_per_week as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_seven_extrapolates_to_thirty() {
        assert!((weekly_to_monthly(7.0) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn daily_to_monthly_is_thirty_days() {
        assert!((daily_to_monthly(1.5) - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn average_daily_expense_zero_window() {
        assert_eq!(average_daily_expense(100.0, 0), 0.0);
    }

    #[test]
    fn average_daily_expense_divides_evenly() {
        assert!((average_daily_expense(70.0, 7) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn shutdown_saving_full_week_equals_monthly_expense() {
        // 24 inactive hours every day of the week: the whole daily expense
        // is reclaimable, so the monthly saving is daily * 30.
        let saving = shutdown_saving(12.0, 168);
        assert!((saving - daily_to_monthly(12.0)).abs() < 1e-9);
    }

    #[test]
    fn shutdown_saving_zero_hours_is_zero() {
        assert_eq!(shutdown_saving(12.0, 0), 0.0);
    }
}
