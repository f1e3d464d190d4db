//! Calendar period resets for daily and monthly spend counters
//!
//! Periods follow UTC calendar boundaries. A counter is due for reset when its
//! last reset stamp is missing or falls in a different UTC day (or month) than
//! `now`. A due reset is always applied, even to a counter that is already
//! zero, so the stamp tracks the current period and spend recorded later in
//! the same period is never wiped by a stale comparison.

use chrono::{DateTime, Datelike, NaiveTime, Utc};

use super::BudgetLimit;

/// Whether the daily counter must be reset before checking
pub fn is_day_reset_due(now: DateTime<Utc>, last_reset: Option<DateTime<Utc>>) -> bool {
    match last_reset {
        None => true,
        Some(last) => last.date_naive() != now.date_naive(),
    }
}

/// Whether the monthly counter must be reset before checking
pub fn is_month_reset_due(now: DateTime<Utc>, last_reset: Option<DateTime<Utc>>) -> bool {
    match last_reset {
        None => true,
        Some(last) => last.year() != now.year() || last.month() != now.month(),
    }
}

/// Midnight UTC of `now`'s day
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Midnight UTC of the first day of `now`'s month
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    date.with_day(1)
        .unwrap_or(date)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Which counters of a limit row need resetting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetPlan {
    pub day: bool,
    pub month: bool,
}

impl ResetPlan {
    /// Decide the resets due for `limit` at `now`
    pub fn evaluate(limit: &BudgetLimit, now: DateTime<Utc>) -> Self {
        Self {
            day: is_day_reset_due(now, limit.day_reset),
            month: is_month_reset_due(now, limit.month_reset),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.day && !self.month
    }

    /// Resets due in both plans
    pub fn intersect(self, other: ResetPlan) -> Self {
        Self {
            day: self.day && other.day,
            month: self.month && other.month,
        }
    }

    /// Zero the due counters and stamp them with `now`
    pub fn apply_to(&self, limit: &mut BudgetLimit, now: DateTime<Utc>) {
        if self.day {
            limit.current_day_spend = 0.0;
            limit.day_reset = Some(now);
        }

        if self.month {
            limit.current_month_spend = 0.0;
            limit.month_reset = Some(now);
        }

        if !self.is_empty() {
            limit.updated_at = now;
        }
    }
}
