//! Period bucket keys
//!
//! A `PeriodWindow` is derived once per analytics run from the reference
//! "now". For each normalized transaction instant it reports which of the
//! daily/weekly/monthly/yearly buckets the transaction belongs to and under
//! which sub-key it is grouped there.

use crate::types::Period;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};

/// Grouping key inside one period bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    /// Chronologically sortable key (`HH:00`, `YYYY-MM-DD` or `YYYY-MM`)
    pub sort_key: String,
    /// Display label for the chart point
    pub label: String,
}

/// Reference dates for one analytics run
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodWindow {
    today: NaiveDate,
    week_start: NaiveDate,
    week_end: NaiveDate,
    current_month: (i32, u32),
    current_year: i32,
}

impl PeriodWindow {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        let today = now.date_naive();
        let week_start =
            today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let week_end = week_start + Duration::days(6);

        Self {
            today,
            week_start,
            week_end,
            current_month: (today.year(), today.month()),
            current_year: today.year(),
        }
    }

    /// Sub-key for `dt` in `period`, or `None` when `dt` falls outside it
    pub fn key_for(&self, period: Period, dt: &DateTime<FixedOffset>) -> Option<BucketKey> {
        let date = dt.date_naive();
        match period {
            Period::Daily => (date == self.today).then(|| {
                let hour = dt.format("%H:00").to_string();
                BucketKey {
                    label: hour.clone(),
                    sort_key: hour,
                }
            }),
            Period::Weekly => (self.week_start <= date && date <= self.week_end).then(|| {
                BucketKey {
                    sort_key: date.format("%Y-%m-%d").to_string(),
                    label: date.format("%a %d").to_string(),
                }
            }),
            Period::Monthly => {
                ((date.year(), date.month()) == self.current_month).then(|| BucketKey {
                    sort_key: date.format("%Y-%m-%d").to_string(),
                    label: date.format("%d %b").to_string(),
                })
            }
            Period::Yearly => (date.year() == self.current_year).then(|| BucketKey {
                sort_key: date.format("%Y-%m").to_string(),
                label: date.format("%b").to_string(),
            }),
        }
    }

    /// Every bucket `dt` belongs to, with its sub-key. Membership is decided
    /// independently per period.
    pub fn memberships(&self, dt: &DateTime<FixedOffset>) -> Vec<(Period, BucketKey)> {
        Period::ALL
            .iter()
            .filter_map(|&period| self.key_for(period, dt).map(|key| (period, key)))
            .collect()
    }

    /// Span label for a non-empty history
    pub fn label(&self, period: Period) -> String {
        match period {
            Period::Daily => long_date(self.today),
            Period::Weekly => format!(
                "{} - {}",
                self.week_start.format("%B %d"),
                self.week_end.format("%B %d, %Y")
            ),
            Period::Monthly => self.today.format("%B %Y").to_string(),
            Period::Yearly => self.today.format("%Y").to_string(),
        }
    }

    /// Span label for an empty history
    pub fn empty_label(&self, period: Period) -> String {
        match period.empty_label() {
            Some(label) => label.to_string(),
            None => long_date(self.today),
        }
    }
}

/// `June 10, 2024`
fn long_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}
