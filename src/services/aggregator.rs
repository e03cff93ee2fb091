//! Aggregator service for computing purchase analytics

use crate::services::buckets::{BucketKey, PeriodWindow};
use crate::services::formatter::ReportFormatter;
use crate::services::normalizer::{local_now, normalize_timestamp};
use crate::types::{AnalyticsReport, Period, Transaction};
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;

/// Running sums for one chart point
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointAccumulator {
    pub label: String,
    pub amount: f64,
    pub units: f64,
}

/// Running sums for one period bucket, keyed by sort key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketAccumulator {
    pub points: HashMap<String, PointAccumulator>,
    pub amount: f64,
    pub units: f64,
    pub count: u64,
}

impl BucketAccumulator {
    pub fn add(&mut self, key: BucketKey, tx: &Transaction) {
        let point = self
            .points
            .entry(key.sort_key)
            .or_insert_with(|| PointAccumulator {
                label: key.label,
                ..Default::default()
            });
        point.amount += tx.amount;
        point.units += tx.units;

        self.amount += tx.amount;
        self.units += tx.units;
        self.count = self.count.saturating_add(1);
    }
}

/// Everything the formatter needs from one pass over the history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rollup {
    pub total_amount: f64,
    pub total_units: f64,
    pub total_transactions: u64,
    /// Transactions left out of every bucket for lack of a usable timestamp
    pub skipped: u64,
    pub(crate) buckets: [BucketAccumulator; 4],
}

impl Rollup {
    pub fn bucket(&self, period: Period) -> &BucketAccumulator {
        &self.buckets[period.index()]
    }

    pub fn into_buckets(self) -> [BucketAccumulator; 4] {
        self.buckets
    }
}

/// Aggregator for computing period analytics
pub struct Aggregator;

impl Aggregator {
    /// Fold the history into period accumulators.
    ///
    /// Grand totals cover every transaction. Period sums only cover
    /// transactions whose timestamp normalizes; the rest are counted in
    /// `skipped` and otherwise ignored.
    pub fn rollup(transactions: &[Transaction], window: &PeriodWindow) -> Rollup {
        let mut rollup = Rollup::default();

        for tx in transactions {
            rollup.total_amount += tx.amount;
            rollup.total_units += tx.units;
            rollup.total_transactions = rollup.total_transactions.saturating_add(1);

            let dt = match normalize_timestamp(tx.timestamp.as_ref()) {
                Ok(dt) => dt,
                Err(e) => {
                    tracing::trace!(error = %e, "transaction left out of period buckets");
                    rollup.skipped = rollup.skipped.saturating_add(1);
                    continue;
                }
            };

            for (period, key) in window.memberships(&dt) {
                rollup.buckets[period.index()].add(key, tx);
            }
        }

        if rollup.skipped > 0 {
            tracing::debug!(
                skipped = rollup.skipped,
                total = rollup.total_transactions,
                "transactions without a usable timestamp"
            );
        }

        rollup
    }

    /// Analytics payload for one meter's full history at reference time `now`
    pub fn analytics(transactions: &[Transaction], now: DateTime<FixedOffset>) -> AnalyticsReport {
        let window = PeriodWindow::new(now);
        if transactions.is_empty() {
            return ReportFormatter::empty(&window);
        }

        let rollup = Self::rollup(transactions, &window);
        ReportFormatter::format(rollup, &window)
    }

    /// Analytics payload using the real current local time
    pub fn analytics_now(transactions: &[Transaction]) -> AnalyticsReport {
        Self::analytics(transactions, local_now())
    }
}
