//! Turns rollup accumulators into the analytics payload

use crate::services::aggregator::{BucketAccumulator, Rollup};
use crate::services::buckets::PeriodWindow;
use crate::types::{AnalyticsReport, ChartDataPoint, Period, PeriodAnalytics};

pub struct ReportFormatter;

impl ReportFormatter {
    /// Sorted, labelled payload for a non-empty history
    pub fn format(rollup: Rollup, window: &PeriodWindow) -> AnalyticsReport {
        let total_amount = rollup.total_amount;
        let total_units = rollup.total_units;
        let total_transactions = rollup.total_transactions;

        let [daily, weekly, monthly, yearly] = rollup.into_buckets();

        AnalyticsReport {
            total_amount,
            total_units,
            total_transactions,
            daily: Self::period(daily, window.label(Period::Daily)),
            weekly: Self::period(weekly, window.label(Period::Weekly)),
            monthly: Self::period(monthly, window.label(Period::Monthly)),
            yearly: Self::period(yearly, window.label(Period::Yearly)),
        }
    }

    /// Fixed all-zero payload for an empty history
    pub fn empty(window: &PeriodWindow) -> AnalyticsReport {
        AnalyticsReport {
            total_amount: 0.0,
            total_units: 0.0,
            total_transactions: 0,
            daily: PeriodAnalytics::empty(window.empty_label(Period::Daily)),
            weekly: PeriodAnalytics::empty(window.empty_label(Period::Weekly)),
            monthly: PeriodAnalytics::empty(window.empty_label(Period::Monthly)),
            yearly: PeriodAnalytics::empty(window.empty_label(Period::Yearly)),
        }
    }

    fn period(bucket: BucketAccumulator, label: String) -> PeriodAnalytics {
        PeriodAnalytics {
            data: Self::sorted_points(&bucket),
            total_amount: bucket.amount,
            total_units: bucket.units,
            count: bucket.count,
            label,
        }
    }

    /// Chart points ascending by sort key, with the sort key dropped
    fn sorted_points(bucket: &BucketAccumulator) -> Vec<ChartDataPoint> {
        let mut keyed: Vec<(&String, ChartDataPoint)> = bucket
            .points
            .iter()
            .map(|(key, point)| {
                (
                    key,
                    ChartDataPoint {
                        date: point.label.clone(),
                        amount: point.amount,
                        units: point.units,
                    },
                )
            })
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(b.0));
        keyed.into_iter().map(|(_, point)| point).collect()
    }
}
