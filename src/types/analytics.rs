//! Analytics payload types

use serde::{Deserialize, Serialize};

/// Period a transaction can be bucketed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    pub const ALL: [Period; 4] = [Self::Daily, Self::Weekly, Self::Monthly, Self::Yearly];

    pub fn index(self) -> usize {
        match self {
            Self::Daily => 0,
            Self::Weekly => 1,
            Self::Monthly => 2,
            Self::Yearly => 3,
        }
    }

    /// Label used for the whole period when the history is empty
    pub fn empty_label(self) -> Option<&'static str> {
        match self {
            Self::Daily => None,
            Self::Weekly => Some("This Week"),
            Self::Monthly => Some("This Month"),
            Self::Yearly => Some("This Year"),
        }
    }
}

/// One chart point inside a period (an hour, a day or a month)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataPoint {
    pub date: String,
    pub amount: f64,
    pub units: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodAnalytics {
    pub data: Vec<ChartDataPoint>,
    pub total_amount: f64,
    pub total_units: f64,
    pub count: u64,
    pub label: String,
}

impl PeriodAnalytics {
    pub fn empty(label: impl Into<String>) -> Self {
        Self {
            data: Vec::new(),
            total_amount: 0.0,
            total_units: 0.0,
            count: 0,
            label: label.into(),
        }
    }
}

/// Full analytics body for one meter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub total_amount: f64,
    pub total_units: f64,
    pub total_transactions: u64,
    pub daily: PeriodAnalytics,
    pub weekly: PeriodAnalytics,
    pub monthly: PeriodAnalytics,
    pub yearly: PeriodAnalytics,
}

impl AnalyticsReport {
    pub fn period(&self, period: Period) -> &PeriodAnalytics {
        match period {
            Period::Daily => &self.daily,
            Period::Weekly => &self.weekly,
            Period::Monthly => &self.monthly,
            Period::Yearly => &self.yearly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_indices_are_distinct() {
        let indices: Vec<usize> = Period::ALL.iter().map(|p| p.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_labels() {
        assert_eq!(Period::Daily.empty_label(), None);
        assert_eq!(Period::Weekly.empty_label(), Some("This Week"));
        assert_eq!(Period::Monthly.empty_label(), Some("This Month"));
        assert_eq!(Period::Yearly.empty_label(), Some("This Year"));
    }

    #[test]
    fn test_report_serializes_payload_shape() {
        let report = AnalyticsReport {
            total_amount: 0.0,
            total_units: 0.0,
            total_transactions: 0,
            daily: PeriodAnalytics::empty("June 10, 2024"),
            weekly: PeriodAnalytics::empty("This Week"),
            monthly: PeriodAnalytics::empty("This Month"),
            yearly: PeriodAnalytics::empty("This Year"),
        };
        let json = serde_json::to_value(&report).unwrap();

        for key in ["total_amount", "total_units", "total_transactions"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        for period in ["daily", "weekly", "monthly", "yearly"] {
            let block = &json[period];
            assert!(block["data"].as_array().unwrap().is_empty());
            assert_eq!(block["count"], 0);
            assert!(block.get("total_amount").is_some());
            assert!(block.get("total_units").is_some());
            assert!(block.get("label").is_some());
        }
    }
}
