//! `token-analyzer analytics`: spending rollups for one or more meters

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use clap::Args;
use rayon::prelude::*;
use serde_json::Value;

use token_analyzer::config::Settings;
use token_analyzer::services::{local_now, local_tz, Aggregator, BillStore};
use token_analyzer::types::{AnalyticsReport, Result};

#[derive(Args, Debug)]
pub struct AnalyticsArgs {
    /// Prepaid meter number(s)
    #[arg(value_name = "METER", num_args = 1.., required = true)]
    pub meters: Vec<String>,

    /// Reference time instead of the clock (RFC 3339)
    #[arg(long, value_parser = parse_now)]
    pub now: Option<DateTime<FixedOffset>>,
}

fn parse_now(s: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&local_tz()))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

impl AnalyticsArgs {
    pub fn run(self, settings: &Settings) -> anyhow::Result<Value> {
        let store = BillStore::new(settings.data_dir.clone())?;
        let now = self.now.unwrap_or_else(local_now);
        let mut reports = reports(&store, &self.meters, now)?;

        let out = if reports.len() == 1 {
            let (_, report) = reports.remove(0);
            serde_json::to_value(report)?
        } else {
            serde_json::to_value(reports.into_iter().collect::<BTreeMap<_, _>>())?
        };
        Ok(out)
    }
}

/// One report per meter, computed in parallel
fn reports(
    store: &BillStore,
    meters: &[String],
    now: DateTime<FixedOffset>,
) -> Result<Vec<(String, AnalyticsReport)>> {
    meters
        .par_iter()
        .map(|meter| {
            let transactions = store.transactions(meter)?;
            tracing::debug!(meter = %meter, count = transactions.len(), "aggregating");
            Ok((meter.clone(), Aggregator::analytics(&transactions, now)))
        })
        .collect()
}
