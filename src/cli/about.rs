//! `token-analyzer about`: meter lookup that also refreshes stored purchases

use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use serde_json::{json, Value};

use token_analyzer::config::Settings;
use token_analyzer::services::{validate_meter, BillStore, KplcClient};
use token_analyzer::types::{AnalyzerError, MeterInfo, MeterRecord, Result, TokenBill};

const LOOKUP_FAILED: &str = "Check your meter number and try again";

#[derive(Args, Debug)]
pub struct AboutArgs {
    /// Prepaid meter number
    #[arg(value_name = "METER")]
    pub meter: String,

    /// Answer from the last stored snapshot without contacting KPLC
    #[arg(long)]
    pub offline: bool,
}

impl AboutArgs {
    /// Meter info as JSON, or the lookup-failed object. Never fails.
    pub async fn run(self, settings: Result<Settings>) -> Value {
        let result = match settings {
            Ok(settings) if self.offline => stored(&self.meter, &settings),
            Ok(settings) => lookup(&self.meter, &settings).await,
            Err(e) => Err(e),
        };

        let value = result.and_then(|info| {
            serde_json::to_value(info).map_err(|e| AnalyzerError::Parse(e.to_string()))
        });

        match value {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(meter = %self.meter, error = %e, "meter lookup failed");
                json!({ "error": LOOKUP_FAILED })
            }
        }
    }
}

async fn lookup(meter: &str, settings: &Settings) -> Result<MeterInfo> {
    validate_meter(meter)?;
    let client = KplcClient::new(&settings.upstream)?;

    let token = client.access_token().await?;
    let info = client.fetch_meter_info(&token, meter).await?;

    let fetched_at = Utc::now();
    let bills = client.fetch_bills(&token, meter, fetched_at).await?;
    let fetched = bills.len();
    let record = MeterRecord {
        meter_number: meter.to_string(),
        info: info.clone(),
        fetched_at,
    };
    let inserted = persist(settings.data_dir.clone(), bills, record).await?;
    tracing::info!(meter, fetched, inserted, "refreshed purchases");

    Ok(info)
}

/// Store fetched bills and the meter snapshot off the async workers; the
/// store blocks on file locks.
async fn persist(data_dir: PathBuf, bills: Vec<TokenBill>, record: MeterRecord) -> Result<usize> {
    tokio::task::spawn_blocking(move || -> Result<usize> {
        let store = BillStore::new(data_dir)?;
        let inserted = store.append_bills(&bills)?;
        store.append_meter(&record)?;
        Ok(inserted)
    })
    .await
    .map_err(|e| AnalyzerError::Store(format!("store task failed: {}", e)))?
}

/// Last stored snapshot for the meter
fn stored(meter: &str, settings: &Settings) -> Result<MeterInfo> {
    let store = BillStore::new(settings.data_dir.clone())?;
    store
        .latest_meter(meter)?
        .map(|record| record.info)
        .ok_or_else(|| AnalyzerError::Store(format!("no stored snapshot for meter {}", meter)))
}
