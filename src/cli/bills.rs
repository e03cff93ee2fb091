//! `token-analyzer bills`: paged listing of stored purchases

use anyhow::bail;
use clap::Args;

use token_analyzer::config::Settings;
use token_analyzer::services::BillStore;
use token_analyzer::types::BillPage;

#[derive(Args, Debug)]
pub struct BillsArgs {
    /// Prepaid meter number
    #[arg(value_name = "METER")]
    pub meter: String,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Bills per page
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

impl BillsArgs {
    pub fn run(self, settings: &Settings) -> anyhow::Result<BillPage> {
        let store = BillStore::new(settings.data_dir.clone())?;
        let page = store.page_bills(&self.meter, self.page, self.limit)?;
        if page.total == 0 {
            bail!("No billing data found");
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;
    use token_analyzer::config::UpstreamSettings;
    use token_analyzer::types::{Quantity, RawTimestamp, TokenBill};

    fn settings(tmp: &TempDir) -> Settings {
        Settings {
            data_dir: tmp.path().to_path_buf(),
            upstream: UpstreamSettings {
                base_url: "http://127.0.0.1:9".into(),
                client_credentials: None,
                timeout_secs: 1,
            },
        }
    }

    fn args(page: usize, limit: usize) -> BillsArgs {
        BillsArgs {
            meter: "123".into(),
            page,
            limit,
        }
    }

    #[test]
    fn test_no_bills_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = args(1, 10).run(&settings(&tmp)).unwrap_err();
        assert_eq!(err.to_string(), "No billing data found");
    }

    #[test]
    fn test_pages_stored_bills() {
        let tmp = TempDir::new().unwrap();
        let store = BillStore::new(tmp.path().to_path_buf()).unwrap();
        let bills: Vec<TokenBill> = (0..12)
            .map(|i| TokenBill {
                meter_number: "123".into(),
                timestamp: Some(RawTimestamp::Integer(1_717_977_600 + i * 60)),
                token_no: None,
                amount: Some(Quantity::Number(100.0)),
                units: None,
                created_at: Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap(),
            })
            .collect();
        store.append_bills(&bills).unwrap();

        let page = args(2, 10).run(&settings(&tmp)).unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.bills.len(), 2);
    }
}
