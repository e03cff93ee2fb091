//! File-backed bill store
//!
//! Keeps every fetched purchase record so analytics survive upstream data
//! rotation. One JSON-lines file per meter under `<data_dir>/bills/`, plus
//! `<data_dir>/meters.jsonl` for account metadata snapshots. Writers take an
//! exclusive advisory lock, readers a shared one.

use crate::services::normalizer::normalize_timestamp;
use crate::types::{
    AnalyzerError, BillPage, MeterRecord, Result, StoreWarning, TokenBill, Transaction,
};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub struct BillStore {
    data_dir: PathBuf,
}

impl BillStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(data_dir.join("bills"))?;
        Ok(Self { data_dir })
    }

    pub fn bills_path(&self, meter: &str) -> PathBuf {
        self.data_dir.join("bills").join(format!("{}.jsonl", meter))
    }

    pub fn meters_path(&self) -> PathBuf {
        self.data_dir.join("meters.jsonl")
    }

    /// Append bills, skipping any whose `(meter_number, timestamp)` is already
    /// stored or repeated earlier in the batch. Returns how many were written.
    pub fn append_bills(&self, bills: &[TokenBill]) -> Result<usize> {
        let mut by_meter: BTreeMap<&str, Vec<&TokenBill>> = BTreeMap::new();
        for bill in bills {
            by_meter
                .entry(bill.meter_number.as_str())
                .or_default()
                .push(bill);
        }

        let mut inserted = 0;
        for (meter, batch) in by_meter {
            validate_meter(meter)?;
            inserted += self.append_meter_bills(meter, &batch)?;
        }
        Ok(inserted)
    }

    fn append_meter_bills(&self, meter: &str, batch: &[&TokenBill]) -> Result<usize> {
        let path = self.bills_path(meter);
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        FileExt::lock_exclusive(&file)
            .map_err(|e| AnalyzerError::Store(format!("Failed to acquire write lock: {}", e)))?;

        let result = (|| -> Result<usize> {
            let (existing, _) = read_records::<TokenBill>(&file);
            let mut seen: HashSet<String> = existing.iter().map(TokenBill::dedup_key).collect();

            let mut out = String::new();
            let mut inserted = 0;
            for bill in batch {
                if !seen.insert(bill.dedup_key()) {
                    continue;
                }
                out.push_str(&to_line(bill)?);
                inserted += 1;
            }

            if inserted > 0 {
                (&file).write_all(out.as_bytes())?;
                file.sync_all()?;
            }
            Ok(inserted)
        })();

        let _ = FileExt::unlock(&file);
        result
    }

    /// Append a meter metadata snapshot
    pub fn append_meter(&self, record: &MeterRecord) -> Result<()> {
        validate_meter(&record.meter_number)?;
        fs::create_dir_all(&self.data_dir)?;

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.meters_path())?;

        FileExt::lock_exclusive(&file)
            .map_err(|e| AnalyzerError::Store(format!("Failed to acquire write lock: {}", e)))?;

        let result = to_line(record).and_then(|line| {
            (&file).write_all(line.as_bytes())?;
            Ok(())
        });

        let _ = FileExt::unlock(&file);
        result
    }

    /// Most recent metadata snapshot for a meter
    pub fn latest_meter(&self, meter: &str) -> Result<Option<MeterRecord>> {
        validate_meter(meter)?;
        let (records, _) = self.read_locked::<MeterRecord>(&self.meters_path())?;
        Ok(records.into_iter().rev().find(|r| r.meter_number == meter))
    }

    /// All stored bills for a meter, newest first. Corrupt lines are skipped
    /// and logged.
    pub fn load_bills(&self, meter: &str) -> Result<Vec<TokenBill>> {
        let (bills, warnings) = self.load_bills_with_warnings(meter)?;
        for warning in warnings {
            let StoreWarning::Corrupted { line, reason } = warning;
            tracing::warn!(meter, line, %reason, "skipping corrupt bill record");
        }
        Ok(bills)
    }

    /// All stored bills for a meter, newest first, plus what was skipped.
    ///
    /// Ordering is by normalized instant; records whose timestamp does not
    /// normalize keep file order after all the others.
    pub fn load_bills_with_warnings(
        &self,
        meter: &str,
    ) -> Result<(Vec<TokenBill>, Vec<StoreWarning>)> {
        validate_meter(meter)?;
        let (mut bills, warnings) = self.read_locked::<TokenBill>(&self.bills_path(meter))?;
        bills.sort_by_cached_key(|b| {
            Reverse(
                normalize_timestamp(b.timestamp.as_ref())
                    .ok()
                    .map(|dt| dt.timestamp_millis()),
            )
        });
        Ok((bills, warnings))
    }

    /// One page of `load_bills`. `page` is 1-based; `page` and `limit` are
    /// clamped to at least 1.
    pub fn page_bills(&self, meter: &str, page: usize, limit: usize) -> Result<BillPage> {
        let page = page.max(1);
        let limit = limit.max(1);
        let bills = self.load_bills(meter)?;
        let total = bills.len();

        let bills = bills
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Ok(BillPage {
            bills,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        })
    }

    /// Stored bills converted into analytics input
    pub fn transactions(&self, meter: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .load_bills(meter)?
            .iter()
            .map(Transaction::from)
            .collect())
    }

    /// Read every record of a JSON-lines file under a shared lock.
    /// A missing file is an empty store.
    fn read_locked<T: DeserializeOwned>(&self, path: &Path) -> Result<(Vec<T>, Vec<StoreWarning>)> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((Vec::new(), Vec::new()))
            }
            Err(e) => return Err(e.into()),
        };

        FileExt::lock_shared(&file)
            .map_err(|e| AnalyzerError::Store(format!("Failed to acquire read lock: {}", e)))?;
        let records = read_records(&file);
        let _ = FileExt::unlock(&file);

        Ok(records)
    }
}

/// Reject anything that is not a plain alphanumeric meter number. Meter
/// numbers become file names.
pub fn validate_meter(meter: &str) -> Result<()> {
    if !meter.is_empty() && meter.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(AnalyzerError::InvalidMeter(meter.to_string()))
    }
}

/// Decode JSON lines from the start of `file` (zero-copy SIMD parse per line)
fn read_records<T: DeserializeOwned>(file: &File) -> (Vec<T>, Vec<StoreWarning>) {
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for (idx, line_result) in reader.lines().enumerate() {
        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                warnings.push(StoreWarning::Corrupted {
                    line: idx + 1,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let mut bytes = line.into_bytes();
        match simd_json::serde::from_slice::<T>(&mut bytes) {
            Ok(record) => records.push(record),
            Err(e) => warnings.push(StoreWarning::Corrupted {
                line: idx + 1,
                reason: e.to_string(),
            }),
        }
    }

    (records, warnings)
}

fn to_line<T: Serialize>(record: &T) -> Result<String> {
    let mut line = serde_json::to_string(record)
        .map_err(|e| AnalyzerError::Store(format!("Serialization failed: {}", e)))?;
    line.push('\n');
    Ok(line)
}
