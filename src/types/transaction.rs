//! Purchase records: as stored, as fed to the analytics core, and meter metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A timestamp exactly as the upstream API (or the store) handed it over.
///
/// No unit tag travels with numeric values; seconds vs. milliseconds is
/// inferred by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Integer(i64),
    /// Non-integer JSON numbers. Kept so one odd row cannot fail a whole
    /// document; always normalizes to an invalid timestamp.
    Float(f64),
    Text(String),
}

impl From<i64> for RawTimestamp {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for RawTimestamp {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A loosely typed numeric field: upstream sends `trnUnits` as a string and
/// `trnAmount` as a number, but neither is guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(f64),
    Text(String),
}

impl Quantity {
    /// Numeric value, or 0.0 when the field cannot be read as a finite number
    pub fn value(&self) -> f64 {
        let v = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        };
        if v.is_finite() {
            v
        } else {
            0.0
        }
    }
}

/// One prepaid token purchase as persisted in the bill store.
///
/// Field names follow the upstream API payload so stored lines and the
/// `bills` output stay wire-compatible with existing consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBill {
    pub meter_number: String,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
    #[serde(rename = "tokenNo", default)]
    pub token_no: Option<String>,
    #[serde(default)]
    pub amount: Option<Quantity>,
    #[serde(default)]
    pub units: Option<Quantity>,
    pub created_at: DateTime<Utc>,
}

impl TokenBill {
    /// Uniqueness key within the store: one record per meter and raw
    /// timestamp. An absent timestamp is a value of its own.
    pub fn dedup_key(&self) -> String {
        let ts = match &self.timestamp {
            None => "null".to_string(),
            Some(RawTimestamp::Integer(v)) => format!("i{}", v),
            Some(RawTimestamp::Float(v)) => format!("f{}", v),
            Some(RawTimestamp::Text(s)) => format!("s{}", s),
        };
        format!("{}:{}", self.meter_number, ts)
    }
}

/// Input record of the analytics core with defaults already applied
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub amount: f64,
    pub units: f64,
    pub timestamp: Option<RawTimestamp>,
}

impl Transaction {
    pub fn new(amount: f64, units: f64, timestamp: Option<RawTimestamp>) -> Self {
        Self {
            amount,
            units,
            timestamp,
        }
    }
}

impl From<&TokenBill> for Transaction {
    fn from(bill: &TokenBill) -> Self {
        Self {
            amount: bill.amount.as_ref().map_or(0.0, Quantity::value),
            units: bill.units.as_ref().map_or(0.0, Quantity::value),
            timestamp: bill.timestamp.clone(),
        }
    }
}

/// Account metadata returned by the `about` lookup
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeterInfo {
    #[serde(rename = "contractStatus")]
    pub contract_status: String,
    pub address: String,
    #[serde(rename = "offeredService")]
    pub offered_service: String,
    #[serde(rename = "connectionType")]
    pub connection_type: Option<String>,
}

/// A `MeterInfo` snapshot as appended to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterRecord {
    pub meter_number: String,
    pub info: MeterInfo,
    pub fetched_at: DateTime<Utc>,
}

/// One page of a meter's bills, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillPage {
    pub bills: Vec<TokenBill>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_bill(amount: Option<Quantity>, units: Option<Quantity>) -> TokenBill {
        TokenBill {
            meter_number: "37185684521".into(),
            timestamp: Some(RawTimestamp::Integer(1_717_977_600)),
            token_no: Some("1234-5678-9012-3456-7890".into()),
            amount,
            units,
            created_at: Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_quantity_number() {
        assert_eq!(Quantity::Number(12.5).value(), 12.5);
    }

    #[test]
    fn test_quantity_numeric_string() {
        assert_eq!(Quantity::Text("34.21".into()).value(), 34.21);
        assert_eq!(Quantity::Text(" 7 ".into()).value(), 7.0);
    }

    #[test]
    fn test_quantity_garbage_is_zero() {
        assert_eq!(Quantity::Text("n/a".into()).value(), 0.0);
        assert_eq!(Quantity::Text("".into()).value(), 0.0);
        assert_eq!(Quantity::Text("NaN".into()).value(), 0.0);
    }

    #[test]
    fn test_transaction_from_bill_defaults() {
        let tx = Transaction::from(&make_bill(None, None));
        assert_eq!(tx.amount, 0.0);
        assert_eq!(tx.units, 0.0);
        assert_eq!(tx.timestamp, Some(RawTimestamp::Integer(1_717_977_600)));
    }

    #[test]
    fn test_transaction_from_bill_parses_units_string() {
        let tx = Transaction::from(&make_bill(
            Some(Quantity::Number(500.0)),
            Some(Quantity::Text("19.8".into())),
        ));
        assert_eq!(tx.amount, 500.0);
        assert_eq!(tx.units, 19.8);
    }

    #[test]
    fn test_raw_timestamp_untagged_deserialize() {
        let int: RawTimestamp = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(int, RawTimestamp::Integer(1_700_000_000_000));

        let text: RawTimestamp = serde_json::from_str("\"2024-06-10T08:00:00Z\"").unwrap();
        assert_eq!(text, RawTimestamp::Text("2024-06-10T08:00:00Z".into()));

        let float: RawTimestamp = serde_json::from_str("1.5").unwrap();
        assert_eq!(float, RawTimestamp::Float(1.5));
    }

    #[test]
    fn test_token_bill_uses_wire_field_names() {
        let bill = make_bill(Some(Quantity::Number(200.0)), Some(Quantity::Text("8.1".into())));
        let json = serde_json::to_value(&bill).unwrap();

        assert_eq!(json["meter_number"], "37185684521");
        assert_eq!(json["tokenNo"], "1234-5678-9012-3456-7890");
        assert_eq!(json["amount"], 200.0);
        assert_eq!(json["units"], "8.1");
        assert_eq!(json["timestamp"], 1_717_977_600);
    }

    #[test]
    fn test_token_bill_missing_optional_fields() {
        let bill: TokenBill = serde_json::from_str(
            r#"{"meter_number":"1","created_at":"2024-06-10T08:00:00Z"}"#,
        )
        .unwrap();
        assert!(bill.timestamp.is_none());
        assert!(bill.token_no.is_none());
        assert!(bill.amount.is_none());
    }

    #[test]
    fn test_dedup_key_distinguishes_encodings() {
        let mut int_bill = make_bill(None, None);
        int_bill.timestamp = Some(RawTimestamp::Integer(1700));
        let mut text_bill = int_bill.clone();
        text_bill.timestamp = Some(RawTimestamp::Text("1700".into()));

        assert_eq!(int_bill.dedup_key(), "37185684521:i1700");
        assert_ne!(int_bill.dedup_key(), text_bill.dedup_key());
    }

    #[test]
    fn test_dedup_key_ignores_other_fields() {
        let a = make_bill(Some(Quantity::Number(100.0)), None);
        let mut b = make_bill(Some(Quantity::Number(999.0)), None);
        b.token_no = None;
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_dedup_key_missing_timestamp() {
        let mut bill = make_bill(None, None);
        bill.timestamp = None;
        assert_eq!(bill.dedup_key(), "37185684521:null");
    }

    #[test]
    fn test_meter_info_wire_names() {
        let info = MeterInfo {
            contract_status: "Active".into(),
            address: "KAREN".into(),
            offered_service: "Domestic".into(),
            connection_type: None,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["contractStatus"], "Active");
        assert_eq!(json["offeredService"], "Domestic");
        assert!(json["connectionType"].is_null());
    }
}
