//! KPLC self-service portal client
//!
//! Three calls: a client-credentials token exchange, the prepaid purchase
//! list for a meter, and the meter's supply metadata. Response mapping lives
//! in plain functions so it can be tested without a network.

use crate::config::UpstreamSettings;
use crate::types::{AnalyzerError, MeterInfo, Quantity, RawTimestamp, Result, TokenBill};
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0";

const TOKEN_PATH: &str = "/api/token";
const BILLS_PATH: &str = "/api/publicData/4/newContractList";
const METER_PATH: &str = "/api/sectorSupplies/4/";

/// Scopes requested by the portal's own web client
const SCOPE: &str = "token_public token_private \
    accounts_private accounts_public \
    attributes_public attributes_private \
    customers_public customers_private \
    documents_private documents_public \
    listData_public \
    rccs_private rccs_public \
    sectorSupplies_private sectorSupplies_public \
    selfReads_private selfReads_public \
    serviceRequests_private serviceRequests_public \
    services_private services_public \
    streets_public \
    supplies_private supplies_public \
    users_private users_public \
    workRequests_private workRequests_public \
    notification_private \
    outage_private \
    juaforsure_private juaforsure_public \
    prepayment_private \
    pdfbill_private \
    publicData_public \
    selfReadsPeriod_private \
    corporateAccount_private \
    calculator_public \
    sscalculator_public \
    register_public register_private \
    ssaccounts_public ssaccounts_private \
    addaccount_public addaccount_private \
    whtcertificate_private \
    selfService_public selfService_private \
    summaryLetters_private summaryLetter_public";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
struct ContractRecord {
    #[serde(rename = "colPrepayment", default)]
    col_prepayment: Option<Vec<PrepaymentRow>>,
}

#[derive(Debug, Deserialize)]
struct PrepaymentRow {
    #[serde(rename = "trnTimestamp", default)]
    trn_timestamp: Value,
    #[serde(rename = "tokenNo", default)]
    token_no: Value,
    /// Absent means zero; an explicit null stays unknown
    #[serde(rename = "trnAmount", default = "zero")]
    trn_amount: Value,
    #[serde(rename = "trnUnits", default)]
    trn_units: Value,
}

fn zero() -> Value {
    Value::from(0)
}

#[derive(Debug, Default, Deserialize)]
struct SupplyRecord {
    #[serde(rename = "contractStatus", default)]
    contract_status: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(rename = "descOfferedService", default)]
    desc_offered_service: Option<String>,
    #[serde(default)]
    attributes: Option<Vec<Attribute>>,
}

#[derive(Debug, Deserialize)]
struct Attribute {
    #[serde(rename = "descAttribute", default)]
    desc_attribute: Option<String>,
    #[serde(default)]
    value: Value,
}

pub struct KplcClient {
    http: reqwest::Client,
    base_url: String,
    credentials: String,
}

impl KplcClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self> {
        let credentials = settings.credentials()?.to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AnalyzerError::Upstream(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange client credentials for a bearer token
    pub async fn access_token(&self) -> Result<String> {
        let response = self
            .http
            .post(self.url(TOKEN_PATH))
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Basic {}", self.credentials))
            .form(&[("grant_type", "client_credentials"), ("scope", SCOPE)])
            .send()
            .await
            .map_err(|e| AnalyzerError::Upstream(format!("Token request failed: {}", e)))?;

        let body: TokenResponse = decode(response).await?;
        body.access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AnalyzerError::Upstream("Token response has no access_token".into()))
    }

    /// Purchase history for a meter, each record stamped with `created_at`
    pub async fn fetch_bills(
        &self,
        token: &str,
        meter: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Vec<TokenBill>> {
        let envelope: Envelope<ContractRecord> = self.get(token, BILLS_PATH, meter).await?;
        let bills = bills_from_envelope(meter, envelope, created_at)?;
        tracing::debug!(meter, count = bills.len(), "fetched bills");
        Ok(bills)
    }

    /// Supply metadata for a meter
    pub async fn fetch_meter_info(&self, token: &str, meter: &str) -> Result<MeterInfo> {
        let envelope: Envelope<SupplyRecord> = self.get(token, METER_PATH, meter).await?;
        meter_info_from_envelope(envelope)
    }

    async fn get<T: DeserializeOwned>(&self, token: &str, path: &str, meter: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .query(&[("serialNumberMeter", meter)])
            .header(ACCEPT, "application/json")
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AnalyzerError::Upstream(format!("HTTP request failed: {}", e)))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = response
        .error_for_status()
        .map_err(|e| AnalyzerError::Upstream(format!("HTTP status error: {}", e)))?;
    response
        .json()
        .await
        .map_err(|e| AnalyzerError::Upstream(format!("JSON parse error: {}", e)))
}

fn bills_from_envelope(
    meter: &str,
    envelope: Envelope<ContractRecord>,
    created_at: DateTime<Utc>,
) -> Result<Vec<TokenBill>> {
    let contract = envelope
        .data
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| AnalyzerError::Upstream(format!("No contract found for meter {}", meter)))?;

    Ok(contract
        .col_prepayment
        .unwrap_or_default()
        .into_iter()
        .map(|row| TokenBill {
            meter_number: meter.to_string(),
            timestamp: raw_timestamp(row.trn_timestamp),
            token_no: text(row.token_no),
            amount: quantity(row.trn_amount),
            units: quantity(row.trn_units),
            created_at,
        })
        .collect())
}

fn meter_info_from_envelope(envelope: Envelope<SupplyRecord>) -> Result<MeterInfo> {
    let supply = match envelope.data {
        None => SupplyRecord::default(),
        Some(records) => records
            .into_iter()
            .next()
            .ok_or_else(|| AnalyzerError::Upstream("No supply found for meter".into()))?,
    };

    let connection_type = supply
        .attributes
        .unwrap_or_default()
        .into_iter()
        .find(|a| a.desc_attribute.as_deref() == Some("Connection Type"))
        .and_then(|a| text(a.value));

    Ok(MeterInfo {
        contract_status: supply.contract_status.unwrap_or_default(),
        address: supply.address.unwrap_or_default(),
        offered_service: supply.desc_offered_service.unwrap_or_default(),
        connection_type,
    })
}

fn raw_timestamp(value: Value) -> Option<RawTimestamp> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(RawTimestamp::Integer(i)),
            None => n.as_f64().map(RawTimestamp::Float),
        },
        Value::String(s) => Some(RawTimestamp::Text(s)),
        _ => None,
    }
}

fn quantity(value: Value) -> Option<Quantity> {
    match value {
        Value::Number(n) => n.as_f64().map(Quantity::Number),
        Value::String(s) => Some(Quantity::Text(s)),
        _ => None,
    }
}

fn text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
