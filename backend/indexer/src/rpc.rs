//! Soroban RPC client: polls `getEvents` and decodes phased-funding events.
//!
//! Failed requests, rate limits and soft RPC errors are retried with
//! exponential back-off capped at [`MAX_BACKOFF_SECS`].

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{IndexerError, Result};
use crate::events::{EventKind, PlatformEvent};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

// ScVal discriminants used in our topics.
const SCV_U32: u32 = 3;
const SCV_BYTES: u32 = 13;
const SCV_SYMBOL: u32 = 15;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub result: Option<EventsResult>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsResult {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
    #[serde(rename = "latestLedger")]
    pub latest_ledger: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawEvent {
    /// Topics, either base64 XDR `ScVal`s or `{"type":…,"value":…}` objects.
    pub topic: Vec<String>,
    pub value: Value,
    #[serde(rename = "contractId")]
    pub contract_id: Option<String>,
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
    pub id: Option<String>,
    pub ledger: Option<u64>,
    #[serde(rename = "ledgerClosedAt")]
    pub ledger_closed_at: Option<String>,
    #[serde(rename = "inSuccessfulContractCall")]
    pub in_successful_contract_call: Option<bool>,
}

// ─────────────────────────────────────────────────────────
// Fetching
// ─────────────────────────────────────────────────────────

/// Fetch one page of contract events.
///
/// Returns `(events, next_cursor, latest_ledger)`.
pub async fn fetch_events(
    client: &Client,
    rpc_url: &str,
    contract_id: &str,
    start_ledger: u32,
    cursor: Option<&str>,
    limit: u32,
) -> Result<(Vec<RawEvent>, Option<String>, Option<u64>)> {
    let mut backoff = INITIAL_BACKOFF_SECS;

    loop {
        let params = build_params(contract_id, start_ledger, cursor, limit);
        let response = client
            .post(rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "getEvents",
                "params": params,
            }))
            .send()
            .await;

        let resp = match response {
            Ok(resp) => resp,
            Err(e) => {
                warn!("getEvents request failed, retrying in {backoff}s: {e}");
                backoff = sleep_backoff(backoff).await;
                continue;
            }
        };

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate-limited by RPC, retrying in {backoff}s");
            backoff = sleep_backoff(backoff).await;
            continue;
        }

        let body: RpcResponse = resp.json().await?;
        if let Some(err) = body.error {
            // Invalid request / unknown method will not fix themselves.
            if err.code == -32600 || err.code == -32601 {
                return Err(IndexerError::EventParse(format!(
                    "RPC hard error {}: {}",
                    err.code, err.message
                )));
            }
            warn!(
                code = err.code,
                "RPC soft error, retrying in {backoff}s: {}", err.message
            );
            backoff = sleep_backoff(backoff).await;
            continue;
        }

        let result = body
            .result
            .ok_or_else(|| IndexerError::EventParse("Empty result from getEvents".to_string()))?;
        debug!(
            count = result.events.len(),
            latest_ledger = ?result.latest_ledger,
            "Fetched events"
        );
        return Ok((result.events, result.cursor, result.latest_ledger));
    }
}

async fn sleep_backoff(current: u64) -> u64 {
    tokio::time::sleep(Duration::from_secs(current)).await;
    (current * 2).min(MAX_BACKOFF_SECS)
}

fn build_params(contract_id: &str, start_ledger: u32, cursor: Option<&str>, limit: u32) -> Value {
    let mut params = json!({
        "filters": [
            {
                "type": "contract",
                "contractIds": [contract_id]
            }
        ],
        "pagination": {
            "limit": limit
        }
    });

    if let Some(cur) = cursor {
        params["pagination"]["cursor"] = json!(cur);
    } else {
        params["startLedger"] = json!(start_ledger);
    }
    params
}

// ─────────────────────────────────────────────────────────
// Topic decoding
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Topic {
    Symbol(String),
    Bytes(Vec<u8>),
    U32(u32),
    /// Anything we do not interpret; kept verbatim.
    Raw(String),
}

impl Topic {
    fn parse(raw: &str) -> Self {
        if let Ok(v) = serde_json::from_str::<Value>(raw) {
            if let Some(topic) = Self::from_json(&v) {
                return topic;
            }
        }
        match Self::from_xdr(raw) {
            Ok(topic) => topic,
            Err(e) => {
                debug!("Topic {raw} is not XDR: {e}");
                Topic::Raw(raw.to_string())
            }
        }
    }

    fn from_json(v: &Value) -> Option<Self> {
        let value = v.get("value")?;
        match v.get("type").and_then(Value::as_str)? {
            "symbol" => value.as_str().map(|s| Topic::Symbol(s.to_string())),
            "bytes" => value
                .as_str()
                .and_then(|s| hex::decode(s).ok())
                .map(Topic::Bytes),
            "u32" => value
                .as_u64()
                .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
                .and_then(|n| u32::try_from(n).ok())
                .map(Topic::U32),
            _ => value
                .as_str()
                .map(String::from)
                .or_else(|| Some(value.to_string()))
                .map(Topic::Raw),
        }
    }

    /// Decode the few `ScVal` arms our topics use.
    fn from_xdr(raw: &str) -> Result<Self> {
        let bytes = BASE64.decode(raw.trim())?;
        let mut reader = XdrReader::new(&bytes);
        let topic = match reader.u32()? {
            SCV_SYMBOL => {
                let body = reader.opaque()?;
                let symbol = std::str::from_utf8(body)
                    .map_err(|e| IndexerError::EventParse(format!("symbol is not utf-8: {e}")))?;
                Topic::Symbol(symbol.to_string())
            }
            SCV_BYTES => Topic::Bytes(reader.opaque()?.to_vec()),
            SCV_U32 => Topic::U32(reader.u32()?),
            _ => Topic::Raw(raw.to_string()),
        };
        Ok(topic)
    }

    /// The symbol name, falling back to the raw text.
    fn name(&self) -> String {
        match self {
            Topic::Symbol(s) | Topic::Raw(s) => s.clone(),
            Topic::Bytes(b) => hex::encode(b),
            Topic::U32(n) => n.to_string(),
        }
    }
}

struct XdrReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> XdrReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        XdrReader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| IndexerError::EventParse("truncated XDR".to_string()))?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Length-prefixed opaque data, padded to four bytes.
    fn opaque(&mut self) -> Result<&'a [u8]> {
        let len = self.u32()? as usize;
        let body = self.take(len)?;
        self.take((4 - len % 4) % 4)?;
        Ok(body)
    }
}

// ─────────────────────────────────────────────────────────
// Event decoding
// ─────────────────────────────────────────────────────────

pub fn decode_events(raw: &[RawEvent], contract_id: &str) -> Vec<PlatformEvent> {
    raw.iter()
        .filter(|e| e.in_successful_contract_call.unwrap_or(true))
        .filter_map(|e| decode_single(e, contract_id))
        .collect()
}

fn decode_single(raw: &RawEvent, contract_id: &str) -> Option<PlatformEvent> {
    let kind = EventKind::from_topic(&Topic::parse(raw.topic.first()?).name());
    let project_id = if kind.is_project_scoped() {
        raw.topic.get(1).map(|t| Topic::parse(t).name())
    } else {
        None
    };

    let ledger = raw.ledger.unwrap_or(0) as i64;
    let timestamp = raw
        .ledger_closed_at
        .as_deref()
        .and_then(parse_iso_to_unix)
        .unwrap_or(0);
    let tx_hash = raw.tx_hash.clone();
    let event_uid = raw.id.clone().unwrap_or_else(|| {
        format!(
            "{ledger}:{}:{}:{}",
            tx_hash.as_deref().unwrap_or("-"),
            kind.as_str(),
            project_id.as_deref().unwrap_or("-"),
        )
    });

    let fields = decode_data(&raw.value, kind);

    Some(PlatformEvent {
        event_uid,
        event_type: kind.as_str().to_string(),
        project_id,
        actor: fields.actor,
        amount: fields.amount,
        status: fields.status,
        phase_index: fields.phase_index,
        ledger,
        timestamp,
        contract_id: raw
            .contract_id
            .clone()
            .unwrap_or_else(|| contract_id.to_string()),
        tx_hash,
    })
}

#[derive(Debug, Default)]
struct DataFields {
    actor: Option<String>,
    amount: Option<String>,
    status: Option<String>,
    phase_index: Option<i64>,
}

/// Pull the indexed columns out of the JSON rendering of an event payload.
fn decode_data(value: &Value, kind: EventKind) -> DataFields {
    let actor = |keys: &[&str]| extract_field(value, keys);
    match kind {
        EventKind::ProjectCreated => DataFields {
            actor: actor(&["owner"]),
            amount: extract_field(value, &["max_raise"]),
            ..Default::default()
        },
        EventKind::ProjectAudited => DataFields {
            actor: actor(&["auditor"]),
            ..Default::default()
        },
        EventKind::Invested | EventKind::Refunded | EventKind::Repaid => DataFields {
            actor: actor(&["investor"]),
            amount: extract_field(value, &["amount"]),
            ..Default::default()
        },
        EventKind::InsurancePaid => DataFields {
            actor: actor(&["payer"]),
            amount: extract_field(value, &["amount"]),
            ..Default::default()
        },
        EventKind::StatusChanged => DataFields {
            status: value.get("to").and_then(extract_enum),
            phase_index: extract_int(value, "phase_index"),
            ..Default::default()
        },
        EventKind::PhaseVoted => DataFields {
            actor: actor(&["voter"]),
            amount: extract_field(value, &["weight"]),
            phase_index: extract_int(value, "phase_index"),
            ..Default::default()
        },
        EventKind::ReplanSubmitted => DataFields {
            actor: actor(&["proposer"]),
            phase_index: extract_int(value, "from_phase"),
            ..Default::default()
        },
        EventKind::ReplanVoted => DataFields {
            actor: actor(&["voter"]),
            amount: extract_field(value, &["weight"]),
            ..Default::default()
        },
        EventKind::ReplanFailed => DataFields {
            amount: extract_field(value, &["failed_replan_count"]),
            ..Default::default()
        },
        EventKind::PhaseReleased => DataFields {
            actor: actor(&["recipient"]),
            amount: extract_field(value, &["amount"]),
            phase_index: extract_int(value, "phase_index"),
            ..Default::default()
        },
        EventKind::RepayFilled => DataFields {
            amount: extract_field(value, &["amount"]),
            ..Default::default()
        },
        EventKind::RoleSet | EventKind::RoleDel => DataFields {
            // Payload is the granting caller, if any.
            actor: value.as_str().map(String::from),
            ..Default::default()
        },
        EventKind::TemplateSet | EventKind::PlatformUpdated | EventKind::Unknown => {
            DataFields::default()
        }
    }
}

fn extract_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn extract_int(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Unit enum variants render as `"Name"`, `["Name"]` or `{"value": "Name"}`.
fn extract_enum(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(extract_enum),
        Value::Object(map) => map.get("value").and_then(extract_enum),
        _ => None,
    }
}

fn parse_iso_to_unix(s: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp())
}
