use crate::errors::{ContractError, LedgerError};
use crate::ledger::Ledger;
use chrono::{Local, TimeZone};
use futures::StreamExt;
use serde::Serialize;
use serde_json::value::RawValue;
use std::fmt::Display;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Serialize)]
struct RangeEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Record")]
    record: Box<RawValue>,
}

/// `IsDelete` is rendered as the text "true"/"false", not a JSON boolean.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct HistoryEntry {
    tx_id: String,
    value: Option<Box<RawValue>>,
    timestamp: String,
    is_delete: &'static str,
}

/// Read-side projections of range and history scans into JSON array documents
#[derive(Clone)]
pub struct QueryProjector {
    ledger: Arc<dyn Ledger>,
}

impl QueryProjector {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// `[{"Key":..,"Record":..}, ..]` for keys in `[start_key, end_key)`, in
    /// iterator order. Stored records are embedded as-is.
    pub async fn scan_range(
        &self,
        start_key: &str,
        end_key: &str,
    ) -> Result<Vec<u8>, ContractError> {
        let range = || format!("{}..{}", start_key, end_key);

        let mut results = self
            .ledger
            .range_scan(start_key.as_bytes(), end_key.as_bytes())
            .await
            .map_err(|source| ContractError::AdapterRead { key: range(), source })?;

        let mut entries = Vec::new();
        while let Some(item) = results.next().await {
            let entry = item.map_err(|source| ContractError::AdapterRead { key: range(), source })?;
            let key = String::from_utf8_lossy(&entry.key).into_owned();
            let record = raw_json(&key, entry.value)?;
            entries.push(RangeEntry { key, record });
        }

        debug!(start_key, end_key, count = entries.len(), "Range scan complete");
        to_document(&range(), &entries)
    }

    /// `[{"TxId","Value","Timestamp","IsDelete"}, ..]` for every write to
    /// `address`, in the order the ledger reports them.
    pub async fn scan_history(&self, address: &str) -> Result<Vec<u8>, ContractError> {
        let read_error = |source| ContractError::AdapterRead {
            key: address.to_string(),
            source,
        };

        let mut history = self
            .ledger
            .history_scan(address.as_bytes())
            .await
            .map_err(read_error)?;

        let mut entries = Vec::new();
        while let Some(item) = history.next().await {
            let record = item.map_err(read_error)?;

            let value = if record.is_delete {
                None
            } else {
                Some(raw_json(address, record.value)?)
            };

            let timestamp = render_timestamp(record.seconds, record.nanos, &Local)
                .ok_or_else(|| {
                    read_error(LedgerError::InvalidTimestamp {
                        seconds: record.seconds,
                        nanos: record.nanos,
                    })
                })?;

            entries.push(HistoryEntry {
                tx_id: record.tx_id,
                value,
                timestamp,
                is_delete: if record.is_delete { "true" } else { "false" },
            });
        }

        debug!(address, count = entries.len(), "History scan complete");
        to_document(address, &entries)
    }
}

/// Renders seconds/nanos since the epoch as `YYYY-MM-DD HH:MM:SS.nnnnnnnnn +ZZZZ`
/// in `tz`. Returns `None` for instants chrono cannot represent.
pub fn render_timestamp<Tz>(seconds: i64, nanos: u32, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    tz.timestamp_opt(seconds, nanos)
        .single()
        .map(|at| at.format("%Y-%m-%d %H:%M:%S%.9f %z").to_string())
}

fn raw_json(key: &str, bytes: Vec<u8>) -> Result<Box<RawValue>, ContractError> {
    let malformed = |reason: String| ContractError::MalformedRecord {
        key: key.to_string(),
        reason,
    };
    let text = String::from_utf8(bytes).map_err(|e| malformed(e.to_string()))?;
    RawValue::from_string(text).map_err(|e| malformed(e.to_string()))
}

fn to_document<T: Serialize>(key: &str, entries: &[T]) -> Result<Vec<u8>, ContractError> {
    serde_json::to_vec(entries).map_err(|e| ContractError::MalformedRecord {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
