use crate::ledger::HistoryRecord;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// A ledger write as it appears in the journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub key: Vec<u8>,
    pub record: HistoryRecord,
}

/// Simple append-only journal of ledger writes, one CSV line per write:
/// `tx_id_hex,key_hex,value_hex,seconds,nanos,is_delete`
pub struct Journal {
    path: PathBuf,
    writer: Mutex<File>,
}

impl Journal {
    pub async fn open(path: PathBuf) -> Result<Self> {
        // Create file if doesn't exist, append if exists
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("opening journal {}", path.display()))?;

        Ok(Self {
            path,
            writer: Mutex::new(file),
        })
    }

    pub async fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(format_line(entry).as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read back every journaled write in append order
    pub async fn replay(&self) -> Result<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut entries = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable journal line");
                }
            }
        }

        Ok(entries)
    }
}

fn format_line(entry: &JournalEntry) -> String {
    format!(
        "{},{},{},{},{},{}\n",
        hex::encode(&entry.record.tx_id),
        hex::encode(&entry.key),
        hex::encode(&entry.record.value),
        entry.record.seconds,
        entry.record.nanos,
        entry.record.is_delete
    )
}

fn parse_line(line: &str) -> Result<JournalEntry> {
    let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();

    if parts.len() != 6 {
        anyhow::bail!("Invalid journal line: expected 6 fields, got {}", parts.len());
    }

    Ok(JournalEntry {
        key: hex::decode(parts[1])?,
        record: HistoryRecord {
            tx_id: String::from_utf8(hex::decode(parts[0])?)?,
            value: hex::decode(parts[2])?,
            seconds: parts[3].parse()?,
            nanos: parts[4].parse()?,
            is_delete: parts[5].parse()?,
        },
    })
}
