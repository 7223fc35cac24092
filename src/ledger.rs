use crate::errors::LedgerError;
use crate::journal::{Journal, JournalEntry};
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{BoxStream, Stream};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::RwLock;

const COMPOSITE_KEY_DELIMITER: char = '\u{0}';
const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

/// Key/value pair yielded by a range scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// One committed write to a key, as recorded in its history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub tx_id: String,
    pub value: Vec<u8>,
    pub seconds: i64,
    pub nanos: u32,
    pub is_delete: bool,
}

pub type KvStream = BoxStream<'static, Result<KvEntry, LedgerError>>;
pub type HistoryStream = BoxStream<'static, Result<HistoryRecord, LedgerError>>;

/// Contract the account core consumes from the underlying versioned key-value store.
///
/// Iterators returned by the scan methods hold adapter resources until dropped.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError>;

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), LedgerError>;

    /// Keys in `[start, end)` in lexicographic order. An empty bound is open.
    async fn range_scan(&self, start: &[u8], end: &[u8]) -> Result<KvStream, LedgerError>;

    /// Every write to `key`, oldest first, tombstones included.
    async fn history_scan(&self, key: &[u8]) -> Result<HistoryStream, LedgerError>;

    fn composite_key(&self, namespace: &str, components: &[&str]) -> Result<Vec<u8>, LedgerError> {
        composite_key(namespace, components)
    }
}

/// Builds `0x00 namespace 0x00 (component 0x00)*`.
///
/// Composite keys live in their own keyspace: the leading delimiter keeps them
/// out of plain range scans, and the per-component terminator keeps
/// `["ab", "c"]` and `["a", "bc"]` apart.
pub fn composite_key(namespace: &str, components: &[&str]) -> Result<Vec<u8>, LedgerError> {
    validate_key_part(namespace)?;

    let mut key = String::with_capacity(namespace.len() + 2);
    key.push(COMPOSITE_KEY_DELIMITER);
    key.push_str(namespace);
    key.push(COMPOSITE_KEY_DELIMITER);

    for component in components {
        validate_key_part(component)?;
        key.push_str(component);
        key.push(COMPOSITE_KEY_DELIMITER);
    }

    Ok(key.into_bytes())
}

fn validate_key_part(part: &str) -> Result<(), LedgerError> {
    if part.contains(COMPOSITE_KEY_DELIMITER) || part.contains(MAX_UNICODE_RUNE) {
        return Err(LedgerError::InvalidCompositeKey(format!(
            "{:?} contains a reserved character",
            part
        )));
    }
    Ok(())
}

fn is_composite(key: &[u8]) -> bool {
    key.first() == Some(&0)
}

fn display_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

/// Decrements the open-iterator count when the owning stream is dropped
struct IteratorGuard(Arc<AtomicUsize>);

impl IteratorGuard {
    fn open(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for IteratorGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct TrackedIter<T> {
    items: std::vec::IntoIter<T>,
    _guard: IteratorGuard,
}

impl<T: Unpin> Stream for TrackedIter<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<T>> {
        Poll::Ready(self.items.next())
    }
}

fn tracked<T: Unpin + Send + 'static>(
    items: Vec<T>,
    counter: &Arc<AtomicUsize>,
) -> BoxStream<'static, T> {
    Box::pin(TrackedIter {
        items: items.into_iter(),
        _guard: IteratorGuard::open(counter),
    })
}

#[derive(Default)]
struct WorldState {
    values: BTreeMap<Vec<u8>, Vec<u8>>,
    history: HashMap<Vec<u8>, Vec<HistoryRecord>>,
    failing_puts: HashSet<Vec<u8>>,
    failing_reads: HashSet<Vec<u8>>,
}

impl WorldState {
    fn apply(&mut self, key: Vec<u8>, record: HistoryRecord) {
        if record.is_delete {
            self.values.remove(&key);
        } else {
            self.values.insert(key.clone(), record.value.clone());
        }
        self.history.entry(key).or_default().push(record);
    }
}

/// In-memory versioned ledger. Cloning shares the same world state.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<WorldState>>,
    open_iterators: Arc<AtomicUsize>,
    journal: Option<Arc<Journal>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every committed write is appended to `journal` before it becomes visible
    pub fn with_journal(mut self, journal: Arc<Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Re-applies journaled writes without journaling them again
    pub async fn restore(&self, entries: Vec<JournalEntry>) {
        let mut state = self.state.write().await;
        for entry in entries {
            state.apply(entry.key, entry.record);
        }
    }

    /// Opens a unit of work whose writes are stamped with `tx_id`
    pub fn session(&self, tx_id: impl Into<String>) -> LedgerSession {
        LedgerSession {
            ledger: self.clone(),
            tx_id: tx_id.into(),
        }
    }

    pub fn open_iterators(&self) -> usize {
        self.open_iterators.load(Ordering::SeqCst)
    }

    /// Makes every later put to `key` fail
    pub async fn fail_puts_on(&self, key: &[u8]) {
        self.state.write().await.failing_puts.insert(key.to_vec());
    }

    /// Makes later reads of `key` fail, including when a range scan reaches it
    pub async fn fail_reads_on(&self, key: &[u8]) {
        self.state.write().await.failing_reads.insert(key.to_vec());
    }

    pub async fn clear_fail_points(&self) {
        let mut state = self.state.write().await;
        state.failing_puts.clear();
        state.failing_reads.clear();
    }
}

/// A transaction-scoped view of an [`InMemoryLedger`].
///
/// Writes apply immediately; there is no commit or rollback across keys.
#[derive(Clone)]
pub struct LedgerSession {
    ledger: InMemoryLedger,
    tx_id: String,
}

impl LedgerSession {
    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    /// Writes a tombstone for `key`. Deletion is an adapter capability; the
    /// account core never calls it.
    pub async fn delete(&self, key: &[u8]) -> Result<(), LedgerError> {
        self.write(key, Vec::new(), true).await
    }

    async fn write(&self, key: &[u8], value: Vec<u8>, is_delete: bool) -> Result<(), LedgerError> {
        let mut state = self.ledger.state.write().await;

        if state.failing_puts.contains(key) {
            return Err(LedgerError::Unavailable(display_key(key)));
        }

        let now = Utc::now();
        let record = HistoryRecord {
            tx_id: self.tx_id.clone(),
            value,
            seconds: now.timestamp(),
            nanos: now.timestamp_subsec_nanos(),
            is_delete,
        };

        if let Some(journal) = &self.ledger.journal {
            let entry = JournalEntry {
                key: key.to_vec(),
                record: record.clone(),
            };
            journal
                .append(&entry)
                .await
                .map_err(|e| LedgerError::Journal(e.to_string()))?;
        }

        state.apply(key.to_vec(), record);
        Ok(())
    }
}

#[async_trait]
impl Ledger for LedgerSession {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError> {
        let state = self.ledger.state.read().await;
        if state.failing_reads.contains(key) {
            return Err(LedgerError::Unavailable(display_key(key)));
        }
        Ok(state.values.get(key).cloned())
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), LedgerError> {
        self.write(key, value.to_vec(), false).await
    }

    async fn range_scan(&self, start: &[u8], end: &[u8]) -> Result<KvStream, LedgerError> {
        let state = self.ledger.state.read().await;

        let empty_range = !start.is_empty() && !end.is_empty() && start >= end;
        let items: Vec<Result<KvEntry, LedgerError>> = if empty_range {
            Vec::new()
        } else {
            let lower = if start.is_empty() {
                Bound::Unbounded
            } else {
                Bound::Included(start.to_vec())
            };
            let upper = if end.is_empty() {
                Bound::Unbounded
            } else {
                Bound::Excluded(end.to_vec())
            };

            state
                .values
                .range((lower, upper))
                .filter(|(key, _)| !is_composite(key))
                .map(|(key, value)| {
                    if state.failing_reads.contains(key) {
                        Err(LedgerError::Unavailable(display_key(key)))
                    } else {
                        Ok(KvEntry {
                            key: key.clone(),
                            value: value.clone(),
                        })
                    }
                })
                .collect()
        };

        Ok(tracked(items, &self.ledger.open_iterators))
    }

    async fn history_scan(&self, key: &[u8]) -> Result<HistoryStream, LedgerError> {
        let state = self.ledger.state.read().await;
        if state.failing_reads.contains(key) {
            return Err(LedgerError::Unavailable(display_key(key)));
        }

        let records = state.history.get(key).cloned().unwrap_or_default();
        Ok(tracked(
            records.into_iter().map(Ok).collect(),
            &self.ledger.open_iterators,
        ))
    }
}
