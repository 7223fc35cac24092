use thiserror::Error;

/// Failures reported by a ledger adapter.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger unavailable for key {0}")]
    Unavailable(String),
    #[error("invalid composite key: {0}")]
    InvalidCompositeKey(String),
    #[error("timestamp out of range: {seconds}s {nanos}ns")]
    InvalidTimestamp { seconds: i64, nanos: u32 },
    #[error("journal write failed: {0}")]
    Journal(String),
}

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("incorrect number of arguments, expecting {expected}")]
    ArgumentCount { expected: usize },
    #[error("argument can't be empty: {0}")]
    EmptyArgument(&'static str),
    #[error("account does not exist: {0}")]
    NotFound(String),
    #[error("malformed record at {key}: {reason}")]
    MalformedRecord { key: String, reason: String },
    #[error("failed to persist {key}: {source}")]
    Persistence {
        key: String,
        #[source]
        source: LedgerError,
    },
    #[error("failed to get state for {key}: {source}")]
    AdapterRead {
        key: String,
        #[source]
        source: LedgerError,
    },
    #[error("failed to build index key: {0}")]
    CompositeKey(#[source] LedgerError),
    #[error("received unknown operation: {0}")]
    UnknownOperation(String),
}
