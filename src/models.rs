use csv_async::StringRecord;
use serde::{Deserialize, Serialize};

/// Field order is the on-ledger JSON order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    pub balance: i64,
}

impl Account {
    pub fn new(address: impl Into<String>, balance: i64) -> Self {
        Self {
            address: address.into(),
            balance,
        }
    }
}

/// One line of an invocation script: operation name followed by positional arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub operation: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(operation: impl Into<String>, args: &[&str]) -> Self {
        Self {
            operation: operation.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn from_record(record: &StringRecord) -> Self {
        let mut fields = record.iter().map(str::to_string);
        let operation = fields.next().unwrap_or_default();
        Self {
            operation,
            args: fields.collect(),
        }
    }
}

/// Integer arguments are parsed permissively: anything that is not a valid
/// signed integer counts as zero.
pub fn parse_amount(text: &str) -> i64 {
    text.parse().unwrap_or(0)
}
