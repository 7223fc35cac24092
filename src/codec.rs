use crate::errors::ContractError;
use crate::ledger::Ledger;
use crate::models::Account;

/// Namespace tag of the balance index
pub const BALANCE_INDEX: &str = "address~balance";

/// Value stored under every balance index key
pub const INDEX_SENTINEL: [u8; 1] = [0x00];

pub fn encode(account: &Account) -> Vec<u8> {
    // Serializing a struct of a String and an i64 cannot fail
    serde_json::to_vec(account).unwrap_or_default()
}

pub fn decode(key: &str, bytes: &[u8]) -> Result<Account, ContractError> {
    serde_json::from_slice(bytes).map_err(|e| ContractError::MalformedRecord {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Balance index key for `(address, balance)`, built with the adapter's own
/// composite key convention.
pub fn index_key(
    ledger: &dyn Ledger,
    address: &str,
    balance: i64,
) -> Result<Vec<u8>, ContractError> {
    let balance = balance.to_string();
    ledger
        .composite_key(BALANCE_INDEX, &[address, balance.as_str()])
        .map_err(ContractError::CompositeKey)
}
