use crate::codec;
use crate::errors::ContractError;
use crate::ledger::Ledger;
use crate::models::{parse_amount, Account};
use std::sync::Arc;
use tracing::{debug, error};

/// Account-shaped operations over a ledger
#[derive(Clone)]
pub struct AccountStore {
    ledger: Arc<dyn Ledger>,
}

impl AccountStore {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Writes the account and its balance index entry.
    ///
    /// There is no existence check: creating an address twice overwrites the
    /// record and leaves the first index entry behind.
    pub async fn create(
        &self,
        address: &str,
        balance_text: &str,
    ) -> Result<Account, ContractError> {
        if address.is_empty() {
            return Err(ContractError::EmptyArgument("address"));
        }

        let account = Account::new(address, parse_amount(balance_text));

        // Built before any write so a rejected key leaves nothing behind
        let index_key =
            codec::index_key(self.ledger.as_ref(), &account.address, account.balance)?;

        self.put(account.address.as_bytes(), &codec::encode(&account)).await?;
        self.put(&index_key, &codec::INDEX_SENTINEL).await?;

        debug!(address = %account.address, balance = account.balance, "Account created");
        Ok(account)
    }

    pub async fn fetch(&self, address: &str) -> Result<Account, ContractError> {
        self.fetch_record(address).await.map(|(account, _)| account)
    }

    /// The decoded account together with the bytes exactly as stored
    pub async fn fetch_record(&self, address: &str) -> Result<(Account, Vec<u8>), ContractError> {
        let bytes = self
            .ledger
            .get(address.as_bytes())
            .await
            .map_err(|source| ContractError::AdapterRead {
                key: address.to_string(),
                source,
            })?
            .ok_or_else(|| ContractError::NotFound(address.to_string()))?;

        let account = codec::decode(address, &bytes)?;
        Ok((account, bytes))
    }

    /// Persists `to` then `from`. A failure on the second write leaves the
    /// first one in place.
    pub async fn persist_pair(&self, to: &Account, from: &Account) -> Result<(), ContractError> {
        self.put(to.address.as_bytes(), &codec::encode(to)).await?;
        self.put(from.address.as_bytes(), &codec::encode(from)).await
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), ContractError> {
        self.ledger.put(key, value).await.map_err(|source| {
            let key = String::from_utf8_lossy(key).into_owned();
            error!(key = %key.escape_debug(), error = %source, "Ledger write failed");
            ContractError::Persistence { key, source }
        })
    }
}
