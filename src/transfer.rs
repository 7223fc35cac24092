use crate::errors::ContractError;
use crate::models::{parse_amount, Account};
use crate::store::AccountStore;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Applied,
    /// Amount not positive, insufficient funds, self-transfer or overflow.
    /// Both accounts are left untouched and the caller still sees success.
    Rejected,
}

/// Moves balance between two existing accounts
#[derive(Clone)]
pub struct TransferEngine {
    store: AccountStore,
}

impl TransferEngine {
    pub fn new(store: AccountStore) -> Self {
        Self { store }
    }

    pub async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount_text: &str,
    ) -> Result<TransferOutcome, ContractError> {
        let amount = parse_amount(amount_text);

        let mut sender = self.store.fetch(from).await?;
        let mut receiver = self.store.fetch(to).await?;

        let outcome = apply(&mut sender, &mut receiver, amount);
        match outcome {
            TransferOutcome::Applied => {
                info!(from, to, amount, "Transfer applied");
            }
            TransferOutcome::Rejected => {
                warn!(
                    from,
                    to,
                    amount,
                    available = sender.balance,
                    "Transfer rejected, balances unchanged"
                );
            }
        }

        // Both records are rewritten even when the transfer was rejected
        self.store.persist_pair(&receiver, &sender).await?;

        Ok(outcome)
    }
}

/// Guarded balance move: only a positive amount the sender can cover is
/// applied.
pub fn apply(from: &mut Account, to: &mut Account, amount: i64) -> TransferOutcome {
    if amount <= 0 || from.balance < amount || from.address == to.address {
        return TransferOutcome::Rejected;
    }

    let Some(credited) = to.balance.checked_add(amount) else {
        return TransferOutcome::Rejected;
    };

    to.balance = credited;
    from.balance -= amount;
    TransferOutcome::Applied
}
