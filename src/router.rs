use crate::errors::ContractError;
use crate::ledger::{InMemoryLedger, Ledger};
use crate::models::Invocation;
use crate::projector::QueryProjector;
use crate::store::AccountStore;
use crate::transfer::TransferEngine;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Typed form of a named invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { address: String, balance_text: String },
    Transfer { from: String, to: String, amount_text: String },
    Fetch { address: String },
    ScanRange { start_key: String, end_key: String },
    ScanHistory { address: String },
}

impl Command {
    /// Resolves the operation name and checks arguments. No ledger access
    /// happens here. Arguments beyond the expected count are ignored.
    pub fn parse(operation: &str, args: &[String]) -> Result<Self, ContractError> {
        match operation {
            "create" | "initWallet" => {
                let [address, balance_text] = take::<2>(args)?;
                Ok(Command::Create {
                    address: non_empty("address", address)?,
                    balance_text,
                })
            }
            "transfer" | "transferFunds" => {
                let [from, to, amount_text] = take::<3>(args)?;
                Ok(Command::Transfer {
                    from: non_empty("from", from)?,
                    to: non_empty("to", to)?,
                    amount_text,
                })
            }
            "fetch" | "readWallet" => {
                let [address] = take::<1>(args)?;
                Ok(Command::Fetch {
                    address: non_empty("address", address)?,
                })
            }
            "scanRange" | "getWalletsByRange" => {
                let [start_key, end_key] = take::<2>(args)?;
                Ok(Command::ScanRange { start_key, end_key })
            }
            "scanHistory" | "getHistoryForWallet" => {
                let [address] = take::<1>(args)?;
                Ok(Command::ScanHistory {
                    address: non_empty("address", address)?,
                })
            }
            other => Err(ContractError::UnknownOperation(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Create { .. } => "create",
            Command::Transfer { .. } => "transfer",
            Command::Fetch { .. } => "fetch",
            Command::ScanRange { .. } => "scanRange",
            Command::ScanHistory { .. } => "scanHistory",
        }
    }
}

fn take<const N: usize>(args: &[String]) -> Result<[String; N], ContractError> {
    if args.len() < N {
        return Err(ContractError::ArgumentCount { expected: N });
    }
    Ok(std::array::from_fn(|i| args[i].clone()))
}

fn non_empty(name: &'static str, value: String) -> Result<String, ContractError> {
    if value.is_empty() {
        return Err(ContractError::EmptyArgument(name));
    }
    Ok(value)
}

/// Boundary response of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Success(Option<Vec<u8>>),
    Error { message: String },
}

impl Response {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Response::Success(Some(payload)) => Some(payload),
            _ => None,
        }
    }
}

impl From<Result<Option<Vec<u8>>, ContractError>> for Response {
    fn from(result: Result<Option<Vec<u8>>, ContractError>) -> Self {
        match result {
            Ok(payload) => Response::Success(payload),
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        }
    }
}

/// Runs one command against `ledger` as a single unit of work
pub async fn execute(
    ledger: Arc<dyn Ledger>,
    command: Command,
) -> Result<Option<Vec<u8>>, ContractError> {
    let store = AccountStore::new(ledger.clone());

    match command {
        Command::Create {
            address,
            balance_text,
        } => {
            store.create(&address, &balance_text).await?;
            Ok(None)
        }
        Command::Transfer {
            from,
            to,
            amount_text,
        } => {
            TransferEngine::new(store)
                .transfer(&from, &to, &amount_text)
                .await?;
            Ok(None)
        }
        Command::Fetch { address } => {
            let (_, stored) = store.fetch_record(&address).await?;
            Ok(Some(stored))
        }
        Command::ScanRange { start_key, end_key } => {
            let document = QueryProjector::new(ledger)
                .scan_range(&start_key, &end_key)
                .await?;
            Ok(Some(document))
        }
        Command::ScanHistory { address } => {
            let document = QueryProjector::new(ledger).scan_history(&address).await?;
            Ok(Some(document))
        }
    }
}

/// Dispatches named invocations against an in-memory ledger, one session
/// (and transaction id) per invocation.
#[derive(Clone, Default)]
pub struct Contract {
    ledger: InMemoryLedger,
}

impl Contract {
    pub fn new(ledger: InMemoryLedger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }

    pub async fn invoke(&self, operation: &str, args: &[String]) -> Response {
        let tx_id = Uuid::new_v4().to_string();
        self.invoke_in(&tx_id, operation, args).await
    }

    pub async fn invoke_in(&self, tx_id: &str, operation: &str, args: &[String]) -> Response {
        info!(tx_id, operation, "Invoke is running");

        let command = match Command::parse(operation, args) {
            Ok(command) => command,
            Err(e) => {
                warn!(tx_id, operation, error = %e, "Invocation rejected");
                return Response::Error {
                    message: e.to_string(),
                };
            }
        };

        let session: Arc<dyn Ledger> = Arc::new(self.ledger.session(tx_id));
        let name = command.name();
        let result = execute(session, command).await;

        if let Err(e) = &result {
            warn!(tx_id, operation = name, error = %e, "Invocation failed");
        }

        result.into()
    }

    pub async fn run(&self, invocation: &Invocation) -> Response {
        self.invoke(&invocation.operation, &invocation.args).await
    }
}
