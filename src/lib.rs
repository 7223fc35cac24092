pub mod cli;
pub mod codec;
pub mod csv_io;
pub mod errors;
pub mod journal;
pub mod ledger;
pub mod models;
pub mod projector;
pub mod router;
pub mod server;
pub mod store;
pub mod transfer;

pub use errors::{ContractError, LedgerError};
pub use ledger::{InMemoryLedger, Ledger, LedgerSession};
pub use models::{Account, Invocation};
pub use projector::QueryProjector;
pub use router::{Command, Contract, Response};
pub use store::AccountStore;
pub use transfer::{TransferEngine, TransferOutcome};
