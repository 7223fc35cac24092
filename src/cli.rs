use crate::csv_io::{stream_invocations, write_response};
use crate::ledger::InMemoryLedger;
use crate::router::{Contract, Response};
use anyhow::Result;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{BufReader, BufWriter};

/// Run an invocation script against a fresh in-memory ledger, printing one
/// response line per invocation.
pub async fn run(input_path: PathBuf) -> Result<()> {
    let contract = Contract::new(InMemoryLedger::new());

    let file = File::open(&input_path).await?;
    let reader = BufReader::new(file);
    let mut stream = Box::pin(stream_invocations(reader));
    let mut stdout = BufWriter::new(tokio::io::stdout());

    while let Some(result) = stream.next().await {
        let response = match result {
            Ok(invocation) => contract.run(&invocation).await,
            Err(e) => Response::Error {
                message: format!("unreadable invocation: {}", e),
            },
        };
        write_response(&mut stdout, &response).await?;
    }

    Ok(())
}
