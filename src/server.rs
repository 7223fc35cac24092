use crate::csv_io::{stream_invocations, write_response};
use crate::journal::Journal;
use crate::ledger::InMemoryLedger;
use crate::router::{Contract, Response};
use anyhow::Result;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Semaphore};

pub async fn run(bind: String, max_connections: usize, journal_path: PathBuf) -> Result<()> {
    tracing::info!("Server mode: binding to {}", bind);

    let journal = Arc::new(Journal::open(journal_path.clone()).await?);

    // Rebuild state from previous runs
    let ledger = InMemoryLedger::new();
    let entries = journal.replay().await?;
    tracing::info!(
        "Replayed {} ledger writes from {}",
        entries.len(),
        journal_path.display()
    );
    ledger.restore(entries).await;

    // Invocations run one at a time, each as an isolated unit of work
    let contract = Arc::new(Mutex::new(Contract::new(ledger.with_journal(journal))));

    let listener = TcpListener::bind(&bind).await?;
    let semaphore = Arc::new(Semaphore::new(max_connections));

    tracing::info!("Listening on {}, max {} connections", bind, max_connections);

    loop {
        let permit = semaphore.clone().acquire_owned().await?;
        let (socket, addr) = listener.accept().await?;
        tracing::info!("Accepted connection from {}", addr);

        let contract = contract.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, contract).await {
                tracing::error!("Connection {} error: {}", addr, e);
            }
            drop(permit);
        });
    }
}

async fn handle_connection(socket: TcpStream, contract: Arc<Mutex<Contract>>) -> Result<()> {
    let (reader, writer) = socket.into_split();
    let reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);

    let mut stream = Box::pin(stream_invocations(reader));

    while let Some(result) = stream.next().await {
        let response = match result {
            Ok(invocation) => {
                let contract = contract.lock().await;
                contract.run(&invocation).await
            }
            Err(e) => {
                tracing::warn!("Invocation parse error: {}", e);
                Response::Error {
                    message: format!("unreadable invocation: {}", e),
                }
            }
        };
        write_response(&mut writer, &response).await?;
    }

    Ok(())
}
