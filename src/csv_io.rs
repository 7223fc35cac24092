use crate::models::Invocation;
use crate::router::Response;
use csv_async::AsyncReaderBuilder;
use futures::stream::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::compat::TokioAsyncReadCompatExt;

/// Stream invocations from an async reader, one `operation,arg,...` line each.
/// Lines starting with `#` are comments.
pub fn stream_invocations<R: AsyncRead + Unpin + Send + 'static>(
    reader: R,
) -> impl Stream<Item = Result<Invocation, csv_async::Error>> {
    let compat_reader = reader.compat();
    let csv_reader = AsyncReaderBuilder::new()
        .has_headers(false)
        .trim(csv_async::Trim::All)
        .flexible(true)
        .comment(Some(b'#'))
        .create_reader(compat_reader);

    csv_reader
        .into_records()
        .map(|record| record.map(|r| Invocation::from_record(&r)))
}

/// `OK`, `OK <payload>` or `ERROR <message>`
pub fn format_response(response: &Response) -> String {
    match response {
        Response::Success(None) => "OK\n".to_string(),
        Response::Success(Some(payload)) => {
            format!("OK {}\n", String::from_utf8_lossy(payload))
        }
        Response::Error { message } => format!("ERROR {}\n", message),
    }
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
) -> Result<(), anyhow::Error> {
    writer.write_all(format_response(response).as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
