//! Stdin/stdout JSON bridge for the host command channel.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages, routes each
//! through a [`CommandHandler`] on its own task, and writes the resulting
//! `ResponseEnvelope` as a JSON line. Responses can arrive out of order;
//! clients correlate them by `request_id`.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};

use crate::error::{AppError, Result};
use crate::host::contract::{CommandEnvelope, CommandName, ResponseEnvelope};
use crate::host::handler::CommandHandler;

/// Request id used when a line cannot be parsed far enough to find one.
pub const PARSE_ERROR_ID: &str = "parse-error";

type SharedWriter<W> = Arc<Mutex<BufWriter<W>>>;

/// Run the bridge over the process's stdin and stdout.
pub async fn run_stdio_bridge(handler: CommandHandler) -> Result<()> {
    run_bridge(
        handler,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Run the bridge until `reader` reaches EOF or a `runtime.stop` command
/// arrives.
///
/// Commands run concurrently. On `runtime.stop` the bridge waits for every
/// in-flight command to answer, then acknowledges the stop last. On EOF it
/// also waits for in-flight commands before returning.
pub async fn run_bridge<R, W>(handler: CommandHandler, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer: SharedWriter<W> = Arc::new(Mutex::new(BufWriter::new(writer)));
    let mut in_flight: JoinSet<Result<()>> = JoinSet::new();
    let mut lines = reader.lines();

    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| AppError::Host(format!("failed to read command line: {e}")))?;
        let Some(line) = line else {
            tracing::info!("input closed (EOF); shutting down host bridge");
            break;
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope = match serde_json::from_str::<CommandEnvelope>(trimmed) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse command envelope");
                let response = ResponseEnvelope::error(
                    salvage_request_id(trimmed),
                    format!("failed to parse command envelope: {e}"),
                );
                write_response(&writer, &response).await?;
                continue;
            }
        };

        if envelope.command == CommandName::RuntimeStop {
            drain(&mut in_flight).await?;
            let response = handler.route(&envelope).await;
            write_response(&writer, &response).await?;
            tracing::info!("runtime.stop received; shutting down host bridge");
            return Ok(());
        }

        let task_handler = handler.clone();
        let task_writer = Arc::clone(&writer);
        in_flight.spawn(async move {
            let response = task_handler.route(&envelope).await;
            write_response(&task_writer, &response).await
        });

        while let Some(finished) = in_flight.try_join_next() {
            settle(finished)?;
        }
    }

    drain(&mut in_flight).await
}

async fn drain(in_flight: &mut JoinSet<Result<()>>) -> Result<()> {
    while let Some(finished) = in_flight.join_next().await {
        settle(finished)?;
    }
    Ok(())
}

fn settle(finished: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    finished.map_err(|e| AppError::Host(format!("command task failed: {e}")))?
}

/// Best-effort `request_id` from a line that is JSON but not a valid envelope.
fn salvage_request_id(raw: &str) -> String {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|value| {
            value
                .get("request_id")
                .and_then(serde_json::Value::as_str)
                .filter(|id| !id.trim().is_empty())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| PARSE_ERROR_ID.to_owned())
}

async fn write_response<W>(writer: &SharedWriter<W>, response: &ResponseEnvelope) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(response)
        .map_err(|e| AppError::Host(format!("failed to serialize response envelope: {e}")))?;
    let mut w = writer.lock().await;
    write_line(&mut w, &json).await
}

/// Write a single JSON line to the buffered writer and flush.
async fn write_line<W>(writer: &mut BufWriter<W>, json: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| AppError::Host(format!("failed to write response: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| AppError::Host(format!("failed to write newline: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| AppError::Host(format!("failed to flush output: {e}")))?;
    Ok(())
}
