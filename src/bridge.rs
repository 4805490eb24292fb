//! Line-delimited JSON over a byte stream: requests in, responses and
//! monitor events out.

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::broadcast::error::RecvError,
};

use crate::{
    commands::{dispatch, ControlRequest, ControlResponse},
    service::LeadWatch,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Serves until the reader hits EOF. Blank lines are ignored and
/// unparseable lines get a failure ack rather than ending the session.
pub async fn serve<R, W>(watch: &LeadWatch, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut events = watch.subscribe_events();
    let mut events_open = true;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read request line")? else {
                    log_info!("Control input closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let response = match serde_json::from_str::<ControlRequest>(line) {
                    Ok(request) => {
                        log_debug!("Request: {request:?}");
                        dispatch(watch, request).await
                    }
                    Err(err) => {
                        log_warn!("Ignoring malformed request: {err}");
                        ControlResponse::failure(format!("invalid request: {err}"))
                    }
                };
                write_json(&mut writer, &response).await?;
            }
            event = events.recv(), if events_open => {
                match event {
                    Ok(event) => write_json(&mut writer, &event).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        log_warn!("Event listener lagged, dropped {skipped} event(s)");
                    }
                    Err(RecvError::Closed) => events_open = false,
                }
            }
        }
    }

    Ok(())
}

async fn write_json<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(value).context("failed to encode message")?;
    line.push(b'\n');
    writer
        .write_all(&line)
        .await
        .context("failed to write message")?;
    writer.flush().await.context("failed to flush output")
}
