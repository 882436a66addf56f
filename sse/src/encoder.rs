use crate::error::Error;
use async_trait::async_trait;
use log::*;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Transmission boundary for a streaming session.
///
/// Implementations frame and send exactly what they are given and flush before
/// returning. They never advance or inspect the sequence themselves.
#[async_trait]
pub trait EventSink: Send {
    /// Tell the client how long to wait before reconnecting after a disconnect.
    async fn write_retry(&mut self, retry_ms: u64) -> Result<(), Error>;

    /// Send one event. Empty `event` or `id` values omit their lines.
    async fn write_event(&mut self, event: &str, data: &str, id: &str) -> Result<(), Error>;
}

/// Writes `text/event-stream` framing to any tokio writer.
///
/// Each field goes out as its own write, so a failure part way through a unit
/// leaves a partial frame behind. The stream is append-only and the connection
/// is abandoned on failure anyway, so nothing is rolled back.
pub struct FrameEncoder<W> {
    writer: W,
}

impl<W> FrameEncoder<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn write_line(&mut self, field: &str, value: &str) -> Result<(), Error> {
        let line = format!("{field}: {value}\n");
        self.writer.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

fn ensure_single_line(field: &'static str, value: &str) -> Result<(), Error> {
    if value.contains(['\n', '\r']) {
        return Err(Error::InvalidField { field });
    }
    Ok(())
}

#[async_trait]
impl<W> EventSink for FrameEncoder<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_retry(&mut self, retry_ms: u64) -> Result<(), Error> {
        let directive = format!("retry: {retry_ms}\n\n");
        self.writer.write_all(directive.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn write_event(&mut self, event: &str, data: &str, id: &str) -> Result<(), Error> {
        ensure_single_line("id", id)?;
        ensure_single_line("event", event)?;

        if !id.is_empty() {
            self.write_line("id", id).await?;
        }
        if !event.is_empty() {
            self.write_line("event", event).await?;
        }
        // Each payload line needs its own `data:` prefix; the client rejoins them with '\n'.
        for line in data.split('\n') {
            self.write_line("data", line.strip_suffix('\r').unwrap_or(line))
                .await?;
        }
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        trace!("Framed SSE event id={id} event={event}");
        Ok(())
    }
}
