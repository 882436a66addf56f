use anyhow::Result;
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub id: Option<String>,
    pub data: String,
    pub timestamp: Instant,
}

impl Event {
    /// The payload as a sequence value, if it is one.
    pub fn sequence(&self) -> Option<u64> {
        self.data.parse().ok()
    }
}

/// One stream connection. Reconnection is disabled so that a server-side
/// close is observable as the end of the event channel.
pub struct Connection {
    pub label: String,
    event_rx: mpsc::UnboundedReceiver<Event>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Connection {
    pub async fn establish(
        base_url: &str,
        query: &str,
        last_event_id: Option<&str>,
        label: String,
    ) -> Result<Self> {
        let url = format!("{}/stream?{}", base_url, query);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut builder = es::ClientBuilder::for_url(&url)?
            .reconnect(es::ReconnectOptions::reconnect(false).build());
        if let Some(last_event_id) = last_event_id {
            builder = builder.header("Last-Event-ID", last_event_id)?;
        }
        let client = builder.build();

        let stream_label = label.clone();
        let handle = tokio::spawn(async move {
            let mut stream = client.stream();

            loop {
                match stream.next().await {
                    Some(Ok(es::SSE::Event(event))) => {
                        let sse_event = Event {
                            event_type: event.event_type,
                            id: event.id,
                            data: event.data,
                            timestamp: Instant::now(),
                        };

                        if tx.send(sse_event).is_err() {
                            debug!("SSE receiver dropped for {}", stream_label);
                            break;
                        }
                    }
                    Some(Ok(es::SSE::Comment(_))) => {
                        // Ignore comments (keep-alive)
                    }
                    Some(Err(e)) => {
                        // Without reconnects, an error is the end of this connection
                        debug!("SSE stream for {} ended: {}", stream_label, e);
                        break;
                    }
                    None => {
                        debug!("SSE stream ended for {}", stream_label);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            label,
            event_rx: rx,
            _handle: handle,
        })
    }

    /// Waits for the next event. `Ok(None)` means the stream has closed.
    pub async fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>> {
        match tokio::time::timeout(timeout, self.event_rx.recv()).await {
            Ok(event) => Ok(event),
            Err(_) => anyhow::bail!("Timeout waiting for event on {}", self.label),
        }
    }

    /// Reads `count` events, failing if the stream closes first.
    pub async fn take(&mut self, count: usize, timeout: Duration) -> Result<Vec<Event>> {
        let mut events = Vec::with_capacity(count);
        while events.len() < count {
            match self.next_event(timeout).await? {
                Some(event) => events.push(event),
                None => anyhow::bail!(
                    "{} closed after {} of {} events",
                    self.label,
                    events.len(),
                    count
                ),
            }
        }
        Ok(events)
    }

    /// Reads until the server closes the stream.
    pub async fn drain(&mut self, timeout: Duration) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event(timeout).await? {
            events.push(event);
        }
        Ok(events)
    }
}
