use crate::encoder::EventSink;
use crate::params::SessionParams;
use log::*;
use std::fmt;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Type tag carried by every event this stream emits.
pub const EVENT_TYPE: &str = "number";

/// Unique identifier for a session (server-generated, used for log correlation)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One tick's worth of output. Identifier and payload are both the sequence
/// value, so a client resuming by identifier resumes by value too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventUnit {
    pub id: String,
    pub event: &'static str,
    pub data: String,
}

impl EventUnit {
    pub fn for_sequence(sequence: u64) -> Self {
        let value = sequence.to_string();
        Self {
            id: value.clone(),
            event: EVENT_TYPE,
            data: value,
        }
    }
}

/// Why a session stopped emitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client went away or the server is shutting down.
    Cancelled,
    /// The requested number of events was sent.
    LimitReached,
    /// The transport rejected a write; the connection is presumed broken.
    WriteFailed,
    /// The sequence cannot advance past `u64::MAX` without repeating.
    SequenceExhausted,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Cancelled => write!(f, "cancelled"),
            SessionEnd::LimitReached => write!(f, "limit reached"),
            SessionEnd::WriteFailed => write!(f, "write failed"),
            SessionEnd::SequenceExhausted => write!(f, "sequence exhausted"),
        }
    }
}

/// Per-connection streaming state. Never shared between connections.
pub struct Session {
    id: SessionId,
    sequence: u64,
    interval: Duration,
    remaining: Option<u64>,
    retry_ms: u64,
    cancel: CancellationToken,
    emitted: u64,
}

impl Session {
    pub fn new(params: SessionParams, cancel: CancellationToken) -> Self {
        Self {
            id: SessionId::new(),
            sequence: params.start,
            interval: params.interval,
            remaining: params.limit.filter(|limit| *limit > 0),
            retry_ms: params.retry_ms,
            cancel,
            emitted: 0,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Number of events successfully handed to the sink so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Sequence value the next tick will carry.
    pub fn next_sequence(&self) -> u64 {
        self.sequence
    }

    /// Sends the retry hint, then one event per tick until a terminal
    /// condition. The timer lives only for the duration of this call.
    pub async fn run<S>(&mut self, sink: &mut S) -> SessionEnd
    where
        S: EventSink + ?Sized,
    {
        info!(
            "Starting stream session {} at sequence {} every {:?} (limit: {:?})",
            self.id, self.sequence, self.interval, self.remaining
        );

        if let Err(e) = sink.write_retry(self.retry_ms).await {
            debug!("Session {}: retry hint not delivered: {e}", self.id);
        }

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let end = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break SessionEnd::Cancelled,
                _ = ticker.tick() => {}
            }

            if let Some(end) = self.emit(sink).await {
                break end;
            }
        };

        info!(
            "Stream session {} ended ({end}) after {} event(s)",
            self.id, self.emitted
        );
        end
    }

    /// Handles a single tick. Returns the terminal condition, if one was hit.
    async fn emit<S>(&mut self, sink: &mut S) -> Option<SessionEnd>
    where
        S: EventSink + ?Sized,
    {
        let unit = EventUnit::for_sequence(self.sequence);
        if let Err(e) = sink.write_event(unit.event, &unit.data, &unit.id).await {
            debug!("Session {}: dropping stream after write error: {e}", self.id);
            return Some(SessionEnd::WriteFailed);
        }
        trace!("Session {}: sent {}", self.id, unit.id);
        self.emitted += 1;

        match self.sequence.checked_add(1) {
            Some(next) => self.sequence = next,
            None => return Some(SessionEnd::SequenceExhausted),
        }

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                return Some(SessionEnd::LimitReached);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::io;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Written {
        Retry(u64),
        Event {
            event: String,
            data: String,
            id: String,
            at: Instant,
        },
    }

    /// Records everything it is asked to send. Writes fail once
    /// `fail_after` events have been accepted.
    #[derive(Default)]
    struct RecordingSink {
        written: Vec<Written>,
        fail_retry: bool,
        fail_after: Option<usize>,
    }

    impl RecordingSink {
        fn ids(&self) -> Vec<u64> {
            self.written
                .iter()
                .filter_map(|w| match w {
                    Written::Event { id, .. } => Some(id.parse().unwrap()),
                    Written::Retry(_) => None,
                })
                .collect()
        }

        fn event_times(&self) -> Vec<Instant> {
            self.written
                .iter()
                .filter_map(|w| match w {
                    Written::Event { at, .. } => Some(*at),
                    Written::Retry(_) => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn write_retry(&mut self, retry_ms: u64) -> Result<(), Error> {
            if self.fail_retry {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe).into());
            }
            self.written.push(Written::Retry(retry_ms));
            Ok(())
        }

        async fn write_event(&mut self, event: &str, data: &str, id: &str) -> Result<(), Error> {
            if self.fail_after == Some(self.ids().len()) {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe).into());
            }
            self.written.push(Written::Event {
                event: event.to_string(),
                data: data.to_string(),
                id: id.to_string(),
                at: Instant::now(),
            });
            Ok(())
        }
    }

    fn params(start: u64, interval_ms: u64, limit: Option<u64>) -> SessionParams {
        SessionParams {
            start,
            interval: Duration::from_millis(interval_ms),
            limit,
            retry_ms: 1000,
        }
    }

    #[test]
    fn test_event_unit_uses_sequence_for_id_and_data() {
        let unit = EventUnit::for_sequence(17);
        assert_eq!(unit.id, "17");
        assert_eq!(unit.data, "17");
        assert_eq!(unit.event, EVENT_TYPE);
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_emits_exactly_that_many_events() {
        let mut sink = RecordingSink::default();
        let mut session = Session::new(params(10, 250, Some(5)), CancellationToken::new());

        let end = session.run(&mut sink).await;

        assert_eq!(end, SessionEnd::LimitReached);
        assert_eq!(sink.ids(), vec![10, 11, 12, 13, 14]);
        assert_eq!(session.emitted(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_hint_is_written_first() {
        let mut sink = RecordingSink::default();
        let mut session = Session::new(params(0, 100, Some(2)), CancellationToken::new());

        session.run(&mut sink).await;

        assert_eq!(sink.written[0], Written::Retry(1000));
        assert_eq!(sink.written.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_event_carries_the_number_type_and_matching_payload() {
        let mut sink = RecordingSink::default();
        let mut session = Session::new(params(3, 100, Some(3)), CancellationToken::new());

        session.run(&mut sink).await;

        for written in &sink.written[1..] {
            match written {
                Written::Event { event, data, id, .. } => {
                    assert_eq!(event, "number");
                    assert_eq!(data, id);
                }
                Written::Retry(_) => panic!("retry hint written twice"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_retry_hint_does_not_abort_session() {
        let mut sink = RecordingSink {
            fail_retry: true,
            ..Default::default()
        };
        let mut session = Session::new(params(0, 100, Some(3)), CancellationToken::new());

        let end = session.run(&mut sink).await;

        assert_eq!(end, SessionEnd::LimitReached);
        assert_eq!(sink.ids(), vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_are_spaced_by_the_interval() {
        let mut sink = RecordingSink::default();
        let started = Instant::now();
        let mut session = Session::new(params(0, 250, Some(4)), CancellationToken::new());

        session.run(&mut sink).await;

        let times = sink.event_times();
        assert!(times[0] - started >= Duration::from_millis(250));
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(250));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_tick_emits_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut sink = RecordingSink::default();
        let mut session = Session::new(params(0, 100, None), cancel);

        let end = session.run(&mut sink).await;

        assert_eq!(end, SessionEnd::Cancelled);
        assert_eq!(sink.written, vec![Written::Retry(1000)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_stream_stops_further_writes() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(350)).await;
            trigger.cancel();
        });

        let mut sink = RecordingSink::default();
        let mut session = Session::new(params(0, 100, None), cancel);

        let end = session.run(&mut sink).await;

        assert_eq!(end, SessionEnd::Cancelled);
        assert_eq!(sink.ids(), vec![0, 1, 2]);
        assert_eq!(session.next_sequence(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_wins_over_later_cancellation() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(10)).await;
            trigger.cancel();
        });

        let mut sink = RecordingSink::default();
        let mut session = Session::new(params(0, 100, Some(2)), cancel);

        assert_eq!(session.run(&mut sink).await, SessionEnd::LimitReached);
        assert_eq!(sink.ids(), vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_ends_session_without_retry() {
        let mut sink = RecordingSink {
            fail_after: Some(2),
            ..Default::default()
        };
        let mut session = Session::new(params(5, 100, None), CancellationToken::new());

        let end = session.run(&mut sink).await;

        assert_eq!(end, SessionEnd::WriteFailed);
        assert_eq!(sink.ids(), vec![5, 6]);
        assert_eq!(session.emitted(), 2);
        // The failed value was never delivered, so it is still next.
        assert_eq!(session.next_sequence(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_transport_ends_session() {
        use crate::encoder::FrameEncoder;

        let (writer, reader) = tokio::io::duplex(64);
        drop(reader);
        let mut encoder = FrameEncoder::new(writer);
        let mut session = Session::new(params(0, 100, None), CancellationToken::new());

        let end = session.run(&mut encoder).await;

        assert_eq!(end, SessionEnd::WriteFailed);
        assert_eq!(session.emitted(), 0);
        assert_eq!(session.next_sequence(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumed_session_continues_without_gaps() {
        use crate::params::{StreamDefaults, StreamRequest};

        let defaults = StreamDefaults::default();

        let mut first_sink = RecordingSink::default();
        let first_params = SessionParams::resolve(
            &StreamRequest {
                limit: Some("4".to_string()),
                ..Default::default()
            },
            &defaults,
        );
        Session::new(first_params, CancellationToken::new())
            .run(&mut first_sink)
            .await;
        let first_ids = first_sink.ids();
        let last_seen = first_ids.last().unwrap().to_string();

        let mut second_sink = RecordingSink::default();
        let second_params = SessionParams::resolve(
            &StreamRequest {
                limit: Some("3".to_string()),
                last_event_id: Some(last_seen),
                ..Default::default()
            },
            &defaults,
        );
        Session::new(second_params, CancellationToken::new())
            .run(&mut second_sink)
            .await;

        let combined: Vec<u64> = first_ids.into_iter().chain(second_sink.ids()).collect();
        assert_eq!(combined, (0..7).collect::<Vec<u64>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_never_wraps() {
        let mut sink = RecordingSink::default();
        let mut session = Session::new(params(u64::MAX - 1, 100, None), CancellationToken::new());

        let end = session.run(&mut sink).await;

        assert_eq!(end, SessionEnd::SequenceExhausted);
        assert_eq!(sink.ids(), vec![u64::MAX - 1, u64::MAX]);
    }
}
