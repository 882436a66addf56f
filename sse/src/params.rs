//! Resolution of per-session parameters from raw request inputs.
//!
//! Nothing here rejects input. Anything unparsable or out of range is
//! normalized to its default.

use std::time::Duration;

/// Used when neither the request nor the configured default yields a usable interval.
pub const FALLBACK_INTERVAL_MS: u64 = 100;

/// Reconnection delay advertised to clients unless configured otherwise.
pub const DEFAULT_RETRY_MS: u64 = 1000;

/// Process-wide defaults, built once at startup from configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamDefaults {
    interval: Duration,
    retry_ms: u64,
}

impl StreamDefaults {
    /// `configured_interval_ms` is the raw configuration value. A malformed or
    /// non-positive value falls back to [`FALLBACK_INTERVAL_MS`].
    pub fn new(configured_interval_ms: &str, retry_ms: u64) -> Self {
        let interval_ms = parse_positive(Some(configured_interval_ms)).unwrap_or_else(|| {
            log::warn!(
                "Configured stream interval {configured_interval_ms:?} is not a positive integer, using {FALLBACK_INTERVAL_MS}ms"
            );
            FALLBACK_INTERVAL_MS
        });

        Self {
            interval: Duration::from_millis(interval_ms),
            retry_ms,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn retry_ms(&self) -> u64 {
        self.retry_ms
    }
}

impl Default for StreamDefaults {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(FALLBACK_INTERVAL_MS),
            retry_ms: DEFAULT_RETRY_MS,
        }
    }
}

/// Raw, unvalidated inputs taken from one stream request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamRequest {
    /// `intervalMs` query parameter
    pub interval_ms: Option<String>,
    /// `start` query parameter
    pub start: Option<String>,
    /// `limit` query parameter
    pub limit: Option<String>,
    /// `Last-Event-ID` header
    pub last_event_id: Option<String>,
}

/// Parameters a session starts with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionParams {
    /// First sequence value to emit.
    pub start: u64,
    pub interval: Duration,
    /// Maximum number of events; `None` streams until cancelled.
    pub limit: Option<u64>,
    pub retry_ms: u64,
}

impl SessionParams {
    /// Resolves the starting sequence as: explicit `start` first, then the
    /// value after the client's `Last-Event-ID`, then zero.
    pub fn resolve(request: &StreamRequest, defaults: &StreamDefaults) -> Self {
        let interval = parse_positive(request.interval_ms.as_deref())
            .map(Duration::from_millis)
            .unwrap_or(defaults.interval);

        let start = parse_non_negative(request.start.as_deref())
            .or_else(|| resume_after(request.last_event_id.as_deref()))
            .unwrap_or(0);

        // A limit of zero cannot be told apart from no limit at all.
        let limit = parse_positive(request.limit.as_deref());

        Self {
            start,
            interval,
            limit,
            retry_ms: defaults.retry_ms,
        }
    }
}

fn parse_non_negative(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.parse::<u64>().ok())
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    parse_non_negative(raw).filter(|value| *value > 0)
}

/// A checkpoint of `u64::MAX` has no successor and is ignored.
fn resume_after(last_event_id: Option<&str>) -> Option<u64> {
    parse_non_negative(last_event_id).and_then(|checkpoint| checkpoint.checked_add(1))
}
