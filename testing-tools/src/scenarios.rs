use anyhow::Result;
use colored::*;
use std::time::{Duration, Instant};

use crate::output::{print_event, TestResult};
use crate::sse_client::{Connection, Event};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timers may fire slightly early relative to the client's clock.
const JITTER_ALLOWANCE: Duration = Duration::from_millis(20);

fn sequences(events: &[Event]) -> Vec<Option<u64>> {
    events.iter().map(Event::sequence).collect()
}

pub async fn test_connection(base_url: &str) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Connection Test ===".bright_cyan().bold());
    println!("{} Opening stream and waiting for one event...", "→".blue());

    let mut sse = Connection::establish(base_url, "limit=1", None, "connection".to_string()).await?;

    match sse.next_event(EVENT_TIMEOUT).await {
        Ok(Some(event)) => {
            print_event(&sse.label, &event);
            if event.event_type == "number" && event.id.as_deref() == Some(event.data.as_str()) {
                println!("{} Event shape verified", "✓".green());
                Ok(TestResult::pass("connection_test", start.elapsed()))
            } else {
                println!("{} Unexpected event shape", "✗".red());
                Ok(TestResult::fail(
                    "connection_test",
                    format!("Unexpected event: {:?}", event),
                    start.elapsed(),
                ))
            }
        }
        Ok(None) => Ok(TestResult::fail(
            "connection_test",
            "Stream closed before any event arrived".to_string(),
            start.elapsed(),
        )),
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            Ok(TestResult::fail(
                "connection_test",
                format!("Timeout: {}", e),
                start.elapsed(),
            ))
        }
    }
}

/// `intervalMs=250&start=10&limit=5` must yield 10..=14, spaced by at least
/// the interval, and then the server must close the stream.
pub async fn test_bounded_stream(base_url: &str) -> Result<TestResult> {
    let start = Instant::now();
    let interval = Duration::from_millis(250);

    println!("\n{}", "=== TEST: Bounded Stream ===".bright_cyan().bold());
    println!(
        "{} Requesting intervalMs=250&start=10&limit=5...",
        "→".blue()
    );

    let mut sse = Connection::establish(
        base_url,
        "intervalMs=250&start=10&limit=5",
        None,
        "bounded".to_string(),
    )
    .await?;

    let events = match sse.drain(EVENT_TIMEOUT).await {
        Ok(events) => events,
        Err(e) => {
            return Ok(TestResult::fail(
                "bounded_stream",
                format!("Stream did not close: {}", e),
                start.elapsed(),
            ))
        }
    };
    for event in &events {
        print_event(&sse.label, event);
    }

    let expected: Vec<Option<u64>> = (10..15).map(Some).collect();
    if sequences(&events) != expected {
        return Ok(TestResult::fail(
            "bounded_stream",
            format!("Expected {:?}, got {:?}", expected, sequences(&events)),
            start.elapsed(),
        ));
    }

    let too_close = events
        .windows(2)
        .map(|pair| pair[1].timestamp.duration_since(pair[0].timestamp))
        .find(|gap| *gap + JITTER_ALLOWANCE < interval);
    if let Some(gap) = too_close {
        return Ok(TestResult::fail(
            "bounded_stream",
            format!("Events arrived {:?} apart, expected at least {:?}", gap, interval),
            start.elapsed(),
        ));
    }

    println!("{} Received 10..=14 and the server closed the stream", "✓".green());
    Ok(TestResult::pass("bounded_stream", start.elapsed()))
}

/// Reconnecting with `Last-Event-ID` continues the sequence with no gaps or repeats.
pub async fn test_resume(base_url: &str) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Resume ===".bright_cyan().bold());
    println!("{} First connection reads three events...", "→".blue());

    let mut first =
        Connection::establish(base_url, "intervalMs=50&limit=3", None, "first".to_string())
            .await?;
    let first_events = first.take(3, EVENT_TIMEOUT).await?;
    drop(first);

    let Some(last_id) = first_events.last().and_then(|event| event.id.clone()) else {
        return Ok(TestResult::fail(
            "resume",
            "First connection sent events without identifiers".to_string(),
            start.elapsed(),
        ));
    };

    println!(
        "{} Reconnecting with Last-Event-ID: {}...",
        "→".blue(),
        last_id
    );
    let mut second = Connection::establish(
        base_url,
        "intervalMs=50&limit=3",
        Some(&last_id),
        "second".to_string(),
    )
    .await?;
    let second_events = second.take(3, EVENT_TIMEOUT).await?;

    let combined: Vec<Option<u64>> = sequences(&first_events)
        .into_iter()
        .chain(sequences(&second_events))
        .collect();
    let expected: Vec<Option<u64>> = (0..6).map(Some).collect();

    if combined == expected {
        println!("{} Sequence continued without gaps: {:?}", "✓".green(), combined);
        Ok(TestResult::pass("resume", start.elapsed()))
    } else {
        println!("{} Sequence mismatch", "✗".red());
        Ok(TestResult::fail(
            "resume",
            format!("Expected {:?}, got {:?}", expected, combined),
            start.elapsed(),
        ))
    }
}

/// A malformed `intervalMs` still streams at the server's default interval.
pub async fn test_interval_fallback(base_url: &str) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Interval Fallback ===".bright_cyan().bold());
    println!("{} Requesting intervalMs=abc&limit=2...", "→".blue());

    let mut sse =
        Connection::establish(base_url, "intervalMs=abc&limit=2", None, "fallback".to_string())
            .await?;

    match sse.drain(EVENT_TIMEOUT).await {
        Ok(events) if sequences(&events) == vec![Some(0), Some(1)] => {
            for event in &events {
                print_event(&sse.label, event);
            }
            println!("{} Server fell back to its default interval", "✓".green());
            Ok(TestResult::pass("interval_fallback", start.elapsed()))
        }
        Ok(events) => Ok(TestResult::fail(
            "interval_fallback",
            format!("Expected [0, 1], got {:?}", sequences(&events)),
            start.elapsed(),
        )),
        Err(e) => Ok(TestResult::fail(
            "interval_fallback",
            format!("Timeout: {}", e),
            start.elapsed(),
        )),
    }
}
