use crate::error::Result;
use crate::params::stream::StreamParams;
use crate::AppState;
use ::sse::{FrameEncoder, Session, SessionEnd, SessionParams};
use async_stream::stream;
use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::StreamExt;
use log::*;
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

/// Header a reconnecting client uses to report the last identifier it received.
pub(crate) const LAST_EVENT_ID: &str = "last-event-id";

/// Bytes buffered between a session and its response body before the
/// session's writes wait on the client.
const FRAME_BUFFER_BYTES: usize = 16 * 1024;

/// GET a stream of increasing numbers as Server-Sent Events
#[utoipa::path(
    get,
    path = "/stream",
    params(
        StreamParams,
        ("Last-Event-ID" = Option<String>, Header, description = "Last identifier received; the stream resumes at the next value"),
    ),
    responses(
        (status = 200, description = "Event stream of `number` events", content_type = "text/event-stream", body = String),
        (status = 500, description = "Streaming unsupported")
    )
)]
pub async fn stream_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    query: core::result::Result<Query<StreamParams>, QueryRejection>,
) -> Result<Response> {
    let params = match query {
        Ok(Query(params)) => params,
        Err(e) => {
            debug!("Ignoring unreadable stream query: {e}");
            StreamParams::default()
        }
    };
    let last_event_id = headers
        .get(LAST_EVENT_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let request = params.into_stream_request(last_event_id);
    let session_params = SessionParams::resolve(&request, app_state.stream_defaults());

    let cancel = app_state.shutdown_token().child_token();
    let (body, writer) = session_body(cancel.clone());

    let response = Response::builder()
        .header(CONTENT_TYPE, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache")
        .header(CONNECTION, "keep-alive")
        .body(body)?;

    let session = Session::new(session_params, cancel);
    debug!("Establishing stream session {}", session.id());
    spawn_session(session, writer);

    Ok(response)
}

/// Builds the response body fed by the returned writer. Dropping the body,
/// i.e. the client going away, cancels `cancel`.
fn session_body(cancel: CancellationToken) -> (Body, DuplexStream) {
    let (writer, reader) = tokio::io::duplex(FRAME_BUFFER_BYTES);
    let disconnect_guard = cancel.drop_guard();

    let mut frames = ReaderStream::new(reader);
    let body = stream! {
        let _disconnect_guard = disconnect_guard;
        while let Some(chunk) = frames.next().await {
            yield chunk;
        }
    };

    (Body::from_stream(body), writer)
}

fn spawn_session(mut session: Session, writer: DuplexStream) -> JoinHandle<SessionEnd> {
    tokio::spawn(async move {
        let mut encoder = FrameEncoder::new(writer);
        let end = session.run(&mut encoder).await;
        // Closes the body from the server side.
        drop(encoder);
        end
    })
}
