//! Server-Sent Events (SSE) number streaming core.
//!
//! Every connection gets its own [`Session`] that emits an increasing
//! sequence of `number` events on a timer until the client disconnects, an
//! optional event limit is reached, or the server shuts down.
//!
//! # Architecture
//!
//! - **Independent sessions**: no registry and no shared counter. Each
//!   connection resolves its own starting point and runs on its own task.
//! - **Checkpoint resume**: a client reconnecting with `Last-Event-ID: k`
//!   continues at `k + 1`. There is no replay buffer; events sent to a dropped
//!   connection are gone.
//! - **Cooperative cancellation**: the session waits on exactly two things,
//!   its timer and its [`CancellationToken`](tokio_util::sync::CancellationToken),
//!   and handles whichever fires first.
//! - **Transport-agnostic framing**: [`FrameEncoder`] writes
//!   `text/event-stream` framing to any tokio `AsyncWrite` and flushes after
//!   every unit. The web layer decides where those bytes go.
//!
//! # Modules
//!
//! - `encoder`: the [`EventSink`] seam and its wire-format implementation
//! - `params`: resolution of request inputs into [`SessionParams`]
//! - `session`: the timed emission loop
//! - `error`: transport and framing errors

pub mod encoder;
pub mod error;
pub mod params;
pub mod session;

pub use encoder::{EventSink, FrameEncoder};
pub use params::{SessionParams, StreamDefaults, StreamRequest};
pub use session::{Session, SessionEnd, SessionId};
