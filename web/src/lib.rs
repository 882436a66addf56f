//! HTTP layer: routes, handlers and request parameter types.

use ::sse::StreamDefaults;
use tokio_util::sync::CancellationToken;

mod controller;
pub mod error;
mod params;
pub mod router;
mod sse;

pub use router::define_routes;

// Web-level state: service infrastructure plus the process-wide shutdown signal
// every stream session is cancelled from.
#[derive(Clone)]
pub struct AppState {
    pub service_state: service::AppState,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service_state: service::AppState, shutdown: CancellationToken) -> Self {
        Self {
            service_state,
            shutdown,
        }
    }

    pub fn stream_defaults(&self) -> &StreamDefaults {
        self.service_state.stream_defaults()
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}
