use config::Config;
use log::info;
use sse::StreamDefaults;

pub mod config;
pub mod logging;

// Service-level state containing only infrastructure concerns
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    stream_defaults: StreamDefaults,
}

impl AppState {
    /// Resolves the stream defaults once so request handling never consults
    /// the raw configuration.
    pub fn new(app_config: Config) -> Self {
        let stream_defaults =
            StreamDefaults::new(app_config.stream_interval_ms(), app_config.retry_ms);

        info!(
            "Stream defaults: interval={:?}, retry={}ms",
            stream_defaults.interval(),
            stream_defaults.retry_ms()
        );

        Self {
            config: app_config,
            stream_defaults,
        }
    }

    pub fn stream_defaults(&self) -> &StreamDefaults {
        &self.stream_defaults
    }
}
