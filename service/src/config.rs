use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::time::Duration;

/// Default interval between stream events, kept as text so a malformed
/// environment value can be detected and replaced at startup.
pub const DEFAULT_STREAM_INTERVAL_MS: &str = "100";

/// Allows any origin when present in `cors_allow_origin`.
pub const ANY_ORIGIN: &str = "*";

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub interface: String,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8080)]
    pub port: u16,

    /// Default number of milliseconds between stream events when a request
    /// does not supply a valid `intervalMs`. Invalid values fall back to 100.
    #[arg(long, env, default_value = DEFAULT_STREAM_INTERVAL_MS)]
    stream_interval_ms: String,

    /// Reconnection delay in milliseconds advertised to clients at the start of every stream
    #[arg(long, env, default_value_t = sse::params::DEFAULT_RETRY_MS)]
    pub retry_ms: u64,

    /// A comma separated list of CORS origins allowed to receive server responses, or `*` for any
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = ANY_ORIGIN
    )]
    pub cors_allow_origin: Vec<String>,

    /// Seconds to wait for open streams to drain after a shutdown signal
    #[arg(long, env, default_value_t = 5)]
    pub shutdown_grace_secs: u64,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Raw configured default interval; see [`sse::StreamDefaults::new`] for how it is validated.
    pub fn stream_interval_ms(&self) -> &str {
        &self.stream_interval_ms
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.interface, self.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_allow_origin.is_empty()
            || self
                .cors_allow_origin
                .iter()
                .any(|origin| origin.trim() == ANY_ORIGIN)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["number_stream"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--interface",
            "127.0.0.1",
            "--port",
            "9000",
            "--stream-interval-ms",
            "250",
            "--retry-ms",
            "3000",
            "--shutdown-grace-secs",
            "1",
        ]);

        assert_eq!(config.listen_addr(), "127.0.0.1:9000");
        assert_eq!(config.stream_interval_ms(), "250");
        assert_eq!(config.retry_ms, 3000);
        assert_eq!(config.shutdown_grace(), Duration::from_secs(1));
    }

    #[test]
    fn test_malformed_interval_is_accepted_as_text() {
        let config = parse(&["--stream-interval-ms", "abc"]);
        assert_eq!(config.stream_interval_ms(), "abc");
    }

    #[test]
    fn test_cors_origin_list_is_split() {
        let config = parse(&[
            "--cors-allow-origin",
            "http://localhost:3000,https://example.com",
        ]);
        assert_eq!(
            config.cors_allow_origin,
            vec!["http://localhost:3000", "https://example.com"]
        );
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn test_wildcard_origin_allows_any() {
        let config = parse(&["--cors-allow-origin", "*"]);
        assert!(config.allows_any_origin());
    }

    #[test]
    fn test_log_level_is_parsed() {
        let config = parse(&["--log-level-filter", "DEBUG"]);
        assert_eq!(config.log_level_filter, LevelFilter::Debug);
    }
}
