use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Dependencies whose output is only useful when tracing.
const FILTERED_MODULES: &[&str] = &["tower", "tracing", "hyper", "axum", "mio"];

pub struct Logger {}

impl Logger {
    /// Installs the terminal logger at the configured level. Fails if a
    /// global logger has already been set.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        let level = config.log_level_filter;
        TermLogger::init(
            level,
            Self::log_config(level),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )
    }

    /// Per-event session logs are emitted at Trace, so that level also
    /// lets dependency output through.
    fn quiets_dependencies(level: LevelFilter) -> bool {
        level < LevelFilter::Trace
    }

    fn log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if Self::quiets_dependencies(level) {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
