//! Terminal logging for the gateway.

use crate::config::Config;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// HTTP stack crates that log every connection and request. Muted below TRACE
/// so the gateway's own authentication events stay readable.
const FILTERED_MODULES: &[&str] = &["hyper", "reqwest", "tower", "tower_http", "axum", "mio"];

pub struct Logger {}

impl Logger {
    /// Install the process-wide logger at the configured level. A second call
    /// keeps the first logger and reports the failure on stderr.
    pub fn init_logger(config: &Config) {
        let level = config.log_level_filter;
        if let Err(e) = TermLogger::init(
            level,
            Self::log_config(level),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ) {
            eprintln!("Failed to start simplelog: {e}");
        }
    }

    fn log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if Self::mutes_http_stack(level) {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }

    fn mutes_http_stack(level: LevelFilter) -> bool {
        level < LevelFilter::Trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_modules_cover_http_stack() {
        for module in ["hyper", "reqwest", "tower_http", "axum"] {
            assert!(
                FILTERED_MODULES.contains(&module),
                "{module} should be filtered"
            );
        }
    }

    #[test]
    fn test_http_stack_is_only_heard_at_trace() {
        assert!(!Logger::mutes_http_stack(LevelFilter::Trace));
        for level in [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
        ] {
            assert!(Logger::mutes_http_stack(level), "{level}");
        }
    }

    #[test]
    fn test_log_config_builds_for_every_level() {
        for level in [LevelFilter::Info, LevelFilter::Trace] {
            let _config = Logger::log_config(level);
        }
    }
}
