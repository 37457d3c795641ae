//! Utilities for logging.
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    HumanReadable,
    Compact,
    Json,
}

/// Configure the global subscriber.
///
/// `RUST_LOG` takes precedence over `default_level` when set.
pub fn configure_global_logger(default_level: Level, format: LogFormat) {
    if let Err(e) = try_configure_global_logger(default_level, format) {
        eprintln!("Failed to set global logger: {e}");
    }
}

/// Like `configure_global_logger`, returning an error if a global subscriber
/// was already installed.
pub fn try_configure_global_logger(
    default_level: Level,
    format: LogFormat,
) -> Result<(), SetGlobalDefaultError> {
    let builder = SubscriberBuilder::default()
        .with_env_filter(env_filter(default_level))
        .with_file(true)
        .with_line_number(true);

    match format {
        LogFormat::HumanReadable => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Compact => tracing::subscriber::set_global_default(builder.compact().finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
}

/// Initialize a trace level logger writing to the test writer.
///
/// Safe to call from multiple tests, only the first call installs the
/// subscriber.
pub fn init_test() {
    let subscriber = SubscriberBuilder::default()
        .with_env_filter(env_filter(Level::TRACE))
        .with_test_writer()
        .with_file(true)
        .with_line_number(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn env_filter(default_level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_test_twice() {
        init_test();
        init_test();
        tracing::debug!("logger initialized");
    }

    #[test]
    fn configure_after_init_errors() {
        init_test();
        let res = try_configure_global_logger(Level::INFO, LogFormat::Json);
        assert!(res.is_err());
    }
}
