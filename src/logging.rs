use crate::config::{AppConfig, LogFormat};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "catalog_admin=info";

/// Installs the global subscriber. A subscriber installed earlier wins.
/// Keep the returned guard alive for the lifetime of the process or buffered
/// file output is lost.
pub fn init_tracing(config: &AppConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // Stderr so log lines never interleave with rendered screens on stdout.
    let console = match config.log_format {
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        LogFormat::Pretty => fmt::layer().with_target(false).with_writer(std::io::stderr).boxed(),
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "catalog_admin.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
    {
        tracing::debug!(error = %e, "Tracing subscriber already installed, keeping it");
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_keeps_first_subscriber() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert!(init_tracing(&config).is_none());
        // Already installed: must neither panic nor replace the first one.
        assert!(init_tracing(&config).is_none());
    }
}
