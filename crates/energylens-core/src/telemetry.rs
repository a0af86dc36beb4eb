//! Logging setup and self-monitoring metrics

use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level; `verbose` forces `debug`. When
/// `config.directory` is set, logs also go to a daily-rolling file and the
/// returned guard must be kept alive until shutdown.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Option<WorkerGuard> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = config.format.eq_ignore_ascii_case("json");

    let stdout_layer = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "energylens.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = if json {
                fmt::layer().json().with_writer(writer).boxed()
            } else {
                fmt::layer().with_ansi(false).with_writer(writer).boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

/// Install the Prometheus recorder behind the `metrics` macros
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::internal(format!("Failed to install metrics recorder: {e}")))
}

/// Count a finished report and record how long it took
pub fn record_report(kind: &'static str, elapsed: Duration, ok: bool) {
    metrics::counter!("energylens_reports_total", "kind" => kind).increment(1);
    if !ok {
        metrics::counter!("energylens_report_failures_total", "kind" => kind).increment(1);
    }
    metrics::histogram!("energylens_report_duration_seconds", "kind" => kind)
        .record(elapsed.as_secs_f64());
}
