//! Logging and span export for the `tavern` CLI.
//!
//! The CLI's stdout carries its product: a rendered prompt meant to be piped
//! into another tool, a model reply, or `--json` output. Every log line
//! therefore goes to stderr, and `tavern render > prompt.txt` captures the
//! prompt alone no matter how verbose the run is.
//!
//! With OpenTelemetry enabled, the `gen_ai.*` spans around completions,
//! chat requests and captioning are also dumped by the stdout span
//! exporter. That mode is for inspecting backend timings, not for piping.
//!
//! ```no_run
//! tavern_observe::tracing_setup::init_tracing("warn", false).unwrap();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Instrumentation scope of every exported span.
const TRACER_NAME: &str = "tavern";

/// Kept so the exporter can be flushed before the process exits.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("tracing already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Filter directives to use: a non-empty `RUST_LOG` wins over the verbosity
/// the CLI derived from `-v` / `--quiet`.
fn filter_directives<'a>(from_env: Option<&'a str>, default_filter: &'a str) -> &'a str {
    from_env
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .unwrap_or(default_filter)
}

/// Install the global subscriber: an stderr `fmt` layer, plus the
/// OpenTelemetry layer when `enable_otel` is set.
///
/// Closed spans are logged with their timing, so `-vv` shows how long each
/// backend call took.
pub fn init_tracing(default_filter: &str, enable_otel: bool) -> Result<(), TracingError> {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = EnvFilter::try_new(filter_directives(from_env.as_deref(), default_filter))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let otel_layer = enable_otel.then(|| {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer(TRACER_NAME);
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;
    Ok(())
}

/// Flush buffered spans. Does nothing unless OpenTelemetry was enabled.
///
/// Call before every exit path that follows [`init_tracing`].
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: span exporter shutdown failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_overrides_cli_verbosity() {
        assert_eq!(filter_directives(Some("tavern_infra=trace"), "warn"), "tavern_infra=trace");
    }

    #[test]
    fn test_empty_rust_log_falls_back_to_cli_verbosity() {
        assert_eq!(filter_directives(None, "warn"), "warn");
        assert_eq!(filter_directives(Some(""), "info,tavern=debug"), "info,tavern=debug");
        assert_eq!(filter_directives(Some("  "), "error"), "error");
    }

    #[test]
    fn test_cli_filters_parse() {
        for filter in ["error", "warn", "info,tavern=debug", "trace"] {
            assert!(EnvFilter::try_new(filter).is_ok(), "{filter}");
        }
    }

    #[test]
    fn test_shutdown_without_otel_is_noop() {
        shutdown_tracing();
    }
}
