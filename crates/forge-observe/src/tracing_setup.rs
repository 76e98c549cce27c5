//! Tracing stack for the forge binary.
//!
//! The CLI maps its `-v` count and `--otel` flag onto [`TracingOptions`]
//! and calls [`init_tracing`] once at startup, then [`shutdown_tracing`]
//! before exit so buffered spans get flushed.
//!
//! ```no_run
//! use forge_observe::tracing_setup::{TracingOptions, init_tracing};
//!
//! init_tracing(&TracingOptions { verbosity: 1, otel: false }).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use std::sync::OnceLock;

/// Provider handle kept for the flush in [`shutdown_tracing`].
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// How the tracing stack should be configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOptions {
    /// 0 = warnings only, 1 = info plus forge debug, 2+ = trace.
    pub verbosity: u8,
    /// Bridge tracing spans to OpenTelemetry with a stdout exporter.
    pub otel: bool,
}

impl TracingOptions {
    /// Default filter directive for the configured verbosity.
    ///
    /// `RUST_LOG` takes precedence when set.
    fn filter(&self) -> EnvFilter {
        let directives = match self.verbosity {
            0 => "warn",
            1 => "info,forge=debug,forge_core=debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
    }
}

/// Install the global subscriber: an `fmt` layer that logs targets and
/// span close timing, plus, with `otel` set, a span bridge to an
/// OpenTelemetry stdout exporter. The stdout exporter is meant for local
/// runs; a deployment would swap in OTLP here.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(options: &TracingOptions) -> Result<(), Box<dyn std::error::Error>> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let env_filter = options.filter();

    if options.otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("forge");
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        // Keep a handle for the final flush, then register globally.
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

/// Flush buffered spans and shut the tracer provider down.
///
/// A no-op when OTel export was never enabled, so the CLI calls it
/// unconditionally on exit.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("warning: tracer provider shutdown failed: {e}");
        }
    }
}
