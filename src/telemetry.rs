//! Tracing for the Fleetbook service: one-time subscriber installation driven
//! by the service config, a bridge routing legacy `log::` macros into tracing,
//! and a task-local trace context that the request middleware scopes around
//! each call so error responses and response envelopes can echo the
//! correlation ID.

use std::any::type_name_of_val;
use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use thiserror::Error;
use tokio::task_local;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::Layer,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

use crate::config::AppConfig;

/// Correlation metadata carried for the duration of one request.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
}

task_local! {
    static ACTIVE_TRACE_CONTEXT: TraceContext;
}

/// Output shape selected by `FLEETBOOK_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// `pretty` opts into human-readable output for local work; any other
    /// value falls back to the JSON default used in deployments.
    fn from_config(value: &str) -> Self {
        if value.eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Errors that can occur while installing the global telemetry stack.
#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install log tracer bridge: {0}")]
    LogTracer(#[from] log::SetLoggerError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

static TRACING_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Installs the global tracing subscriber once, at the level set by
/// `FLEETBOOK_LOG_LEVEL` and in the shape set by `FLEETBOOK_LOG_FORMAT`.
/// Later calls are no-ops so tests and embedded callers may invoke it freely.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if TRACING_INSTALLED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Ok(());
    }

    install_log_bridge();

    // RUST_LOG wins over the configured level so an operator can raise
    // verbosity without touching the service env files.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = match LogFormat::from_config(&config.log_format) {
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
    {
        TRACING_INSTALLED.store(false, Ordering::SeqCst);
        eprintln!(
            "Warning: failed to set the global tracing subscriber: {}. The previously installed subscriber stays active.",
            err
        );
    }

    Ok(())
}

/// Routes legacy `log::` macro calls into the tracing pipeline. A bridge may
/// already be registered when initialization runs more than once per process;
/// that case is not an error.
fn install_log_bridge() {
    if let Err(err) = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init()
    {
        let logger_type = type_name_of_val(log::logger());
        if !logger_type.contains("LogTracer") {
            eprintln!(
                "Warning: could not install the log bridge: {}. Output from `log::` macros will be dropped.",
                err
            );
        }
    }
}

/// Runs `future` with `context` installed as the task-local trace context.
/// The request middleware wraps every handler invocation in this.
pub async fn with_trace_context<Fut, R>(context: TraceContext, future: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    ACTIVE_TRACE_CONTEXT.scope(context, future).await
}

/// The trace ID of the request being served, if the current task runs under
/// [`with_trace_context`].
pub fn current_trace_id() -> Option<String> {
    ACTIVE_TRACE_CONTEXT
        .try_with(|ctx| ctx.trace_id.clone())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_falls_back_to_json() {
        assert_eq!(LogFormat::from_config("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_config("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_config("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_config("compact"), LogFormat::Json);
        assert_eq!(LogFormat::from_config(""), LogFormat::Json);
    }

    #[tokio::test]
    async fn trace_id_is_visible_only_inside_the_scoped_future() {
        assert!(current_trace_id().is_none());

        let context = TraceContext {
            trace_id: "trace-1234".to_string(),
        };
        let seen = with_trace_context(context, async { current_trace_id() }).await;

        assert_eq!(seen.as_deref(), Some("trace-1234"));
        assert!(current_trace_id().is_none());
    }
}
