//! Tracing setup for the list sync core.
//!
//! [`init_logging`] installs a `tracing-subscriber` registry with an
//! `EnvFilter` and one of three formatters. Hosts that pass a
//! [`LoggerSink`] also receive every event that passes the filter as a
//! [`LogEntry`], fields included, with credential-looking fields redacted.
//!
//! ```ignore
//! init_logging(LoggingConfig::default().with_format(LogFormat::Json))?;
//! tracing::info!(list_id = %id, client_id = 42, "List pushed");
//! ```

use crate::error::{Error, Result};

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// Crates whose events are emitted at the configured level by default.
/// Everything else is held at `warn`.
const WORKSPACE_TARGETS: &[&str] = &[
    "core_runtime",
    "core_library",
    "core_sync",
    "core_service",
    "provider_jellyfin",
    "bridge_desktop",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored; the debug-build default
    Pretty,
    /// One JSON object per event; the release-build default
    Json,
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level
    pub level: LogLevel,
    /// Redact credentials in fields forwarded to the logger sink
    pub redact_pii: bool,
    /// Custom filter string (e.g., "core_sync=trace,provider_jellyfin=debug")
    pub filter: Option<String>,
    /// Optional logger sink for forwarding logs to host
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Emit span enter/exit events
    pub enable_spans: bool,
    /// Display target module in logs
    pub display_target: bool,
    /// Display thread info
    pub display_thread_info: bool,
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("redact_pii", &self.redact_pii)
            .field("filter", &self.filter)
            .field("logger_sink", &self.logger_sink.is_some())
            .field("enable_spans", &self.enable_spans)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            redact_pii: true,
            filter: None,
            logger_sink: None,
            enable_spans: false,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_pii_redaction(mut self, redact: bool) -> Self {
        self.redact_pii = redact;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Install the global subscriber. Only the first call per process succeeds.
///
/// # Errors
///
/// `Error::Config` for an unparsable filter, `Error::LoggingAlreadyInitialized`
/// when some subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let sink_layer = LoggerSinkLayer::new(config.logger_sink.clone(), config.redact_pii);
    let span_events = if config.enable_spans {
        tracing_subscriber::fmt::format::FmtSpan::ACTIVE
    } else {
        tracing_subscriber::fmt::format::FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(filter).with(sink_layer);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(config.display_target)
                    .with_thread_ids(config.display_thread_info)
                    .with_thread_names(config.display_thread_info)
                    .with_span_events(span_events)
                    .with_writer(io::stdout),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(config.enable_spans)
                    .with_target(config.display_target)
                    .with_thread_ids(config.display_thread_info)
                    .with_thread_names(config.display_thread_info)
                    .with_writer(io::stdout),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(config.display_target)
                    .with_thread_ids(config.display_thread_info)
                    .with_thread_names(config.display_thread_info)
                    .with_span_events(span_events)
                    .with_writer(io::stdout),
            )
            .try_init(),
    };

    result.map_err(|_| Error::LoggingAlreadyInitialized)
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let filter_string = match &config.filter {
        Some(custom_filter) => custom_filter.clone(),
        None => {
            let level = level_name(config.level);
            let mut directives = vec!["warn".to_string()];
            directives.extend(
                WORKSPACE_TARGETS
                    .iter()
                    .map(|target| format!("{}={}", target, level)),
            );
            directives.extend(
                ["h2", "hyper", "reqwest", "sqlx"]
                    .iter()
                    .map(|target| format!("{}=warn", target)),
            );
            directives.join(",")
        }
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

/// Layer that forwards events to a `LoggerSink` implementation.
struct LoggerSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
    redact: bool,
}

impl LoggerSinkLayer {
    fn new(sink: Option<Arc<dyn LoggerSink>>, redact: bool) -> Self {
        Self { sink, redact }
    }
}

impl<S> Layer<S> for LoggerSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let metadata = event.metadata();
        let level = tracing_level_to_log_level(*metadata.level());

        if level < sink.min_level() {
            return;
        }

        let mut visitor = SinkVisitor::default();
        event.record(&mut visitor);

        let message = visitor
            .message
            .unwrap_or_else(|| metadata.name().to_string());

        let mut entry = LogEntry::new(level, metadata.target(), message);

        for (key, value) in visitor.fields {
            let value = if self.redact {
                redact_if_sensitive(&key, &value)
            } else {
                value
            };
            entry = entry.with_field(key, value);
        }

        if let Some(span) = ctx.lookup_current() {
            entry = entry.with_span_id(span.name());
        }

        let sink = Arc::clone(sink);

        // Inside a runtime the sink call must not block the emitting task.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = sink.log(entry).await {
                    eprintln!("LoggerSink error: {}", err);
                }
            });
            return;
        }

        if let Err(err) = futures::executor::block_on(sink.log(entry)) {
            eprintln!("LoggerSink error: {}", err);
        }
    }
}

#[derive(Default)]
struct SinkVisitor {
    message: Option<String>,
    fields: HashMap<String, String>,
}

impl SinkVisitor {
    fn record_value(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for SinkVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, format!("{:?}", value));
    }
}

fn tracing_level_to_log_level(level: tracing::Level) -> LogLevel {
    match level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// Redact a field value when its name marks it as a credential.
///
/// Media server API keys travel in headers such as `X-Emby-Token`, so any
/// field whose name mentions a token or key is masked.
///
/// ```ignore
/// use tracing::debug;
/// use core_runtime::logging::redact_if_sensitive;
///
/// debug!(api_key = %redact_if_sensitive("api_key", &key), "Client configured");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const SENSITIVE_FIELDS: &[&str] = &[
        "token",
        "password",
        "secret",
        "api_key",
        "apikey",
        "authorization",
        "bearer",
    ];

    let field_lower = field_name.to_lowercase();
    if SENSITIVE_FIELDS.iter().any(|&f| field_lower.contains(f)) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TestLoggerSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for TestLoggerSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Debug)
            .with_pii_redaction(false)
            .with_filter("core_sync=trace")
            .with_spans(true)
            .with_target(false)
            .with_thread_info(true);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Debug);
        assert!(!config.redact_pii);
        assert_eq!(config.filter, Some("core_sync=trace".to_string()));
        assert!(config.enable_spans);
        assert!(!config.display_target);
        assert!(config.display_thread_info);
    }

    #[test]
    fn test_redact_if_sensitive() {
        assert_eq!(redact_if_sensitive("api_key", "abc123"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("X-Emby-Token", "abc123"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("client_list_id", "p-1"), "p-1");
        assert_eq!(redact_if_sensitive("title", "Road trip"), "Road trip");
    }

    #[test]
    fn test_default_filter_covers_workspace_crates() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        let filter = build_filter(&config).unwrap().to_string();

        for target in WORKSPACE_TARGETS {
            assert!(filter.contains(&format!("{}=debug", target)), "{}", filter);
        }
        assert!(filter.contains("sqlx=warn"));
    }

    #[test]
    fn test_custom_filter_is_used_verbatim() {
        let config = LoggingConfig::default().with_filter("core_sync=trace");
        let filter = build_filter(&config).unwrap();
        assert!(filter.to_string().contains("core_sync=trace"));
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = LoggingConfig::default().with_filter("core_sync=loud");
        assert!(matches!(build_filter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_logger_sink_layer_forwards_and_redacts() {
        let sink = Arc::new(TestLoggerSink::default());
        let trait_sink: Arc<dyn LoggerSink> = sink.clone();
        let subscriber =
            tracing_subscriber::registry().with(LoggerSinkLayer::new(Some(trait_sink), true));
        let _guard = tracing::subscriber::set_default(subscriber);

        tracing::info!(
            target: "core_sync",
            client_id = 42,
            api_key = "hunter2",
            "List pushed"
        );
        tracing::trace!(target: "core_sync", "below sink level");

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.target, "core_sync");
        assert_eq!(entry.message, "List pushed");
        assert_eq!(entry.fields.get("client_id"), Some(&"42".to_string()));
        assert_eq!(entry.fields.get("api_key"), Some(&"[REDACTED]".to_string()));
    }
}
