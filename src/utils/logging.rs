//! Logging setup and log capture
//!
//! Besides the usual stderr subscriber, a [`LogCaptureLayer`] can record
//! every event into a shared [`LogBuffer`]. The frame emitter drains that
//! buffer into each frame's `logs` section.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub const LOG_QUIET: i32 = -8;
pub const LOG_PANIC: i32 = 0;
pub const LOG_FATAL: i32 = 8;
pub const LOG_ERROR: i32 = 16;
pub const LOG_WARNING: i32 = 24;
pub const LOG_INFO: i32 = 32;
pub const LOG_VERBOSE: i32 = 40;
pub const LOG_DEBUG: i32 = 48;
pub const LOG_TRACE: i32 = 56;

const LEVEL_NAMES: [(&str, i32); 9] = [
    ("quiet", LOG_QUIET),
    ("panic", LOG_PANIC),
    ("fatal", LOG_FATAL),
    ("error", LOG_ERROR),
    ("warning", LOG_WARNING),
    ("info", LOG_INFO),
    ("verbose", LOG_VERBOSE),
    ("debug", LOG_DEBUG),
    ("trace", LOG_TRACE),
];

/// Numeric level of a tracing level
pub fn numeric_level(level: &Level) -> i32 {
    match *level {
        Level::ERROR => LOG_ERROR,
        Level::WARN => LOG_WARNING,
        Level::INFO => LOG_INFO,
        Level::DEBUG => LOG_DEBUG,
        Level::TRACE => LOG_TRACE,
    }
}

/// Parse a log threshold given as a level name or a number
pub fn parse_log_threshold(value: &str) -> Result<i32, String> {
    let value = value.trim();
    if let Some((_, level)) = LEVEL_NAMES.iter().find(|(name, _)| *name == value) {
        return Ok(*level);
    }
    value.parse::<i32>().map_err(|_| {
        let names: Vec<&str> = LEVEL_NAMES.iter().map(|(name, _)| *name).collect();
        format!(
            "invalid log level '{}', expected a number or one of {}",
            value,
            names.join(", ")
        )
    })
}

/// One captured log message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub context: String,
    pub level: i32,
    pub category: i32,
    pub parent_context: Option<String>,
    pub parent_category: Option<i32>,
    pub message: String,
}

/// Shared buffer of captured log entries
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, entry: LogEntry) {
        self.lock().push(entry);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Take every entry, leaving the buffer empty
    pub fn drain(&self) -> Vec<LogEntry> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Layer recording events into a [`LogBuffer`].
///
/// The `context`, `category`, `parent_context` and `parent_category` event
/// fields are picked up when present; the context defaults to the event
/// target.
#[derive(Debug, Clone)]
pub struct LogCaptureLayer {
    buffer: LogBuffer,
}

impl LogCaptureLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

#[derive(Default)]
struct EntryVisitor {
    message: String,
    context: Option<String>,
    category: Option<i32>,
    parent_context: Option<String>,
    parent_category: Option<i32>,
}

impl Visit for EntryVisitor {
    fn record_i64(&mut self, field: &Field, value: i64) {
        match field.name() {
            "category" => self.category = i32::try_from(value).ok(),
            "parent_category" => self.parent_category = i32::try_from(value).ok(),
            _ => self.record_debug(field, &value),
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_i64(field, i64::try_from(value).unwrap_or(i64::MAX));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "context" => self.context = Some(value.to_string()),
            "parent_context" => self.parent_context = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            _ => self.record_debug(field, &value),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        use std::fmt::Write;
        match field.name() {
            "message" => {
                let _ = write!(self.message, "{:?}", value);
            }
            "context" => self.context = Some(format!("{:?}", value)),
            "parent_context" => self.parent_context = Some(format!("{:?}", value)),
            name => {
                if !self.message.is_empty() {
                    self.message.push(' ');
                }
                let _ = write!(self.message, "{}={:?}", name, value);
            }
        }
    }
}

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        let message = visitor.message.trim_end_matches('\n').to_string();
        self.buffer.push(LogEntry {
            context: visitor
                .context
                .unwrap_or_else(|| metadata.target().to_string()),
            level: numeric_level(metadata.level()),
            category: visitor.category.unwrap_or(0),
            parent_category: visitor
                .parent_context
                .as_ref()
                .map(|_| visitor.parent_category.unwrap_or(0)),
            parent_context: visitor.parent_context,
            message,
        });
    }
}

/// Diagnostic output format on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global subscriber: formatted output on stderr filtered by
/// `RUST_LOG` or `log_level`, plus log capture into `capture` when given
pub fn init_logging(log_level: &str, format: LogFormat, capture: Option<LogBuffer>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let _ = tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .with(capture.map(LogCaptureLayer::new))
        .try_init();
}
