use std::fmt;
use std::io::IsTerminal;

use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::config::types::LogFormat;

/// Tracing formatter that prepends colored [CAPTURE]/[DENY] prefixes
/// to log events based on message content, and colorizes known field names.
pub struct PrefixedFormatter<E> {
    inner: E,
    ansi: bool,
}

impl<E> PrefixedFormatter<E> {
    pub fn new(inner: E, ansi: bool) -> Self {
        Self { inner, ansi }
    }
}

impl<S, N, E> FormatEvent<S, N> for PrefixedFormatter<E>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    E: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        if let Some(tag) = prefix_for(&visitor.message.to_lowercase()) {
            if self.ansi {
                write!(writer, "\x1b[{}m[{}]\x1b[0m ", tag.color(), tag.label())?;
            } else {
                write!(writer, "[{}] ", tag.label())?;
            }
        }

        if self.ansi {
            let mut buf = String::new();
            let buf_writer = Writer::new(&mut buf);
            self.inner.format_event(ctx, buf_writer, event)?;
            write!(writer, "{}", colorize_fields(&buf))
        } else {
            self.inner.format_event(ctx, writer, event)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    Capture,
    Deny,
}

impl Prefix {
    fn label(self) -> &'static str {
        match self {
            Prefix::Capture => "CAPTURE",
            Prefix::Deny => "DENY",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Prefix::Capture => "33",
            Prefix::Deny => "31",
        }
    }
}

fn prefix_for(msg: &str) -> Option<Prefix> {
    if is_deny_pattern(msg) {
        Some(Prefix::Deny)
    } else if is_capture_pattern(msg) {
        Some(Prefix::Capture)
    } else {
        None
    }
}

/// Colorize known field names in a log line.
fn colorize_fields(line: &str) -> String {
    let mut result = line.to_string();
    for (field, color) in FIELD_COLORS {
        let pattern = format!(" {}=", field);
        if result.contains(&pattern) {
            let colored = format!(" \x1b[{}m{}=\x1b[0m", color, field);
            result = result.replace(&pattern, &colored);
        }
    }
    result
}

/// Field name → ANSI color code mapping.
const FIELD_COLORS: &[(&str, &str)] = &[
    // cyan (36): attacker-supplied identity and input
    ("user", "36"),
    ("command", "36"),
    // magenta (35): network addresses
    ("peer", "35"),
    ("ip", "35"),
    ("addr", "35"),
    // dim (2): correlation
    ("conn_id", "2"),
    ("trace_id", "2"),
    // green (32): timings
    ("duration_ms", "32"),
    // red (31): errors
    ("error", "31"),
    ("reason", "31"),
];

/// Visitor that extracts the message field from a tracing event.
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn is_deny_pattern(msg: &str) -> bool {
    msg.contains("rate limited")
        || msg.contains("rejected")
        || msg.contains("refused")
        || msg.contains("pool saturated")
        || msg.contains("aborting")
}

fn is_capture_pattern(msg: &str) -> bool {
    msg.contains("credential captured") || msg.contains("command captured")
}

/// Initialize the global tracing subscriber.
///
/// In Pretty mode, wraps the default formatter with `PrefixedFormatter`.
/// JSON mode is unchanged.
pub fn setup_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Pretty => {
            let ansi = std::io::stdout().is_terminal();
            let default_format = tracing_subscriber::fmt::format::Format::default();
            tracing_subscriber::fmt()
                .event_format(PrefixedFormatter::new(default_format, ansi))
                .with_env_filter(filter)
                .init();
        }
    }
}
