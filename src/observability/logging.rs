//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem from [`LoggingConfig`]
//! - Render every event with a fixed schema: `timestamp`, `level`, `logger`,
//!   `message`, then event and span fields
//! - Mask sensitive fields before anything is written
//!
//! # Design Decisions
//! - Call sites use plain `tracing` macros; rendering lives in [`RecordLayer`]
//! - JSON format for machine parsing, text format for local development;
//!   both carry identical fields
//! - Span fields (the request span's `request_id`) are attached to every
//!   event emitted inside the span
//! - Dotted field names nest: `error.kind` and `error.message` form one
//!   `error` object
//! - Writing a record never fails the caller; write errors go to stderr

use std::io::Write;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::observability::redact::{redact, UNENCODABLE_PREFIX};

const RESERVED_KEYS: &[&str] = &["timestamp", "level", "logger", "message"];

/// Install the global subscriber: `RUST_LOG` when set, else `LOG_LEVEL`.
pub fn init(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    tracing_subscriber::registry()
        .with(filter)
        .with(RecordLayer::new(config.format, std::io::stdout))
        .try_init()
}

/// Route panic reports through `tracing` instead of the default stderr hook.
///
/// Panics caught by the request middleware still reach the hook, so they
/// show up as one structured ERROR record in the configured format.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        log_panic(panic_message(info.payload()), info.location());
    }));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "panic"
    }
}

fn log_panic(message: &str, location: Option<&std::panic::Location<'_>>) {
    let location = location.map(|l| format!("{}:{}", l.file(), l.line()));
    tracing::error!(
        error.kind = "panic",
        error.message = %message,
        location = location.as_deref(),
        "thread panicked"
    );
}

/// A `tracing` layer that renders one record per event.
pub struct RecordLayer<W> {
    format: LogFormat,
    make_writer: W,
}

impl<W> RecordLayer<W>
where
    W: for<'a> MakeWriter<'a> + 'static,
{
    pub fn new(format: LogFormat, make_writer: W) -> Self {
        Self {
            format,
            make_writer,
        }
    }

    fn emit(&self, level: &Level, logger: &str, message: &str, mut fields: Map<String, Value>) {
        let mut nested = Value::Object(std::mem::take(&mut fields));
        redact(&mut nested);
        if let Value::Object(map) = nested {
            fields = map;
        }

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let line = match self.format {
            LogFormat::Json => encode_json(&timestamp, level, logger, message, fields),
            LogFormat::Text => encode_text(&timestamp, level, logger, message, &fields),
        };

        let mut bytes = line.into_bytes();
        bytes.push(b'\n');
        let mut writer = self.make_writer.make_writer();
        if let Err(e) = writer.write_all(&bytes) {
            eprintln!("failed to write log record: {}", e);
        }
    }
}

/// Fields recorded on a span, stored in its extensions.
struct SpanFields(Map<String, Value>);

impl<S, W> Layer<S> for RecordLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        span.extensions_mut().insert(SpanFields(visitor.fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);
        let mut extensions = span.extensions_mut();
        if let Some(SpanFields(fields)) = extensions.get_mut::<SpanFields>() {
            fields.extend(visitor.fields);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = Map::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(SpanFields(span_fields)) = span.extensions().get::<SpanFields>() {
                    fields.extend(span_fields.clone());
                }
            }
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        merge(&mut fields, visitor.fields);

        let metadata = event.metadata();
        let message = visitor.message.unwrap_or_default();
        self.emit(metadata.level(), metadata.target(), &message, fields);

        for dropped in visitor.dropped {
            let mut warning = Map::new();
            warning.insert("field".to_string(), Value::String(dropped.name));
            warning.insert("reason".to_string(), Value::String(dropped.reason));
            warning.insert("original_message".to_string(), Value::String(message.clone()));
            self.emit(
                &Level::WARN,
                module_path!(),
                "log field could not be encoded and was dropped",
                warning,
            );
        }
    }
}

/// A field that could not be encoded.
struct DroppedField {
    name: String,
    reason: String,
}

#[derive(Default)]
struct FieldVisitor {
    fields: Map<String, Value>,
    message: Option<String>,
    dropped: Vec<DroppedField>,
}

impl FieldVisitor {
    fn insert(&mut self, name: &str, value: Value) {
        insert_path(&mut self.fields, name, value);
    }

    fn drop_field(&mut self, name: &str, reason: impl Into<String>) {
        self.dropped.push(DroppedField {
            name: name.to_string(),
            reason: reason.into(),
        });
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        match Number::from_f64(value) {
            Some(number) => self.insert(field.name(), Value::Number(number)),
            None => self.drop_field(field.name(), format!("non-finite number {}", value)),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field.name(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field.name(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field.name(), Value::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field.name(), Value::String(value.to_string()));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(&format!("{}.kind", field.name()), Value::String(error_kind(value)));
        self.insert(&format!("{}.message", field.name()), Value::String(value.to_string()));
        if let Some(source) = value.source() {
            self.insert(&format!("{}.source", field.name()), Value::String(source.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(rendered);
            return;
        }
        if let Some(reason) = rendered.strip_prefix(UNENCODABLE_PREFIX) {
            self.drop_field(field.name(), reason);
            return;
        }
        let value = if rendered.starts_with('{') || rendered.starts_with('[') {
            serde_json::from_str::<Value>(&rendered).unwrap_or(Value::String(rendered))
        } else {
            Value::String(rendered)
        };
        self.insert(field.name(), value);
    }
}

/// Short category for an error value: the `io::ErrorKind` for I/O errors,
/// otherwise the variant or type name leading its `Debug` output.
fn error_kind(error: &(dyn std::error::Error + 'static)) -> String {
    if let Some(io) = error.downcast_ref::<std::io::Error>() {
        return format!("{:?}", io.kind());
    }
    let debug = format!("{:?}", error);
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        "error".to_string()
    } else {
        name
    }
}

/// Insert `value` at a dotted `path`, creating intermediate objects.
fn insert_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                insert_path(inner, rest, value);
            }
        }
    }
}

/// Merge `incoming` into `target`, combining nested objects.
fn merge(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(inner)) => merge(existing, inner),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

fn field_key(key: &str) -> String {
    if RESERVED_KEYS.contains(&key) {
        format!("field_{}", key)
    } else {
        key.to_string()
    }
}

fn encode_json(
    timestamp: &str,
    level: &Level,
    logger: &str,
    message: &str,
    fields: Map<String, Value>,
) -> String {
    let mut record = Map::new();
    record.insert("timestamp".to_string(), Value::String(timestamp.to_string()));
    record.insert("level".to_string(), Value::String(level.as_str().to_string()));
    record.insert("logger".to_string(), Value::String(logger.to_string()));
    record.insert("message".to_string(), Value::String(message.to_string()));
    for (key, value) in fields {
        record.insert(field_key(&key), value);
    }
    Value::Object(record).to_string()
}

fn encode_text(
    timestamp: &str,
    level: &Level,
    logger: &str,
    message: &str,
    fields: &Map<String, Value>,
) -> String {
    let mut line = format!("{} {:>5} {}: {}", timestamp, level.as_str(), logger, message);
    for (key, value) in fields {
        line.push(' ');
        line.push_str(&field_key(key));
        line.push('=');
        match value {
            Value::String(s) if !needs_quoting(s) => line.push_str(s),
            other => line.push_str(&other.to_string()),
        }
    }
    line
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '"' || c == '=')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::redact::{Structured, REDACTION_MARKER};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }

        fn records(&self) -> Vec<Value> {
            self.lines()
                .iter()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    fn capture<F: FnOnce()>(format: LogFormat, f: F) -> Captured {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::registry()
            .with(RecordLayer::new(format, move || writer.clone()));
        tracing::subscriber::with_default(subscriber, f);
        captured
    }

    #[test]
    fn test_json_record_schema() {
        let captured = capture(LogFormat::Json, || {
            tracing::info!(status = 200u16, duration_ms = 1.5, "request completed");
        });

        let records = captured.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["level"], "INFO");
        assert_eq!(record["message"], "request completed");
        assert_eq!(record["status"], 200);
        assert_eq!(record["duration_ms"], 1.5);
        assert!(record["logger"].as_str().unwrap().starts_with("vitals"));

        let timestamp = record["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert!(timestamp.ends_with('Z'));
        assert!(timestamp.contains('.'));
    }

    #[test]
    fn test_span_fields_are_attached() {
        let captured = capture(LogFormat::Json, || {
            let span = tracing::info_span!("request", request_id = "abc-123", method = "GET");
            let _guard = span.enter();
            tracing::warn!(check = "application", "health check failed");
        });

        let record = &captured.records()[0];
        assert_eq!(record["request_id"], "abc-123");
        assert_eq!(record["method"], "GET");
        assert_eq!(record["check"], "application");
        assert_eq!(record["level"], "WARN");
    }

    #[test]
    fn test_sensitive_fields_masked_at_any_depth() {
        let payload = json!({
            "outer": {"API_KEY": "secret123", "list": [{"api_key": "secret123"}]}
        });
        let captured = capture(LogFormat::Json, || {
            tracing::info!(api_key = "secret123", Api_Key = "secret123", "top level");
            tracing::info!(payload = %Structured(&payload), "nested");
        });

        for line in captured.lines() {
            assert!(!line.contains("secret123"), "leaked: {}", line);
        }
        let records = captured.records();
        assert_eq!(records[0]["api_key"], REDACTION_MARKER);
        assert_eq!(records[0]["Api_Key"], REDACTION_MARKER);
        assert_eq!(records[1]["payload"]["outer"]["API_KEY"], REDACTION_MARKER);
        assert_eq!(records[1]["payload"]["outer"]["list"][0]["api_key"], REDACTION_MARKER);
    }

    #[test]
    fn test_dotted_fields_nest() {
        let captured = capture(LogFormat::Json, || {
            tracing::error!(error.kind = "panic", error.message = "boom", "request completed");
        });

        let record = &captured.records()[0];
        assert_eq!(record["error"]["kind"], "panic");
        assert_eq!(record["error"]["message"], "boom");
    }

    #[test]
    fn test_text_format_carries_same_fields() {
        let captured = capture(LogFormat::Text, || {
            tracing::info!(route = "/api/v1/info", token = "abc", note = "two words", "served");
        });

        let lines = captured.lines();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert!(line.contains(" INFO "));
        assert!(line.contains(": served"));
        assert!(line.contains("route=/api/v1/info"));
        assert!(line.contains(&format!("token={}", REDACTION_MARKER)));
        assert!(line.contains(r#"note="two words""#));
    }

    #[test]
    fn test_unencodable_field_dropped_with_warning() {
        let mut bad_keys = HashMap::new();
        bad_keys.insert((1u8, 2u8), "value");

        let captured = capture(LogFormat::Json, || {
            tracing::info!(ratio = f64::NAN, kept = 1u8, "first");
            tracing::info!(payload = %Structured(&bad_keys), "second");
        });

        let records = captured.records();
        assert_eq!(records.len(), 4);

        assert_eq!(records[0]["message"], "first");
        assert!(records[0].get("ratio").is_none());
        assert_eq!(records[0]["kept"], 1);
        assert_eq!(records[1]["level"], "WARN");
        assert_eq!(records[1]["field"], "ratio");
        assert_eq!(records[1]["original_message"], "first");

        assert_eq!(records[2]["message"], "second");
        assert!(records[2].get("payload").is_none());
        assert_eq!(records[3]["field"], "payload");
        assert_eq!(records[3]["original_message"], "second");
    }

    #[test]
    fn test_reserved_keys_do_not_clobber_schema() {
        let captured = capture(LogFormat::Json, || {
            tracing::info!(timestamp = "custom", "hello");
        });

        let record = &captured.records()[0];
        assert_ne!(record["timestamp"], "custom");
        assert_eq!(record["field_timestamp"], "custom");
    }

    #[derive(Debug, thiserror::Error)]
    enum SampleError {
        #[error("address in use")]
        Bind(#[source] std::io::Error),
    }

    #[test]
    fn test_error_values_carry_kind_and_message() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let wrapped = SampleError::Bind(std::io::Error::other("port 8080"));

        let captured = capture(LogFormat::Json, || {
            tracing::error!(error = &io as &(dyn std::error::Error + 'static), "bind failed");
            tracing::error!(
                error = &wrapped as &(dyn std::error::Error + 'static),
                "startup failed"
            );
            tracing::error!(error.kind = "signal", error.message = %io, "handler missing");
        });

        let records = captured.records();
        assert_eq!(records[0]["error"]["kind"], "AddrInUse");
        assert_eq!(records[0]["error"]["message"], "address in use");

        assert_eq!(records[1]["error"]["kind"], "Bind");
        assert_eq!(records[1]["error"]["message"], "address in use");
        assert_eq!(records[1]["error"]["source"], "port 8080");

        assert_eq!(records[2]["error"]["kind"], "signal");
        assert_eq!(records[2]["error"]["message"], "address in use");
    }

    #[test]
    fn test_panic_reports_are_structured() {
        let captured = capture(LogFormat::Json, || {
            log_panic(
                panic_message(&"worker exploded"),
                Some(std::panic::Location::caller()),
            );
            log_panic(panic_message(&String::from("owned")), None);
            log_panic(panic_message(&7u8), None);
        });
        let records = captured.records();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0]["level"], "ERROR");
        assert_eq!(records[0]["message"], "thread panicked");
        assert_eq!(records[0]["error"]["kind"], "panic");
        assert_eq!(records[0]["error"]["message"], "worker exploded");
        assert!(records[0]["location"]
            .as_str()
            .unwrap()
            .contains("logging.rs:"));

        assert_eq!(records[1]["error"]["message"], "owned");
        assert!(records[1].get("location").is_none());
        assert_eq!(records[2]["error"]["message"], "panic");
    }
}
