//! Logging sink abstraction used by the request middleware.
//!
//! Middleware never calls `tracing` macros directly. It builds a [`LogRecord`]
//! and hands it to an injected [`LogSink`], which lets the production path
//! forward to `tracing` while tests capture records in memory.

use std::fmt;
use std::panic::Location;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};
use tracing::field;

/// Severity of a [`LogRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Stream a record belongs to. Each one logs under its own `tracing` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// One record per completed request.
    Access,
    /// Diagnostics for recovered faults.
    Recovery,
}

const ACCESS_TARGET: &str = "request_recovery::access";
const RECOVERY_TARGET: &str = "request_recovery::recovery";

/// Value of a structured field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Uint(u64),
    Duration(Duration),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::Uint(n) => Some(*n),
            FieldValue::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            FieldValue::Duration(d) => Some(*d),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::Int(n) => Value::from(*n),
            FieldValue::Uint(n) => Value::from(*n),
            FieldValue::Duration(d) => Value::String(format!("{:?}", d)),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Int(n) => write!(f, "{}", n),
            FieldValue::Uint(n) => write!(f, "{}", n),
            FieldValue::Duration(d) => write!(f, "{:?}", d),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        FieldValue::Uint(value.into())
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Uint(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<Duration> for FieldValue {
    fn from(value: Duration) -> Self {
        FieldValue::Duration(value)
    }
}

/// An immutable structured log event.
///
/// Fields keep insertion order so console output lists them the way the
/// emitter added them.
#[derive(Debug, Clone)]
pub struct LogRecord {
    severity: Severity,
    channel: Channel,
    message: String,
    fields: Vec<(&'static str, FieldValue)>,
    timestamp: SystemTime,
    caller: &'static Location<'static>,
}

impl LogRecord {
    /// A record on the access channel. The caller's source location is
    /// kept so sinks can report where the record was built.
    #[track_caller]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            channel: Channel::Access,
            message: message.into(),
            fields: Vec::new(),
            timestamp: SystemTime::now(),
            caller: Location::caller(),
        }
    }

    pub fn in_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Append a field. A later field with the same name shadows the earlier one.
    pub fn with_field(mut self, name: &'static str, value: impl Into<FieldValue>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn caller(&self) -> &'static Location<'static> {
        self.caller
    }

    pub fn fields(&self) -> &[(&'static str, FieldValue)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .rev()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Render the fields not named in `skip` as a JSON object, or `None`
    /// when nothing is left.
    pub fn fields_json_without(&self, skip: &[&str]) -> Option<String> {
        let mut map = Map::new();
        for (key, value) in &self.fields {
            if !skip.contains(key) {
                map.insert((*key).to_string(), value.to_json());
            }
        }
        (!map.is_empty()).then(|| Value::Object(map).to_string())
    }
}

/// Destination for [`LogRecord`]s.
///
/// Implementations are shared by every in-flight request and must accept
/// concurrent calls. One `emit` call is one atomic record.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: LogRecord);
}

/// Sink handle injected into middleware state.
pub type SharedSink = Arc<dyn LogSink>;

/// Fields the middleware emits, forwarded to `tracing` as native fields.
const NATIVE_FIELDS: [&str; 11] = [
    "status",
    "method",
    "path",
    "query",
    "ip",
    "user-agent",
    "errors",
    "cost",
    "error",
    "request",
    "stack",
];

/// Forwards records to the installed `tracing` subscriber.
///
/// Known fields become native event fields. Anything else is collected
/// into one JSON `fields` attribute. `caller` is where the record was
/// built, not this module.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn shared() -> SharedSink {
        Arc::new(TracingSink)
    }
}

fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn text<'a>(record: &'a LogRecord, name: &str) -> Option<field::DisplayValue<&'a FieldValue>> {
    record.field(name).map(field::display)
}

macro_rules! forward {
    ($target:expr, $level:expr, $record:expr) => {{
        let record = $record;
        let extra = record.fields_json_without(&NATIVE_FIELDS);
        tracing::event!(
            target: $target,
            $level,
            caller = %record.caller(),
            ts_ms = unix_millis(record.timestamp()),
            status = record.field("status").and_then(FieldValue::as_u64),
            method = text(record, "method"),
            path = text(record, "path"),
            query = text(record, "query"),
            ip = text(record, "ip"),
            "user-agent" = text(record, "user-agent"),
            errors = text(record, "errors"),
            cost = record.field("cost").and_then(FieldValue::as_duration).map(field::debug),
            error = text(record, "error"),
            request = text(record, "request"),
            stack = text(record, "stack"),
            fields = extra.as_deref().map(field::display),
            "{}",
            record.message()
        )
    }};
}

impl LogSink for TracingSink {
    fn emit(&self, record: LogRecord) {
        use tracing::Level;

        let record = &record;
        match (record.channel(), record.severity()) {
            (Channel::Access, Severity::Debug) => forward!(ACCESS_TARGET, Level::DEBUG, record),
            (Channel::Access, Severity::Info) => forward!(ACCESS_TARGET, Level::INFO, record),
            (Channel::Access, Severity::Warn) => forward!(ACCESS_TARGET, Level::WARN, record),
            (Channel::Access, Severity::Error) => forward!(ACCESS_TARGET, Level::ERROR, record),
            (Channel::Recovery, Severity::Debug) => {
                forward!(RECOVERY_TARGET, Level::DEBUG, record)
            }
            (Channel::Recovery, Severity::Info) => forward!(RECOVERY_TARGET, Level::INFO, record),
            (Channel::Recovery, Severity::Warn) => forward!(RECOVERY_TARGET, Level::WARN, record),
            (Channel::Recovery, Severity::Error) => {
                forward!(RECOVERY_TARGET, Level::ERROR, record)
            }
        }
    }
}

/// Keeps every record in memory. Used by tests and local debugging.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of the records emitted so far, in emission order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.severity() == severity)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_field_order() {
        let record = LogRecord::new(Severity::Info, "/1")
            .with_field("status", 200u16)
            .with_field("method", "GET")
            .with_field("cost", Duration::from_millis(3));

        let names: Vec<_> = record.fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["status", "method", "cost"]);
        assert_eq!(record.field("status").and_then(FieldValue::as_u64), Some(200));
        assert_eq!(record.field("method").and_then(FieldValue::as_str), Some("GET"));
        assert!(record.field("missing").is_none());
    }

    #[test]
    fn unlisted_fields_render_as_json_object() {
        let record = LogRecord::new(Severity::Error, "recovered from panic")
            .with_field("error", "1111")
            .with_field("status", 500u16)
            .with_field("attempt", 2i64);

        let extra = record.fields_json_without(&NATIVE_FIELDS).unwrap();
        let parsed: Value = serde_json::from_str(&extra).unwrap();
        assert_eq!(parsed["attempt"], 2);
        assert!(parsed.get("error").is_none());
        assert!(parsed.get("status").is_none());

        let native_only = LogRecord::new(Severity::Info, "/1").with_field("status", 200u16);
        assert!(native_only.fields_json_without(&NATIVE_FIELDS).is_none());
    }

    #[test]
    fn record_remembers_where_it_was_built() {
        let line = line!() + 1;
        let record = LogRecord::new(Severity::Info, "/1");
        assert_eq!(record.caller().file(), file!());
        assert_eq!(record.caller().line(), line);
        assert_eq!(record.channel(), Channel::Access);

        let record = record.in_channel(Channel::Recovery);
        assert_eq!(record.channel(), Channel::Recovery);
        assert!(unix_millis(record.timestamp()) > 0);
    }

    #[test]
    fn memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.emit(LogRecord::new(Severity::Error, "first"));
        sink.emit(LogRecord::new(Severity::Info, "second"));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message(), "first");
        assert_eq!(records[1].message(), "second");
        assert_eq!(sink.with_severity(Severity::Info).len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn memory_sink_accepts_concurrent_writers() {
        let sink = MemorySink::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        sink.emit(LogRecord::new(Severity::Debug, format!("t{}", i)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.len(), 400);
    }
}
