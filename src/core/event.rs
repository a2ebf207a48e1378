//! Event structure

use super::fields::{EventFields, FieldValue};
use super::severity::Severity;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Identifier supplied by the caller for an event.
///
/// Numeric and symbolic identifiers are both accepted; on the wire the id is
/// always a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventId {
    Numeric(i64),
    Symbolic(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Numeric(n) => write!(f, "{}", n),
            EventId::Symbolic(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for EventId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Default for EventId {
    fn default() -> Self {
        EventId::Numeric(0)
    }
}

impl From<i64> for EventId {
    fn from(n: i64) -> Self {
        EventId::Numeric(n)
    }
}

impl From<i32> for EventId {
    fn from(n: i32) -> Self {
        EventId::Numeric(n as i64)
    }
}

impl From<u32> for EventId {
    fn from(n: u32) -> Self {
        EventId::Numeric(n as i64)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        EventId::Symbolic(s.to_string())
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        EventId::Symbolic(s)
    }
}

/// One log occurrence, timestamped when it is handed to the shipper.
///
/// Events are immutable once built; the builder-style methods consume `self`.
#[derive(Debug, Clone)]
pub struct Event {
    timestamp: DateTime<Utc>,
    severity: Severity,
    id: EventId,
    message: String,
    fields: EventFields,
}

impl Event {
    /// Sanitize message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(severity: Severity, id: impl Into<EventId>, message: impl AsRef<str>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            id: id.into(),
            message: Self::sanitize_message(message.as_ref()),
            fields: EventFields::new(),
        }
    }

    pub fn with_fields(mut self, fields: EventFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.add_field(key, value);
        self
    }

    /// Override the enqueue timestamp (replaying events, tests)
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> &EventFields {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_sanitized() {
        let event = Event::new(Severity::Error, 1, "line one\nFAKE line two\tx");
        assert_eq!(event.message(), "line one\\nFAKE line two\\tx");
    }

    #[test]
    fn test_event_id_serializes_as_string() {
        assert_eq!(serde_json::to_string(&EventId::from(123)).unwrap(), "\"123\"");
        assert_eq!(
            serde_json::to_string(&EventId::from("startup")).unwrap(),
            "\"startup\""
        );
    }

    #[test]
    fn test_timestamp_assigned_at_construction() {
        let before = Utc::now().timestamp();
        let event = Event::new(Severity::Information, 1, "info");
        let after = Utc::now().timestamp();
        assert!(event.timestamp().timestamp() >= before);
        assert!(event.timestamp().timestamp() <= after);
    }

    #[test]
    fn test_with_field() {
        let event = Event::new(Severity::Warning, "disk", "almost full")
            .with_field("mount", "/var")
            .with_field("percent", 93);
        assert_eq!(event.fields().len(), 2);
        assert_eq!(event.id(), &EventId::Symbolic("disk".to_string()));
    }
}
