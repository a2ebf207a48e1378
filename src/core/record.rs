//! Wire record format and the event serializer
//!
//! A record is one JSON object accepted by the ingestion endpoint:
//!
//! ```json
//! {"time":"1700000000","index":"main","source":"localhost","sourcetype":"log",
//!  "event":{"id":"123","severity":"Error","message":"Test error","user":"alice"}}
//! ```
//!
//! Unset metadata tags are omitted and caller fields are flattened into `event`.

use super::error::{LoggerError, Result};
use super::event::{Event, EventId};
use super::fields::EventFields;
use super::metadata::MetadataTags;
use super::severity::Severity;
use serde::Serialize;

/// Keys of the `event` object that caller fields may not shadow
pub const RESERVED_EVENT_KEYS: [&str; 3] = ["id", "severity", "message"];

/// Body of the `event` key
#[derive(Debug, Clone, Serialize)]
pub struct RecordEvent<'a> {
    pub id: &'a EventId,
    pub severity: Severity,
    pub message: &'a str,
    #[serde(flatten)]
    pub fields: &'a EventFields,
}

/// One record in wire form, borrowing from its event and tags.
#[derive(Debug, Clone, Serialize)]
pub struct Record<'a> {
    /// Epoch seconds as a decimal string
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sourcetype: Option<&'a str>,
    pub event: RecordEvent<'a>,
}

impl<'a> Record<'a> {
    /// Build the wire record for `event`, rejecting input JSON cannot carry.
    pub fn new(event: &'a Event, tags: &'a MetadataTags) -> Result<Self> {
        for (key, value) in event.fields().iter() {
            if RESERVED_EVENT_KEYS.contains(&key.as_str()) {
                return Err(LoggerError::malformed(format!(
                    "field '{}' collides with a reserved event key",
                    key
                )));
            }
            if !value.is_serializable() {
                return Err(LoggerError::malformed(format!(
                    "field '{}' holds a non-finite number",
                    key
                )));
            }
        }

        Ok(Self {
            time: event.timestamp().timestamp().to_string(),
            index: tags.index.as_deref(),
            source: tags.source.as_deref(),
            sourcetype: tags.sourcetype.as_deref(),
            event: RecordEvent {
                id: event.id(),
                severity: event.severity(),
                message: event.message(),
                fields: event.fields(),
            },
        })
    }
}

/// Serialize one event into its JSON record bytes.
///
/// Pure: the output depends only on the event (including its timestamp) and tags.
pub fn serialize(event: &Event, tags: &MetadataTags) -> Result<Vec<u8>> {
    let record = Record::new(event, tags)?;
    Ok(serde_json::to_vec(&record)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    fn fixed_event() -> Event {
        Event::new(Severity::Error, 123, "Test error")
            .with_timestamp(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
    }

    #[test]
    fn test_full_record_shape() {
        let tags = MetadataTags::new()
            .with_index("main")
            .with_source("localhost")
            .with_sourcetype("log");
        let bytes = serialize(&fixed_event(), &tags).unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["time"], "1700000000");
        assert_eq!(json["index"], "main");
        assert_eq!(json["source"], "localhost");
        assert_eq!(json["sourcetype"], "log");
        assert_eq!(json["event"]["id"], "123");
        assert_eq!(json["event"]["severity"], "Error");
        assert_eq!(json["event"]["message"], "Test error");
    }

    #[test]
    fn test_unset_tags_omitted() {
        let bytes = serialize(&fixed_event(), &MetadataTags::new()).unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        let obj = json.as_object().unwrap();

        assert!(!obj.contains_key("index"));
        assert!(!obj.contains_key("source"));
        assert!(!obj.contains_key("sourcetype"));
        assert!(obj.contains_key("event"));
    }

    #[test]
    fn test_fields_nested_under_event() {
        let event = fixed_event()
            .with_field("user", "alice")
            .with_field("attempt", 3);
        let bytes = serialize(&event, &MetadataTags::new()).unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["event"]["user"], "alice");
        assert_eq!(json["event"]["attempt"], 3);
        assert!(json.get("user").is_none());
    }

    #[test]
    fn test_deterministic_output() {
        let tags = MetadataTags::new().with_index("main");
        let event = fixed_event().with_field("z", 1).with_field("a", 2);
        assert_eq!(
            serialize(&event, &tags).unwrap(),
            serialize(&event, &tags).unwrap()
        );
    }

    #[test]
    fn test_reserved_field_rejected() {
        let event = fixed_event().with_field("message", "shadow");
        let err = serialize(&event, &MetadataTags::new()).unwrap_err();
        assert!(matches!(err, LoggerError::MalformedEvent { .. }));
    }

    #[test]
    fn test_non_finite_field_rejected() {
        let event = fixed_event().with_field("ratio", f64::NAN);
        let err = serialize(&event, &MetadataTags::new()).unwrap_err();
        assert!(matches!(err, LoggerError::MalformedEvent { .. }));
    }
}
