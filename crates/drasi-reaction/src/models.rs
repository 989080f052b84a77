//! Event model for reactions
//!
//! These types mirror the wire format produced by the query container's
//! result publisher: camelCase keys, a `kind` discriminator on the event
//! object, and `{"kind": ...}`-tagged control signals. Unknown fields are
//! ignored so reactions keep working as the publisher grows.

use std::fmt;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One incremental result-set delta for a query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Query that produced this delta
    pub query_id: String,

    /// Publisher sequence, monotonically increasing per query. Ordering
    /// across concurrent deliveries is the callback's concern.
    pub sequence: u64,

    /// Source change time, milliseconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_time_ms: Option<u64>,

    /// Result records added by this delta
    #[serde(default)]
    pub added_results: Vec<Map<String, Value>>,

    /// Result records updated by this delta
    #[serde(default)]
    pub updated_results: Vec<UpdatedResult>,

    /// Result records deleted by this delta
    #[serde(default)]
    pub deleted_results: Vec<Map<String, Value>>,

    /// Free-form event metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Before/after pair for one updated result record.
///
/// The publisher keeps these keys snake_case, including `grouping_keys`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdatedResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Map<String, Value>>,

    /// Keys identifying the grouped row this update applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping_keys: Option<Vec<String>>,
}

/// A lifecycle signal for a query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlEvent {
    /// Query the signal applies to
    pub query_id: String,

    /// Publisher sequence; control events share the change-event counter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_time_ms: Option<u64>,

    /// The signal itself
    pub control_signal: ControlSignal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Control signals published over a query's result topic.
///
/// The set is open: a signal this SDK version does not recognize
/// deserializes as [`ControlSignal::Unknown`] rather than failing. Both the
/// publisher's tagged object form (`{"kind": "running"}`) and a bare string
/// (`"running"`) are accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlSignal {
    /// The query has started bootstrapping its initial result set
    BootstrapStarted,
    /// Bootstrap finished; deltas now follow
    BootstrapCompleted,
    /// The query is running
    Running,
    /// The query was stopped
    Stopped,
    /// The query was deleted
    Deleted,
    /// A signal introduced by a newer publisher, carried through as-is
    Unknown(Value),
}

impl ControlSignal {
    /// Wire name of the signal, when recognized
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            ControlSignal::BootstrapStarted => Some("bootstrapStarted"),
            ControlSignal::BootstrapCompleted => Some("bootstrapCompleted"),
            ControlSignal::Running => Some("running"),
            ControlSignal::Stopped => Some("stopped"),
            ControlSignal::Deleted => Some("deleted"),
            ControlSignal::Unknown(_) => None,
        }
    }

    fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "bootstrapStarted" => Some(ControlSignal::BootstrapStarted),
            "bootstrapCompleted" => Some(ControlSignal::BootstrapCompleted),
            "running" => Some(ControlSignal::Running),
            "stopped" => Some(ControlSignal::Stopped),
            "deleted" => Some(ControlSignal::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlSignal::Unknown(value) => write!(f, "{}", value),
            recognized => f.write_str(recognized.as_str().unwrap_or("unknown")),
        }
    }
}

impl Serialize for ControlSignal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ControlSignal::Unknown(value) => value.serialize(serializer),
            recognized => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("kind", recognized.as_str().unwrap_or("unknown"))?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ControlSignal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let kind = match &value {
            Value::String(kind) => Some(kind.clone()),
            Value::Object(map) => map.get("kind").and_then(Value::as_str).map(str::to_string),
            _ => None,
        };
        Ok(kind
            .and_then(|kind| ControlSignal::from_kind(&kind))
            .unwrap_or(ControlSignal::Unknown(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_event_deserializes_the_publisher_payload() {
        let payload = json!({
            "kind": "change",
            "queryId": "room-comfort",
            "sequence": 42,
            "sourceTimeMs": 1_698_000_000_000u64,
            "addedResults": [{"roomId": "r1", "comfortLevel": 44}],
            "updatedResults": [{
                "before": {"roomId": "r2", "comfortLevel": 40},
                "after": {"roomId": "r2", "comfortLevel": 50},
                "grouping_keys": ["roomId"]
            }],
            "deletedResults": [],
            "metadata": {"tracking": {"sourceSeq": 7}}
        });

        let event: ChangeEvent = serde_json::from_value(payload).unwrap();
        assert_eq!(event.query_id, "room-comfort");
        assert_eq!(event.sequence, 42);
        assert_eq!(event.source_time_ms, Some(1_698_000_000_000));
        assert_eq!(event.added_results.len(), 1);
        assert_eq!(event.added_results[0]["comfortLevel"], json!(44));
        let update = &event.updated_results[0];
        assert_eq!(
            update.grouping_keys.as_deref(),
            Some(&["roomId".to_string()][..])
        );
        assert!(update.before.is_some());
        assert!(event.deleted_results.is_empty());
        assert!(event.metadata.is_some());
    }

    #[test]
    fn change_event_defaults_absent_result_arrays() {
        let event: ChangeEvent =
            serde_json::from_value(json!({"queryId": "q", "sequence": 1})).unwrap();
        assert!(event.added_results.is_empty());
        assert!(event.updated_results.is_empty());
        assert!(event.deleted_results.is_empty());
        assert_eq!(event.source_time_ms, None);
        assert_eq!(event.metadata, None);
    }

    #[test]
    fn change_event_requires_a_sequence() {
        let result = serde_json::from_value::<ChangeEvent>(json!({"queryId": "q"}));
        assert!(result.is_err());
    }

    #[test]
    fn control_signal_accepts_object_and_string_forms() {
        let signal: ControlSignal = serde_json::from_value(json!({"kind": "running"})).unwrap();
        assert_eq!(signal, ControlSignal::Running);

        let signal: ControlSignal = serde_json::from_value(json!("stopped")).unwrap();
        assert_eq!(signal, ControlSignal::Stopped);
    }

    #[test]
    fn unrecognized_control_signals_pass_through() {
        let raw = json!({"kind": "paused", "reason": "maintenance"});
        let signal: ControlSignal = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(signal, ControlSignal::Unknown(raw.clone()));
        assert_eq!(serde_json::to_value(&signal).unwrap(), raw);
    }

    #[test]
    fn recognized_control_signals_serialize_tagged() {
        let value = serde_json::to_value(ControlSignal::BootstrapCompleted).unwrap();
        assert_eq!(value, json!({"kind": "bootstrapCompleted"}));
    }

    #[test]
    fn control_event_deserializes_the_publisher_payload() {
        let event: ControlEvent = serde_json::from_value(json!({
            "kind": "control",
            "queryId": "room-comfort",
            "sequence": 43,
            "sourceTimeMs": 1_698_000_000_500u64,
            "controlSignal": {"kind": "bootstrapStarted"}
        }))
        .unwrap();
        assert_eq!(event.query_id, "room-comfort");
        assert_eq!(event.sequence, Some(43));
        assert_eq!(event.control_signal, ControlSignal::BootstrapStarted);
    }

    #[test]
    fn control_signal_display_uses_the_wire_name() {
        assert_eq!(ControlSignal::Deleted.to_string(), "deleted");
        assert_eq!(
            ControlSignal::Unknown(json!({"kind": "paused"})).to_string(),
            r#"{"kind":"paused"}"#
        );
    }
}
