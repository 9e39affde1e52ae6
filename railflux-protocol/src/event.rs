use chrono::{DateTime, Utc};
use serde_json::Value;

/// The raw instrumentation payload of a lifecycle event.
///
/// Field names and shapes depend on the kind of event and on the host framework.
pub type Payload = serde_json::Map<String, Value>;

/// A lifecycle event fired by the host framework.
#[derive(Clone, Copy, Debug)]
pub struct Event<'a> {
    /// The hook name, e.g. `sql.active_record`.
    pub name: &'a str,
    /// When the instrumented block started.
    pub start: DateTime<Utc>,
    /// When the instrumented block finished.
    pub end: DateTime<Utc>,
    /// Identifies the instrumenter that fired the event.
    pub transaction_id: &'a str,
    /// The event-specific payload.
    pub payload: &'a Payload,
}

impl<'a> Event<'a> {
    /// Returns a string field of the payload.
    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.payload.get(key)?.as_str()
    }

    /// Returns a numeric field of the payload.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.payload.get(key)?.as_f64()
    }

    /// Returns an integer field of the payload.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.payload.get(key)?.as_i64()
    }

    /// Returns a scalar field of the payload formatted as a tag value.
    ///
    /// Strings are returned as-is, numbers and booleans are formatted. Empty strings, `null`,
    /// arrays and objects yield `None`.
    pub fn get_tag(&self, key: &str) -> Option<String> {
        match self.payload.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn payload() -> Payload {
        match json!({
            "controller": "PostsController",
            "status": 200,
            "layout": false,
            "format": "",
            "view_runtime": 12.5,
            "binds": [1, 2],
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_get_tag() {
        let payload = payload();
        let time = Utc.timestamp_opt(0, 0).unwrap();
        let event = Event {
            name: "process_action.action_controller",
            start: time,
            end: time,
            transaction_id: "1",
            payload: &payload,
        };

        assert_eq!(event.get_tag("controller").as_deref(), Some("PostsController"));
        assert_eq!(event.get_tag("status").as_deref(), Some("200"));
        assert_eq!(event.get_tag("layout").as_deref(), Some("false"));
        assert_eq!(event.get_tag("format"), None);
        assert_eq!(event.get_tag("binds"), None);
        assert_eq!(event.get_tag("missing"), None);
        assert_eq!(event.get_f64("view_runtime"), Some(12.5));
        assert_eq!(event.get_i64("status"), Some(200));
    }
}
