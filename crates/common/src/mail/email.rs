use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// An email document, kept exactly as the sender wrote it
///
/// Any JSON value is a valid document. The accessors read the
///  conventional fields of an object document when they hold strings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(Value);

impl Email {
    /// A conventional email stamped with the current time
    pub fn new(from: &str, to: &str, subject: &str, body: &str) -> Self {
        Self(json!({
            "from": from,
            "to": to,
            "subject": subject,
            "body": body,
            "time": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }))
    }

    /// A string field of an object document
    pub fn field(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// The `from` field
    pub fn sender(&self) -> Option<&str> {
        self.field("from")
    }

    pub fn to(&self) -> Option<&str> {
        self.field("to")
    }

    pub fn subject(&self) -> Option<&str> {
        self.field("subject")
    }

    pub fn body(&self) -> Option<&str> {
        self.field("body")
    }

    /// The `time` field, if it is an RFC 3339 timestamp
    pub fn time(&self) -> Option<DateTime<Utc>> {
        let time = self.field("time")?;
        DateTime::parse_from_rfc3339(time)
            .ok()
            .map(|time| time.with_timezone(&Utc))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Email {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// A delivered email together with the entry key it is stored under
#[derive(Clone, Debug, PartialEq)]
pub struct ReceivedEmail {
    pub key: String,
    pub email: Email,
}

/// Outcome of enumerating a mailbox
#[derive(Clone, Debug, Default)]
pub struct ReadReport {
    /// Raw entries in the container, reserved and removed ones included
    pub total_entries: usize,
    /// Emails handed to the callback
    pub delivered: usize,
    /// Entries that could not be opened, with the reason
    pub failures: Vec<(String, String)>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_document_is_kept_verbatim() {
        let documents = [
            json!({"subject": "hi", "time": "2024-05-01T18:30:00.000Z"}),
            json!({"subject": 5, "from": ""}),
            json!({"time": 1714588200, "cc": ["carol"], "priority": null}),
            json!("hello"),
            json!([1, 2, 3]),
        ];
        for document in documents {
            let bytes = serde_json::to_vec(&document).unwrap();
            let email: Email = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(serde_json::to_value(&email).unwrap(), document);
            assert_eq!(email.into_value(), document);
        }
    }

    #[test]
    fn test_accessors() {
        let email = Email::from(json!({
            "from": "alice",
            "subject": 5,
            "time": "2024-05-01T18:30:00.000Z",
        }));
        assert_eq!(email.sender(), Some("alice"));
        assert_eq!(email.subject(), None);
        assert_eq!(email.body(), None);
        assert_eq!(
            email.time().unwrap().to_rfc3339_opts(SecondsFormat::Millis, true),
            "2024-05-01T18:30:00.000Z"
        );
        assert_eq!(Email::from(json!("hello")).subject(), None);
    }

    #[test]
    fn test_new_is_stamped() {
        let email = Email::new("alice", "bob", "hi", "");
        assert_eq!(email.to(), Some("bob"));
        // empty fields stay present
        assert_eq!(email.body(), Some(""));
        assert!(email.time().is_some());
    }
}
