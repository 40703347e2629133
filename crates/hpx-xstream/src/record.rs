//! Parsed key/value records.

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Field names with a dedicated slot in a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldName {
    Data,
    Event,
    Id,
    Retry,
}

impl FieldName {
    /// All recognized field names, in the order [`Record::iter`] visits them.
    pub const ALL: [FieldName; 4] = [Self::Data, Self::Event, Self::Id, Self::Retry];

    /// Match a raw key against the recognized names. Matching is exact:
    /// `" data"` is not `data`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "data" => Some(Self::Data),
            "event" => Some(Self::Event),
            "id" => Some(Self::Id),
            "retry" => Some(Self::Retry),
            _ => None,
        }
    }

    /// The wire name of this field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Event => "event",
            Self::Id => "id",
            Self::Retry => "retry",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed frame.
///
/// The four SSE fields have their own slots; any other key is kept verbatim in
/// [`extra`](Self::extra). Values are stored exactly as they appeared after
/// the key/value separator, so `data: x` yields `" x"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retry: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, String>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, name: FieldName) -> &mut Option<String> {
        match name {
            FieldName::Data => &mut self.data,
            FieldName::Event => &mut self.event,
            FieldName::Id => &mut self.id,
            FieldName::Retry => &mut self.retry,
        }
    }

    /// Set `key` to `value`, replacing any previous value for that key.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        match FieldName::from_key(key) {
            Some(name) => *self.slot_mut(name) = Some(value.into()),
            None => {
                self.extra.insert(key.to_string(), value.into());
            }
        }
    }

    /// Look up any key, recognized or not.
    pub fn get(&self, key: &str) -> Option<&str> {
        match FieldName::from_key(key) {
            Some(name) => self.field(name),
            None => self.extra.get(key).map(String::as_str),
        }
    }

    /// Look up a recognized field.
    pub fn field(&self, name: FieldName) -> Option<&str> {
        match name {
            FieldName::Data => self.data.as_deref(),
            FieldName::Event => self.event.as_deref(),
            FieldName::Id => self.id.as_deref(),
            FieldName::Retry => self.retry.as_deref(),
        }
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn retry(&self) -> Option<&str> {
        self.retry.as_deref()
    }

    /// The `retry` field read as a millisecond count, if it is one.
    ///
    /// Surrounding whitespace is ignored, so `retry: 3000` parses.
    pub fn retry_duration(&self) -> Option<Duration> {
        self.retry
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
    }

    /// Keys outside the recognized set.
    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        FieldName::ALL
            .iter()
            .filter(|name| self.field(**name).is_some())
            .count()
            + self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over `(key, value)` pairs: recognized fields first, then the
    /// extra keys in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        FieldName::ALL
            .into_iter()
            .filter_map(|name| self.field(name).map(|value| (name.as_str(), value)))
            .chain(
                self.extra
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            )
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.set(key.as_ref(), value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_name_round_trip() {
        for name in FieldName::ALL {
            assert_eq!(FieldName::from_key(name.as_str()), Some(name));
            assert_eq!(name.to_string(), name.as_str());
        }
        assert_eq!(FieldName::from_key(" data"), None);
        assert_eq!(FieldName::from_key("Data"), None);
    }

    #[test]
    fn test_set_routes_recognized_and_extra_keys() {
        let mut record = Record::new();
        record.set("data", " hello");
        record.set("custom", "x");
        record.set(" id", "padded");

        assert_eq!(record.data(), Some(" hello"));
        assert_eq!(record.get("custom"), Some("x"));
        assert_eq!(record.get(" id"), Some("padded"));
        assert_eq!(record.id(), None);
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_last_write_wins() {
        let record: Record = [("event", "a"), ("event", "b"), ("k", "1"), ("k", "2")]
            .into_iter()
            .collect();
        assert_eq!(record.event(), Some("b"));
        assert_eq!(record.get("k"), Some("2"));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_iter_order() {
        let record: Record = [("zeta", "1"), ("retry", "5"), ("data", "d"), ("alpha", "2")]
            .into_iter()
            .collect();
        let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["data", "retry", "alpha", "zeta"]);
    }

    #[test]
    fn test_retry_duration() {
        let record: Record = [("retry", " 3000")].into_iter().collect();
        assert_eq!(record.retry_duration(), Some(Duration::from_millis(3000)));

        let record: Record = [("retry", "soon")].into_iter().collect();
        assert_eq!(record.retry_duration(), None);
        assert!(Record::new().retry_duration().is_none());
    }

    #[test]
    fn test_serialize_flat_object() {
        let record: Record = [("data", " hi"), ("event", "ping"), ("x-trace", "7")]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "data": " hi", "event": "ping", "x-trace": "7" })
        );

        let back: Record = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, record);
    }

    #[test]
    fn test_empty_record() {
        let record = Record::new();
        assert!(record.is_empty());
        assert_eq!(record.iter().count(), 0);
    }
}
