//! Parsing a frame into a [`Record`].

use crate::{
    config::{DEFAULT_KV_SEPARATOR, DEFAULT_LINE_SEPARATOR},
    record::Record,
};

/// Splits a frame into lines and each line into a key and a value.
///
/// Parsing never fails. A line without the key/value separator, or whose key
/// is blank, is skipped. Keys and values are kept exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldParser {
    line_separator: String,
    kv_separator: String,
}

impl Default for FieldParser {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_SEPARATOR, DEFAULT_KV_SEPARATOR)
    }
}

impl FieldParser {
    /// Create a parser; both separators must be non-empty.
    pub fn new(line_separator: &str, kv_separator: &str) -> Self {
        Self {
            line_separator: line_separator.to_string(),
            kv_separator: kv_separator.to_string(),
        }
    }

    /// Parse one frame. Returns `None` when no line yielded a field.
    pub fn parse(&self, frame: &str) -> Option<Record> {
        let mut record = Record::new();
        for line in frame.split(self.line_separator.as_str()) {
            let Some((key, value)) = line.split_once(self.kv_separator.as_str()) else {
                continue;
            };
            if key.trim().is_empty() {
                continue;
            }
            record.set(key, value);
        }

        if record.is_empty() {
            tracing::trace!(len = frame.len(), "frame has no fields, dropped");
            None
        } else {
            Some(record)
        }
    }
}
