//! Stream parsing configuration.

/// Default separator between two frames (a blank line).
pub const DEFAULT_FRAME_SEPARATOR: &str = "\n\n";
/// Default separator between two field lines inside a frame.
pub const DEFAULT_LINE_SEPARATOR: &str = "\n";
/// Default separator between a field key and its value.
pub const DEFAULT_KV_SEPARATOR: &str = ":";

/// Configuration for the default frame splitter and field parser.
///
/// Follows the same builder pattern as the SSE connection config: sensible
/// defaults and chainable setters, checked by [`validate`](Self::validate)
/// when a stream is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XStreamConfig {
    /// Separator between frames.
    pub frame_separator: String,
    /// Separator between lines of a frame.
    pub line_separator: String,
    /// Separator between a key and its value on one line.
    pub kv_separator: String,
    /// Drop a UTF-8 byte order mark at the very start of the stream.
    pub strip_bom: bool,
}

impl Default for XStreamConfig {
    fn default() -> Self {
        Self {
            frame_separator: DEFAULT_FRAME_SEPARATOR.to_string(),
            line_separator: DEFAULT_LINE_SEPARATOR.to_string(),
            kv_separator: DEFAULT_KV_SEPARATOR.to_string(),
            strip_bom: true,
        }
    }
}

impl XStreamConfig {
    /// Create a configuration with the SSE defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the frame separator.
    #[must_use]
    pub fn frame_separator(mut self, separator: impl Into<String>) -> Self {
        self.frame_separator = separator.into();
        self
    }

    /// Set the line separator.
    #[must_use]
    pub fn line_separator(mut self, separator: impl Into<String>) -> Self {
        self.line_separator = separator.into();
        self
    }

    /// Set the key/value separator.
    #[must_use]
    pub fn kv_separator(mut self, separator: impl Into<String>) -> Self {
        self.kv_separator = separator.into();
        self
    }

    /// Set whether a leading byte order mark is dropped.
    #[must_use]
    pub fn strip_bom(mut self, strip: bool) -> Self {
        self.strip_bom = strip;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message string if any separator is empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_separator.is_empty() {
            return Err("Frame separator cannot be empty".to_string());
        }
        if self.line_separator.is_empty() {
            return Err("Line separator cannot be empty".to_string());
        }
        if self.kv_separator.is_empty() {
            return Err("Key/value separator cannot be empty".to_string());
        }
        Ok(())
    }
}
