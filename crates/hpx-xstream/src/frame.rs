//! Splitting decoded text into frames.

use std::collections::VecDeque;

use memchr::memmem;

use crate::error::{XStreamError, XStreamResult};

/// Buffers text and cuts it into frames on a separator.
///
/// Splitting always runs over the cumulative buffer, so a separator cut in
/// half by a chunk boundary is still found, and any way of chunking the same
/// text yields the same frames. Frames are emitted as written; whitespace is
/// only trimmed to decide whether a frame is empty.
#[derive(Debug, Clone)]
pub struct FrameSplitter {
    separator: String,
    finder: memmem::Finder<'static>,
    buffer: String,
}

impl FrameSplitter {
    /// Create a splitter for `separator`.
    ///
    /// # Errors
    ///
    /// Returns [`XStreamError::Config`] if `separator` is empty.
    pub fn new(separator: &str) -> XStreamResult<Self> {
        if separator.is_empty() {
            return Err(XStreamError::config("Frame separator cannot be empty"));
        }
        Ok(Self::with_separator(separator))
    }

    fn with_separator(separator: &str) -> Self {
        Self {
            separator: separator.to_string(),
            finder: memmem::Finder::new(separator.as_bytes()).into_owned(),
            buffer: String::new(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Text received after the last complete separator.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Append `chunk` and push every completed, non-blank frame onto `out`.
    ///
    /// Returns the number of frames pushed.
    pub fn push(&mut self, chunk: &str, out: &mut VecDeque<String>) -> usize {
        if chunk.is_empty() {
            return 0;
        }
        let sep_len = self.separator.len();
        // The old buffer held no complete separator, so a match has to end
        // inside the new chunk.
        let scan_from = self.buffer.len().saturating_sub(sep_len - 1);
        self.buffer.push_str(chunk);

        let mut emitted = 0;
        let mut rest = 0;
        for pos in self.finder.find_iter(&self.buffer.as_bytes()[scan_from..]) {
            let end = scan_from + pos;
            let frame = &self.buffer[rest..end];
            if !frame.trim().is_empty() {
                tracing::trace!(len = frame.len(), "frame complete");
                out.push_back(frame.to_string());
                emitted += 1;
            }
            rest = end + sep_len;
        }
        self.buffer.drain(..rest);
        emitted
    }

    /// Take whatever is left at end of input as a final frame, unless blank.
    /// The buffer is empty afterwards either way.
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

impl Default for FrameSplitter {
    fn default() -> Self {
        Self::with_separator(crate::config::DEFAULT_FRAME_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(chunks: &[&str]) -> Vec<String> {
        let mut splitter = FrameSplitter::default();
        let mut out = VecDeque::new();
        for chunk in chunks {
            splitter.push(chunk, &mut out);
        }
        out.extend(splitter.flush());
        out.into()
    }

    #[test]
    fn test_single_chunk_frames() {
        assert_eq!(
            split(&["data: a\n\ndata: b\n\n"]),
            vec!["data: a", "data: b"]
        );
    }

    #[test]
    fn test_chunk_without_separator_only_buffers() {
        let mut splitter = FrameSplitter::default();
        let mut out = VecDeque::new();
        assert_eq!(splitter.push("data: hel", &mut out), 0);
        assert!(out.is_empty());
        assert_eq!(splitter.buffered(), "data: hel");
        assert_eq!(splitter.push("lo\n\n", &mut out), 1);
        assert_eq!(out.pop_front().as_deref(), Some("data: hello"));
        assert_eq!(splitter.buffered(), "");
    }

    #[test]
    fn test_chunk_that_is_exactly_the_separator() {
        let mut splitter = FrameSplitter::default();
        let mut out = VecDeque::new();
        assert_eq!(splitter.push("\n\n", &mut out), 0);
        assert!(out.is_empty());
        assert_eq!(splitter.buffered(), "");
    }

    #[test]
    fn test_separator_split_across_chunks() {
        assert_eq!(split(&["data: a\n", "\ndata: b"]), vec!["data: a", "data: b"]);
        assert_eq!(split(&["data: a\n", "\n", "\n", "data: b\n\n"]), vec![
            "data: a",
            "\ndata: b"
        ]);
    }

    #[test]
    fn test_blank_frames_are_dropped_but_content_is_not_trimmed() {
        assert_eq!(split(&["  \n\n\t\n\n x \n\n"]), vec![" x "]);
    }

    #[test]
    fn test_flush_emits_trailing_frame() {
        let mut splitter = FrameSplitter::default();
        let mut out = VecDeque::new();
        splitter.push("data: a\n\ndata: tail", &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(splitter.flush().as_deref(), Some("data: tail"));
        assert_eq!(splitter.buffered(), "");
        assert_eq!(splitter.flush(), None);
    }

    #[test]
    fn test_flush_drops_blank_tail() {
        let mut splitter = FrameSplitter::default();
        let mut out = VecDeque::new();
        splitter.push("data: a\n\n \n", &mut out);
        assert_eq!(splitter.flush(), None);
        assert_eq!(splitter.buffered(), "");
    }

    #[test]
    fn test_custom_separator() {
        let mut splitter = FrameSplitter::new("\r\n\r\n").expect("separator");
        let mut out = VecDeque::new();
        splitter.push("a\r\n\r", &mut out);
        splitter.push("\nb\r\n\r\n", &mut out);
        assert_eq!(Vec::from(out), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_separator_rejected() {
        let err = FrameSplitter::new("").expect_err("empty separator");
        assert!(matches!(err, XStreamError::Config { .. }));
        assert!(err.to_string().contains("Frame separator cannot be empty"));
    }

    #[test]
    fn test_multibyte_text_around_separator() {
        assert_eq!(split(&["données: é\n", "\n€"]), vec!["données: é", "€"]);
    }

    #[test]
    fn test_chunking_does_not_change_frames() {
        let text = "event: a\ndata: 1\n\n\n\ndata: 2\n\n\n: x\n\ndata: tail";
        let whole = split(&[text]);
        for cut in 0..=text.len() {
            if !text.is_char_boundary(cut) {
                continue;
            }
            let (head, tail) = text.split_at(cut);
            assert_eq!(split(&[head, tail]), whole, "cut at {cut}");
        }
        let by_char: Vec<String> = text.chars().map(String::from).collect();
        let by_char: Vec<&str> = by_char.iter().map(String::as_str).collect();
        assert_eq!(split(&by_char), whole);
    }
}
