//! Incremental UTF-8 decoding of byte chunks.

use core::char::REPLACEMENT_CHARACTER;

use bytes::{Buf, BytesMut};

/// Byte order mark as char.
const BOM_CHAR: char = '\u{FEFF}';
const BOM_LEN: usize = BOM_CHAR.len_utf8();
/// Byte representation of the BOM [`char`].
const BOM: &[u8; BOM_LEN] = &{
    let mut buf = [0u8; BOM_LEN];
    BOM_CHAR.encode_utf8(&mut buf);
    buf
};

/// `None` while the buffer is still a proper prefix of the BOM.
fn starts_with_bom(buf: &[u8]) -> Option<bool> {
    let n = buf.len().min(BOM_LEN);
    if buf[..n] != BOM[..n] {
        Some(false)
    } else if n == BOM_LEN {
        Some(true)
    } else {
        None
    }
}

/// Stateful UTF-8 decoder.
///
/// Holds back an incomplete multi-byte sequence at the end of a chunk until
/// the rest of it arrives. Invalid sequences become U+FFFD, one per maximal
/// invalid subpart, so the output does not depend on where the input was cut.
#[derive(Debug)]
pub struct Utf8Decoder {
    pending: BytesMut,
    detect_bom: bool,
}

impl Default for Utf8Decoder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Utf8Decoder {
    /// Create a decoder. With `strip_bom`, a leading byte order mark is
    /// dropped even when it is split across chunks.
    pub fn new(strip_bom: bool) -> Self {
        Self {
            pending: BytesMut::new(),
            detect_bom: strip_bom,
        }
    }

    /// Number of bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Decode the next chunk, returning every complete character.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        if self.detect_bom {
            match starts_with_bom(&self.pending) {
                Some(true) => {
                    self.detect_bom = false;
                    self.pending.advance(BOM_LEN);
                }
                Some(false) => self.detect_bom = false,
                None => return String::new(),
            }
        }

        let mut out = String::with_capacity(self.pending.len());
        let mut start = 0;
        loop {
            match core::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    // Safety: `valid_up_to` marks the end of the valid prefix.
                    out.push_str(unsafe {
                        core::str::from_utf8_unchecked(&self.pending[start..valid_end])
                    });
                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // Truncated sequence at the end: keep it for the next chunk.
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.advance(start);
        out
    }

    /// Flush the decoder at end of input. A truncated trailing sequence is
    /// replaced with U+FFFD.
    pub fn finish(&mut self) -> String {
        self.detect_bom = false;
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }
}
