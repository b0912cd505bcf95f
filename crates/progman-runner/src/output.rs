//! Append-only, size-capped session output.

/// Appended once when the cap is reached.
pub const TRUNCATION_MARKER: &str = "\n[output truncated]\n";

/// Raw bytes as produced by the child. Kept as bytes so a UTF-8 sequence
/// split across two reads still decodes once both halves arrive.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    bytes: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new(limit: usize) -> Self {
        OutputBuffer {
            bytes: Vec::new(),
            limit,
            truncated: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if self.truncated {
            return;
        }
        let room = self.limit.saturating_sub(self.bytes.len());
        if chunk.len() <= room {
            self.bytes.extend_from_slice(chunk);
        } else {
            self.bytes.extend_from_slice(&chunk[..room]);
            self.bytes.extend_from_slice(TRUNCATION_MARKER.as_bytes());
            self.truncated = true;
        }
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.truncated = false;
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_utf8_sequences_decode_once_complete() {
        let mut buf = OutputBuffer::new(64);
        let text = "é";
        buf.push(&text.as_bytes()[..1]);
        buf.push(&text.as_bytes()[1..]);
        assert_eq!(buf.text(), "é");
    }

    #[test]
    fn output_beyond_limit_is_dropped_after_marker() {
        let mut buf = OutputBuffer::new(4);
        buf.push(b"abc");
        buf.push(b"defg");
        buf.push(b"more");
        assert!(buf.is_truncated());
        assert_eq!(buf.text(), format!("abcd{TRUNCATION_MARKER}"));

        buf.clear();
        buf.push(b"ok");
        assert_eq!(buf.text(), "ok");
    }
}
