use std::fmt;

// Newline framing for the upstream TCP byte stream.
//
// Bytes are buffered (not decoded per read) so a multi-byte character split across two
// reads is reassembled before decoding.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    // A single line (complete or still buffered) exceeded the configured cap.
    LineTooLong { len: usize, max: usize },
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingError::LineTooLong { len, max } => {
                write!(f, "line of {len} bytes exceeds limit of {max} bytes")
            }
        }
    }
}

impl std::error::Error for FramingError {}

/// Accumulates TCP reads and yields complete, non-blank lines.
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    max_line_bytes: usize,
}

impl LineFramer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line_bytes,
        }
    }

    /// Appends a chunk and returns every line it completed, in order.
    ///
    /// Whitespace-only lines are consumed but never returned. The trailing segment after the
    /// last `\n` stays buffered for the next call. Once this returns an error the framer should
    /// be discarded along with its connection.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, FramingError> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let segment = &self.buffer[start..end];
            if segment.len() > self.max_line_bytes {
                return Err(FramingError::LineTooLong {
                    len: segment.len(),
                    max: self.max_line_bytes,
                });
            }

            let line = String::from_utf8_lossy(segment);
            if !line.trim().is_empty() {
                lines.push(line.into_owned());
            }
            start = end + 1;
        }

        self.buffer.drain(..start);
        if self.buffer.len() > self.max_line_bytes {
            return Err(FramingError::LineTooLong {
                len: self.buffer.len(),
                max: self.max_line_bytes,
            });
        }

        Ok(lines)
    }

    // Bytes waiting for their terminating newline.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}
