//! Output buffer with tail-limited prompt search.
//!
//! Prompt and question patterns only ever appear near the end of the
//! stream, so searches are limited to the last `search_depth` bytes.
//! Large outputs (full routing tables) stay cheap to scan.

use super::patterns::PromptMatcher;

/// Buffer accumulating session output between prompt matches.
///
/// ANSI escape sequences are stripped on ingest so patterns match what
/// a human would see on the terminal.
#[derive(Debug)]
pub struct PatternBuffer {
    buffer: Vec<u8>,

    /// Bytes from the end considered by tail searches.
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a buffer searching the last `search_depth` bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
        }
    }

    /// Append raw session output, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Whether `matcher` matches within the tail window.
    pub fn tail_matches(&self, matcher: &dyn PromptMatcher) -> bool {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        matcher.is_match(&self.buffer[start..])
    }

    /// The tail window decoded as text, for substring checks against
    /// expected-response questions.
    pub fn tail_str(&self) -> std::borrow::Cow<'_, str> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        String::from_utf8_lossy(&self.buffer[start..])
    }

    /// Take the accumulated contents, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
