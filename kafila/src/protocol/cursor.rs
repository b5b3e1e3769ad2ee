//! Bounds-checked reader over a received byte slice
//!
//! Every accessor returns `None` instead of reading past the end, so the
//! frame scanner and the batch decoder cannot overrun a truncated buffer.

use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unread bytes
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Advance past the next occurrence of `needle`
    ///
    /// Returns `false` (and consumes everything) if there is none.
    pub fn seek_past(&mut self, needle: &[u8]) -> bool {
        let rest = self.rest();
        match rest.windows(needle.len()).position(|w| w == needle) {
            Some(offset) => {
                self.pos += offset + needle.len();
                true
            }
            None => {
                self.pos = self.buf.len();
                false
            }
        }
    }

    /// Consume exactly `n` bytes
    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    /// Parse an unsigned decimal number terminated by `delimiter`
    ///
    /// The delimiter is consumed. On failure the cursor does not move.
    pub fn number_until(&mut self, delimiter: u8) -> Option<usize> {
        let rest = self.rest();
        let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 || rest.get(digits) != Some(&delimiter) {
            return None;
        }
        let value = std::str::from_utf8(&rest[..digits]).ok()?.parse().ok()?;
        self.pos += digits + 1;
        Some(value)
    }

    /// Next whitespace-delimited token, stopping before `]`
    pub fn token(&mut self) -> Option<&'a str> {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        let rest = self.rest();
        let len = rest
            .iter()
            .take_while(|b| !b.is_ascii_whitespace() && **b != b']')
            .count();
        if len == 0 {
            return None;
        }
        let token = std::str::from_utf8(&rest[..len]).ok()?;
        self.pos += len;
        Some(token)
    }

    /// Parse the next token as `T`
    pub fn parse<T: FromStr>(&mut self) -> Option<T> {
        self.token()?.parse().ok()
    }
}
