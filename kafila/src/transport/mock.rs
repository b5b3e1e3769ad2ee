//! Mock transport for testing
//!
//! Besides raw read injection, the mock can play the modem's side of the
//! conversation: a rule maps a written command prefix to the bytes the
//! modem would answer with.

use super::Transport;
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Mock transport for unit testing
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

struct ReplyRule {
    prefix: Vec<u8>,
    reply: Vec<u8>,
    /// Remaining uses, `None` for unlimited
    remaining: Option<usize>,
}

struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
    rules: Vec<ReplyRule>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                read_buffer: VecDeque::new(),
                write_buffer: Vec::new(),
                rules: Vec::new(),
            })),
        }
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().read_buffer.extend(data);
    }

    /// Answer every write starting with `prefix` with `reply`
    pub fn respond_to(&self, prefix: &str, reply: &str) {
        self.push_rule(prefix, reply, None);
    }

    /// Answer the next write starting with `prefix` with `reply`
    ///
    /// One-shot rules take precedence over persistent ones.
    pub fn respond_once(&self, prefix: &str, reply: &str) {
        self.push_rule(prefix, reply, Some(1));
    }

    fn push_rule(&self, prefix: &str, reply: &str, remaining: Option<usize>) {
        let rule = ReplyRule {
            prefix: prefix.as_bytes().to_vec(),
            reply: reply.as_bytes().to_vec(),
            remaining,
        };
        let mut inner = self.inner.lock();
        if remaining.is_some() {
            inner.rules.insert(0, rule);
        } else {
            inner.rules.push(rule);
        }
    }

    /// Drop all reply rules
    pub fn clear_rules(&self) {
        self.inner.lock().rules.clear();
    }

    /// Get all written data
    pub fn get_written(&self) -> Vec<u8> {
        self.inner.lock().write_buffer.clone()
    }

    /// Written data as text
    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().write_buffer).into_owned()
    }

    /// Clear written data
    pub fn clear_written(&self) {
        self.inner.lock().write_buffer.clear();
    }

    /// Clear read buffer
    pub fn clear_read(&self) {
        self.inner.lock().read_buffer.clear();
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let available = inner.read_buffer.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(inner.read_buffer.drain(..available)) {
            *slot = byte;
        }
        Ok(available)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        inner.write_buffer.extend_from_slice(data);

        if let Some(idx) = inner.rules.iter().position(|r| data.starts_with(&r.prefix)) {
            let reply = inner.rules[idx].reply.clone();
            inner.read_buffer.extend(reply);
            if let Some(remaining) = inner.rules[idx].remaining.as_mut() {
                *remaining -= 1;
                if *remaining == 0 {
                    inner.rules.remove(idx);
                }
            }
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}
