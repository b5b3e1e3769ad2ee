//! Request/response exchange with the modem over a byte transport

use super::ModemResponse;
use super::commands::{self, LINE_END};
use super::rx_buffer::RxBuffer;
use crate::clock::Clock;
use crate::transport::Transport;
use std::sync::Arc;

const READ_CHUNK: usize = 256;

/// Blocking, timeout-bounded line-command channel
///
/// The receive buffer is shared with inbound datagram notifications; every
/// command clears it before sending so a response is never matched against
/// stale bytes.
pub struct ModemChannel<T: Transport> {
    transport: T,
    rx: RxBuffer,
    clock: Arc<dyn Clock>,
    poll_interval_ms: u64,
    /// Diagnostic only
    timeout_count: u32,
    last_success_ms: Option<u64>,
}

impl<T: Transport> ModemChannel<T> {
    pub fn new(transport: T, clock: Arc<dyn Clock>, poll_interval_ms: u64) -> Self {
        Self {
            transport,
            rx: RxBuffer::new(),
            clock,
            poll_interval_ms: poll_interval_ms.max(1),
            timeout_count: 0,
            last_success_ms: None,
        }
    }

    /// Send `cmd` and classify the reply
    ///
    /// The reply is scanned for the already-in-state sentinel, then
    /// `expected`, then the error sentinel. Nothing matching before
    /// `timeout_ms` elapses yields [`ModemResponse::Timeout`].
    pub fn send(&mut self, cmd: &str, expected: &str, timeout_ms: u64) -> ModemResponse {
        log::trace!("Modem <- {}", cmd);
        self.discard_pending();
        let mut line = String::with_capacity(cmd.len() + LINE_END.len());
        line.push_str(cmd);
        line.push_str(LINE_END);
        if let Err(e) = self.transport.write_all(line.as_bytes()) {
            log::warn!("Modem write failed for {}: {}", cmd, e);
            return ModemResponse::Error;
        }
        self.await_response(expected, timeout_ms)
    }

    /// Write raw bytes (no terminator) and classify the reply
    pub fn send_raw(&mut self, data: &[u8], expected: &str, timeout_ms: u64) -> ModemResponse {
        self.discard_pending();
        if let Err(e) = self.transport.write_all(data) {
            log::warn!("Modem write failed: {}", e);
            return ModemResponse::Error;
        }
        self.await_response(expected, timeout_ms)
    }

    /// Send one datagram on the data channel
    ///
    /// Announces the length, waits for the payload prompt, then writes the
    /// payload and waits for the send confirmation.
    pub fn send_datagram(
        &mut self,
        payload: &[u8],
        prompt_timeout_ms: u64,
        confirm_timeout_ms: u64,
    ) -> ModemResponse {
        let announce = commands::send_datagram(payload.len());
        match self.send(&announce, commands::SEND_PROMPT, prompt_timeout_ms) {
            ModemResponse::Ok => {}
            other => return other,
        }

        let mut framed = Vec::with_capacity(payload.len() + LINE_END.len());
        framed.extend_from_slice(payload);
        framed.extend_from_slice(LINE_END.as_bytes());
        self.send_raw(&framed, commands::SEND_OK, confirm_timeout_ms)
    }

    /// Drop buffered and not-yet-read bytes so late replies to an earlier
    /// command cannot match the next one
    fn discard_pending(&mut self) {
        self.poll();
        self.rx.take_overflow();
        self.rx.clear();
    }

    fn await_response(&mut self, expected: &str, timeout_ms: u64) -> ModemResponse {
        let start = self.clock.now_ms();
        loop {
            self.poll();
            if let Some(response) = self.classify(expected) {
                self.last_success_ms = Some(self.clock.now_ms());
                return response;
            }
            if self.clock.now_ms().saturating_sub(start) >= timeout_ms {
                self.timeout_count = self.timeout_count.wrapping_add(1);
                log::debug!(
                    "Modem timeout waiting for {:?} ({} total)",
                    expected,
                    self.timeout_count
                );
                return ModemResponse::Timeout;
            }
            self.clock.sleep_ms(self.poll_interval_ms);
        }
    }

    fn classify(&self, expected: &str) -> Option<ModemResponse> {
        if self.rx.contains(commands::ALREADY_IN_STATE.as_bytes()) {
            Some(ModemResponse::AlreadyInState)
        } else if self.rx.contains(expected.as_bytes()) {
            Some(ModemResponse::Ok)
        } else if self.rx.contains(commands::ERROR.as_bytes()) {
            Some(ModemResponse::Error)
        } else {
            None
        }
    }

    /// Move pending transport bytes into the receive buffer
    pub fn poll(&mut self) {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.transport.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if !self.rx.extend(&chunk[..n]) {
                        log::warn!("Modem receive buffer overflow, buffer reset");
                    }
                }
                Err(e) => {
                    log::warn!("Modem read failed: {}", e);
                    break;
                }
            }
        }
    }

    /// Hand the buffered bytes to `sink` and reset the buffer
    pub fn drain(&mut self, sink: &mut dyn FnMut(&[u8])) {
        self.poll();
        self.rx.take_overflow();
        if !self.rx.is_empty() {
            sink(self.rx.as_slice());
        }
        self.rx.clear();
    }

    /// Text of the buffered reply (valid until the next exchange)
    pub fn reply_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.rx.as_slice())
    }

    pub fn timeout_count(&self) -> u32 {
        self.timeout_count
    }

    /// Time of the last exchange that produced any classified reply
    pub fn last_success_ms(&self) -> Option<u64> {
        self.last_success_ms
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
