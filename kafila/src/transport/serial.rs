//! Modem UART

use super::Transport;
use crate::config::ModemConfig;
use crate::error::Result;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

/// 8N1 serial line to the modem
///
/// Reads time out after 1ms and report zero bytes, so the command channel
/// can poll without blocking the link loop.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open the configured port and drop whatever the modem printed before
    pub fn open(config: &ModemConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(1))
            .open()?;

        if let Err(e) = port.clear(ClearBuffer::Input) {
            log::debug!("Could not discard stale modem output: {}", e);
        }
        log::info!("Modem on {} at {} baud", config.port, config.baud_rate);

        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.port.read(buffer) {
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            other => Ok(other?),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.port.write(data)?)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.port.flush()?)
    }
}
