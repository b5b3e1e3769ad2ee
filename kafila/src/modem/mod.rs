//! Radio modem driver
//!
//! [`ModemChannel`] performs single timeout-bounded exchanges. [`AtModem`]
//! builds the link operations the supervision state machine needs on top of
//! it and exposes them through the [`RadioModem`] trait, which is the seam
//! tests replace with a scripted fake.

mod channel;
pub mod commands;
mod rx_buffer;

pub use channel::ModemChannel;
pub use rx_buffer::{RX_BUFFER_SIZE, RxBuffer};

use crate::config::{ModemConfig, NetworkConfig};
use crate::transport::Transport;

/// Classified outcome of one modem exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemResponse {
    /// Expected reply seen
    Ok,
    /// Modem reported it is already in the requested state
    AlreadyInState,
    /// Error sentinel seen
    Error,
    /// Nothing recognized before the deadline
    Timeout,
}

impl ModemResponse {
    /// Whether the requested state now holds
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, ModemResponse::Ok | ModemResponse::AlreadyInState)
    }
}

/// Link operations used by the supervision state machine
pub trait RadioModem: Send {
    /// Basic liveness check
    fn ping(&mut self) -> ModemResponse;

    /// Station MAC address, if the modem reports one
    fn station_mac(&mut self) -> Option<String>;

    /// Switch to station mode and join the configured access point
    fn join_network(&mut self) -> ModemResponse;

    /// (Re)open the unicast data channel to the base station
    fn open_data_channel(&mut self) -> ModemResponse;

    /// Open the subnet broadcast channel
    fn open_broadcast_channel(&mut self) -> ModemResponse;

    /// Reboot the modem and wait for it to come back
    fn hard_reset(&mut self) -> ModemResponse;

    /// Send one status report on the data channel
    fn send_status(&mut self, report: &str) -> ModemResponse;

    /// Hand received bytes to `sink`, then discard them
    fn receive(&mut self, sink: &mut dyn FnMut(&[u8]));
}

/// [`RadioModem`] for AT-command Wi-Fi modems
pub struct AtModem<T: Transport> {
    channel: ModemChannel<T>,
    modem: ModemConfig,
    network: NetworkConfig,
    settle_ms: u64,
}

impl<T: Transport> AtModem<T> {
    pub fn new(
        channel: ModemChannel<T>,
        modem: ModemConfig,
        network: NetworkConfig,
        settle_ms: u64,
    ) -> Self {
        Self {
            channel,
            modem,
            network,
            settle_ms,
        }
    }

    fn command(&mut self, cmd: &str) -> ModemResponse {
        let timeout = self.modem.command_timeout_ms;
        self.channel.send(cmd, commands::OK, timeout)
    }

    fn open_link(&mut self, start_cmd: String) -> ModemResponse {
        let mux = self.command(&commands::multiplex());
        if !mux.is_success() {
            return mux;
        }
        let timeout = self.network.channel_timeout_ms;
        self.channel.send(&start_cmd, commands::OK, timeout)
    }
}

impl<T: Transport> RadioModem for AtModem<T> {
    fn ping(&mut self) -> ModemResponse {
        self.command(&commands::ping())
    }

    fn station_mac(&mut self) -> Option<String> {
        if !self.command(&commands::query_station_mac()).is_success() {
            return None;
        }
        commands::parse_station_mac(&self.channel.reply_text()).map(str::to_string)
    }

    fn join_network(&mut self) -> ModemResponse {
        let mode = self.command(&commands::station_mode());
        if !mode.is_success() {
            return mode;
        }
        let join = commands::join_access_point(&self.network);
        let timeout = self.network.join_timeout_ms;
        self.channel.send(&join, commands::OK, timeout)
    }

    fn open_data_channel(&mut self) -> ModemResponse {
        self.open_link(commands::open_data_channel(&self.network))
    }

    fn open_broadcast_channel(&mut self) -> ModemResponse {
        self.open_link(commands::open_broadcast_channel(&self.network))
    }

    fn hard_reset(&mut self) -> ModemResponse {
        log::warn!("Issuing modem hardware reset");
        let timeout = self.modem.reset_timeout_ms;
        let response = self.channel.send(&commands::reset(), commands::READY, timeout);
        if response.is_success() {
            self.channel.clock().sleep_ms(self.settle_ms);
        }
        response
    }

    fn send_status(&mut self, report: &str) -> ModemResponse {
        self.channel.send_datagram(
            report.as_bytes(),
            self.modem.send_prompt_timeout_ms,
            self.modem.send_confirm_timeout_ms,
        )
    }

    fn receive(&mut self, sink: &mut dyn FnMut(&[u8])) {
        self.channel.drain(sink);
    }
}
