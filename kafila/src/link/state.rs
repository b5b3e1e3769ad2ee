//! Link supervision states

use std::fmt;

/// State of the link supervision machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Full modem bring-up: ping, identity, join, open channels
    Init,
    /// Operator-requested reconnect, probing until the modem answers
    Connecting,
    /// Channels open; status pushed and inbound traffic dispatched
    Ready,
    /// Data channel lost; reopening it without a full bring-up
    UdpReconnecting,
    /// Repeated failures; periodic recovery attempts
    Error,
    /// Modem reboot
    HardReset,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Init => "init",
            LinkState::Connecting => "connecting",
            LinkState::Ready => "ready",
            LinkState::UdpReconnecting => "udp-reconnecting",
            LinkState::Error => "error",
            LinkState::HardReset => "hard-reset",
        };
        f.write_str(name)
    }
}

/// Health of the data channel while [`LinkState::Ready`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionHealth {
    #[default]
    Healthy,
    Disconnected,
}
