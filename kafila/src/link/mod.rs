//! Link supervision state machine
//!
//! Recovery escalates from reopening the data channel, to a full modem
//! bring-up, to a hardware reset. No failure is terminal: a failing hardware
//! reset falls back to Error, which keeps retrying.
//!
//! ```text
//! Init ──ok──> Ready ──200 failed sends──> UdpReconnecting ──ok──> Ready
//!  │  ^          │                            │ 3 failures
//!  │  │          └──session > 1h──> Init <────┘
//!  │  └──ok── Error <──3 failures── HardReset <──Error > 60s
//!  └──30s without success──> HardReset ──ok──> Init
//! ```

mod health;
mod state;

pub use health::LinkHealth;
pub use state::{ConnectionHealth, LinkState};

use crate::clock::Clock;
use crate::config::{LinkConfig, VehicleConfig};
use crate::core::types::VehicleStatus;
use crate::dispatch::Dispatcher;
use crate::fleet::VehicleId;
use crate::modem::RadioModem;
use crate::protocol::encode_status;
use std::sync::Arc;

/// Owns the modem and drives it from the link loop
pub struct TransportLink<M: RadioModem> {
    modem: M,
    clock: Arc<dyn Clock>,
    config: LinkConfig,
    vehicle: VehicleConfig,
    dispatcher: Dispatcher,
    state: LinkState,
    /// Time the current state was entered
    entered_ms: u64,
    /// Last recovery attempt in the current state
    last_attempt_ms: Option<u64>,
    /// Failed attempts in the current state
    failed_attempts: u32,
    health: LinkHealth,
    local_id: Option<VehicleId>,
}

impl<M: RadioModem> TransportLink<M> {
    pub fn new(
        modem: M,
        clock: Arc<dyn Clock>,
        config: LinkConfig,
        vehicle: VehicleConfig,
        dispatcher: Dispatcher,
    ) -> Self {
        let now = clock.now_ms();
        log::info!("Link supervision starting in {}", LinkState::Init);
        Self {
            modem,
            clock,
            config,
            vehicle,
            dispatcher,
            state: LinkState::Init,
            entered_ms: now,
            last_attempt_ms: None,
            failed_attempts: 0,
            health: LinkHealth::start(now),
            local_id: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn health(&self) -> &LinkHealth {
        &self.health
    }

    /// Id assigned during the last successful bring-up
    pub fn local_id(&self) -> Option<VehicleId> {
        self.local_id
    }

    /// Abandon the current session and reconnect from scratch
    pub fn request_reconnect(&mut self) {
        log::info!("Reconnect requested");
        let now = self.clock.now_ms();
        self.transition(LinkState::Connecting, now);
    }

    /// One link loop iteration
    pub fn tick(&mut self, status: &VehicleStatus) {
        let now = self.clock.now_ms();
        self.dispatcher.housekeeping(now);

        match self.state {
            LinkState::Init => self.tick_init(now),
            LinkState::Connecting => self.tick_connecting(now),
            LinkState::Ready => self.tick_ready(now, status),
            LinkState::UdpReconnecting => self.tick_udp_reconnecting(now),
            LinkState::Error => self.tick_error(now),
            LinkState::HardReset => self.tick_hard_reset(now),
        }
    }

    fn transition(&mut self, next: LinkState, now: u64) {
        if next != self.state {
            log::info!("Link {} -> {}", self.state, next);
        }
        self.state = next;
        self.entered_ms = now;
        self.last_attempt_ms = None;
        self.failed_attempts = 0;
    }

    /// Whether an attempt is due, given the attempt interval
    fn attempt_due(&self, now: u64, interval_ms: u64, immediate: bool) -> bool {
        match self.last_attempt_ms {
            Some(last) => now.saturating_sub(last) >= interval_ms,
            None if immediate => true,
            None => now.saturating_sub(self.entered_ms) >= interval_ms,
        }
    }

    fn tick_init(&mut self, now: u64) {
        if now.saturating_sub(self.entered_ms) > self.config.init_timeout_ms {
            log::warn!(
                "Link bring-up failed for {}ms, resetting modem",
                self.config.init_timeout_ms
            );
            self.transition(LinkState::HardReset, now);
            return;
        }

        self.health = LinkHealth::start(now);
        self.dispatcher.fleet().lock().reset_tables();

        if self.bring_up() {
            let now = self.clock.now_ms();
            self.health = LinkHealth::start(now);
            self.transition(LinkState::Ready, now);
        }
    }

    /// Ping, identify, join and open both channels
    fn bring_up(&mut self) -> bool {
        if !self.modem.ping().is_success() {
            log::warn!("Modem did not answer ping");
            return false;
        }

        let id = self.resolve_id();
        self.local_id = Some(id);
        self.dispatcher.fleet().lock().set_local_id(id);

        let join = self.modem.join_network();
        if !join.is_success() {
            log::warn!("Joining access point failed: {:?}", join);
            return false;
        }
        let data = self.modem.open_data_channel();
        if !data.is_success() {
            log::warn!("Opening data channel failed: {:?}", data);
            return false;
        }
        let broadcast = self.modem.open_broadcast_channel();
        if !broadcast.is_success() {
            log::warn!("Opening broadcast channel failed: {:?}", broadcast);
            return false;
        }

        log::info!("Link up as {}", id);
        true
    }

    fn resolve_id(&mut self) -> VehicleId {
        match self.vehicle.fixed_id() {
            Ok(Some(id)) => return id,
            Ok(None) => {}
            Err(e) => log::warn!("Ignoring configured vehicle id: {}", e),
        }
        match self.modem.station_mac() {
            Some(mac) => {
                let id = VehicleId::from_mac(&mac, &self.vehicle.known_macs);
                log::info!("Station MAC {} assigned id {}", mac, id);
                id
            }
            None => {
                log::warn!("Station MAC query failed, using {}", VehicleId::car(0));
                VehicleId::car(0)
            }
        }
    }

    fn tick_connecting(&mut self, now: u64) {
        if now.saturating_sub(self.entered_ms) > self.config.connecting_timeout_ms {
            log::warn!("Connecting timed out");
            self.transition(LinkState::Init, now);
            return;
        }
        if !self.attempt_due(now, self.config.connecting_retry_ms, true) {
            return;
        }
        self.last_attempt_ms = Some(now);
        if self.modem.ping().is_success() {
            self.transition(LinkState::Init, self.clock.now_ms());
        }
    }

    fn tick_ready(&mut self, now: u64, status: &VehicleStatus) {
        if now.saturating_sub(self.health.connected_since_ms) > self.config.max_session_ms {
            log::info!("Session exceeded {}ms, reinitializing", self.config.max_session_ms);
            self.transition(LinkState::Init, now);
            return;
        }

        // Every modem command discards unread input, so dispatch it first
        self.pump(now);

        if now.saturating_sub(self.health.last_check_ms) >= self.config.health_check_interval_ms {
            self.health.last_check_ms = now;
            if self.health.cumulative_failures > self.config.cumulative_failure_threshold {
                log::warn!(
                    "{} send failures since last success, rebuilding data channel",
                    self.health.cumulative_failures
                );
                if self.modem.open_data_channel().is_success() {
                    self.health.cumulative_failures = 0;
                } else {
                    self.health.health = ConnectionHealth::Disconnected;
                }
            }
        }

        if self.health.health == ConnectionHealth::Healthy
            && self.health.status_due(now, self.config.status_interval_ms)
        {
            self.send_status(now, status);
        }

        if self.health.health == ConnectionHealth::Disconnected {
            log::warn!(
                "Data channel down after {} consecutive failures",
                self.health.consecutive_failures
            );
            self.health = LinkHealth::start(now);
            self.transition(LinkState::UdpReconnecting, now);
        }
    }

    fn send_status(&mut self, now: u64, status: &VehicleStatus) {
        self.health.last_status_ms = Some(now);
        let Some(id) = self.local_id else {
            return;
        };
        let report = encode_status(id, status);
        if self.modem.send_status(&report).is_success() {
            self.health.record_success();
        } else {
            self.health.record_failure(self.config.failure_threshold);
            log::trace!(
                "Status send failed ({} consecutive)",
                self.health.consecutive_failures
            );
        }
    }

    /// Hand received bytes to the dispatcher
    fn pump(&mut self, now: u64) {
        let dispatcher = &mut self.dispatcher;
        self.modem.receive(&mut |bytes: &[u8]| {
            dispatcher.process(bytes, now);
        });
    }

    fn tick_udp_reconnecting(&mut self, now: u64) {
        if !self.attempt_due(now, self.config.reconnect_interval_ms, true) {
            return;
        }
        self.last_attempt_ms = Some(now);

        if self.modem.open_data_channel().is_success() {
            log::info!("Data channel reopened");
            let now = self.clock.now_ms();
            self.health = LinkHealth::start(now);
            self.transition(LinkState::Ready, now);
            return;
        }

        self.failed_attempts += 1;
        log::warn!(
            "Data channel reopen failed ({}/{})",
            self.failed_attempts,
            self.config.reconnect_attempts
        );
        if self.failed_attempts >= self.config.reconnect_attempts {
            self.transition(LinkState::Init, now);
        }
    }

    fn tick_error(&mut self, now: u64) {
        if now.saturating_sub(self.entered_ms) > self.config.error_escalation_ms {
            self.transition(LinkState::HardReset, now);
            return;
        }
        if !self.attempt_due(now, self.config.error_retry_ms, false) {
            return;
        }
        self.last_attempt_ms = Some(now);
        if self.modem.ping().is_success() {
            self.transition(LinkState::Init, self.clock.now_ms());
        } else {
            log::debug!("Recovery ping failed");
        }
    }

    fn tick_hard_reset(&mut self, now: u64) {
        if !self.attempt_due(now, self.config.hard_reset_interval_ms, true) {
            return;
        }
        self.last_attempt_ms = Some(now);

        if self.modem.hard_reset().is_success() {
            self.transition(LinkState::Init, self.clock.now_ms());
            return;
        }

        self.failed_attempts += 1;
        log::warn!(
            "Modem reset failed ({}/{})",
            self.failed_attempts,
            self.config.hard_reset_attempts
        );
        if self.failed_attempts >= self.config.hard_reset_attempts {
            self.transition(LinkState::Error, now);
        }
    }
}
