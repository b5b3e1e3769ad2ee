//! Shared fixtures for integration tests

#![allow(dead_code)]

use kafila::clock::{Clock, ManualClock};
use kafila::config::{LinkConfig, VehicleConfig};
use kafila::core::types::VehicleStatus;
use kafila::dispatch::Dispatcher;
use kafila::fleet::{Fleet, SharedFleet};
use kafila::link::TransportLink;
use kafila::modem::{ModemResponse, RadioModem};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

pub const CAR2_MAC: &str = "78:1c:3c:8a:9e:49";

/// Scripted modem behaviour and a record of what the link asked for
pub struct ModemScript {
    pub ping: ModemResponse,
    pub mac: Option<String>,
    pub join: ModemResponse,
    pub data_channel: ModemResponse,
    pub broadcast_channel: ModemResponse,
    pub hard_reset: ModemResponse,
    pub send: ModemResponse,
    pub inbound: VecDeque<Vec<u8>>,
    pub calls: Vec<&'static str>,
    pub sent: Vec<String>,
}

impl Default for ModemScript {
    fn default() -> Self {
        Self {
            ping: ModemResponse::Ok,
            mac: Some(CAR2_MAC.to_string()),
            join: ModemResponse::Ok,
            data_channel: ModemResponse::Ok,
            broadcast_channel: ModemResponse::Ok,
            hard_reset: ModemResponse::Ok,
            send: ModemResponse::Ok,
            inbound: VecDeque::new(),
            calls: Vec::new(),
            sent: Vec::new(),
        }
    }
}

/// [`RadioModem`] fake whose script can be edited between ticks
#[derive(Clone, Default)]
pub struct FakeModem {
    pub script: Arc<Mutex<ModemScript>>,
}

impl FakeModem {
    pub fn count(&self, call: &str) -> usize {
        self.script.lock().calls.iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&self) {
        self.script.lock().calls.clear();
    }
}

impl RadioModem for FakeModem {
    fn ping(&mut self) -> ModemResponse {
        let mut s = self.script.lock();
        s.calls.push("ping");
        s.ping
    }

    fn station_mac(&mut self) -> Option<String> {
        let mut s = self.script.lock();
        s.calls.push("mac");
        s.mac.clone()
    }

    fn join_network(&mut self) -> ModemResponse {
        let mut s = self.script.lock();
        s.calls.push("join");
        s.join
    }

    fn open_data_channel(&mut self) -> ModemResponse {
        let mut s = self.script.lock();
        s.calls.push("data");
        s.data_channel
    }

    fn open_broadcast_channel(&mut self) -> ModemResponse {
        let mut s = self.script.lock();
        s.calls.push("broadcast");
        s.broadcast_channel
    }

    fn hard_reset(&mut self) -> ModemResponse {
        let mut s = self.script.lock();
        s.calls.push("reset");
        s.hard_reset
    }

    fn send_status(&mut self, report: &str) -> ModemResponse {
        let mut s = self.script.lock();
        s.calls.push("send");
        s.sent.push(report.to_string());
        s.send
    }

    fn receive(&mut self, sink: &mut dyn FnMut(&[u8])) {
        let chunk = self.script.lock().inbound.pop_front();
        if let Some(bytes) = chunk {
            sink(&bytes);
        }
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub modem: FakeModem,
    pub fleet: SharedFleet,
    pub link: TransportLink<FakeModem>,
    pub status: VehicleStatus,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_vehicle(VehicleConfig {
            id: None,
            known_macs: vec![
                "78:1c:3c:8a:a5:00".to_string(),
                CAR2_MAC.to_string(),
                "78:1c:3c:8a:9e:74".to_string(),
                "78:1c:3c:8a:9e:7f".to_string(),
            ],
        })
    }

    pub fn with_vehicle(vehicle: VehicleConfig) -> Self {
        let clock = Arc::new(ManualClock::new(0));
        let modem = FakeModem::default();
        let config = LinkConfig::default();
        let fleet = Fleet::shared(config.peer_timeout_ms);
        let dispatcher = Dispatcher::new(fleet.clone(), config.housekeeping_interval_ms);
        let link = TransportLink::new(
            modem.clone(),
            clock.clone() as Arc<dyn Clock>,
            config,
            vehicle,
            dispatcher,
        );
        Self {
            clock,
            modem,
            fleet,
            link,
            status: VehicleStatus::default(),
        }
    }

    pub fn tick(&mut self) {
        self.link.tick(&self.status);
    }

    /// Advance the clock, then tick
    pub fn step(&mut self, ms: u64) {
        self.clock.advance(ms);
        self.tick();
    }
}

/// `+IPD` notification wrapping `payload`
pub fn frame(channel: u8, payload: &str) -> Vec<u8> {
    format!("+IPD,{},{}:{}", channel, payload.len(), payload).into_bytes()
}
