//! Link supervision scenarios driven by a scripted modem and a manual clock

mod common;

use common::{Harness, frame};
use kafila::config::VehicleConfig;
use kafila::fleet::VehicleId;
use kafila::link::{ConnectionHealth, LinkState};
use kafila::modem::ModemResponse;

/// Run the bring-up to Ready, then make every status send fail
fn ready_with_failing_sends() -> Harness {
    let mut h = Harness::new();
    h.tick();
    assert_eq!(h.link.state(), LinkState::Ready);
    h.modem.script.lock().send = ModemResponse::Error;
    h
}

/// Fail bring-up until the link escalates through HardReset into Error
fn drive_to_error(h: &mut Harness) {
    {
        let mut script = h.modem.script.lock();
        script.ping = ModemResponse::Timeout;
        script.hard_reset = ModemResponse::Timeout;
    }
    h.tick();
    h.step(30_001);
    assert_eq!(h.link.state(), LinkState::HardReset);

    h.tick();
    h.step(10_000);
    h.step(10_000);
    assert_eq!(h.modem.count("reset"), 3);
    assert_eq!(h.link.state(), LinkState::Error);
}

#[test]
fn test_bring_up_assigns_id_from_mac() {
    let mut h = Harness::new();
    assert_eq!(h.link.state(), LinkState::Init);
    h.tick();

    assert_eq!(h.link.state(), LinkState::Ready);
    assert_eq!(h.link.local_id(), Some(VehicleId::car(2)));
    assert_eq!(h.fleet.lock().local_id(), Some(VehicleId::car(2)));
    assert_eq!(
        h.modem.script.lock().calls,
        ["ping", "mac", "join", "data", "broadcast"]
    );
}

#[test]
fn test_configured_id_skips_mac_query() {
    let mut h = Harness::with_vehicle(VehicleConfig {
        id: Some("CAR4".to_string()),
        known_macs: Vec::new(),
    });
    h.tick();

    assert_eq!(h.link.state(), LinkState::Ready);
    assert_eq!(h.link.local_id(), Some(VehicleId::car(4)));
    assert_eq!(h.modem.count("mac"), 0);
}

#[test]
fn test_unknown_mac_gets_derived_id() {
    let mut h = Harness::new();
    h.modem.script.lock().mac = Some("aa:bb:cc:dd:9e:7a".to_string());
    h.tick();
    assert_eq!(h.link.local_id().map(|id| id.to_string()), Some("CAR9e7a".to_string()));
}

#[test]
fn test_failed_join_stays_in_init() {
    let mut h = Harness::new();
    h.modem.script.lock().join = ModemResponse::Error;
    h.tick();
    assert_eq!(h.link.state(), LinkState::Init);
    assert_eq!(h.modem.count("data"), 0);

    // Retried every tick until the network accepts us
    h.modem.script.lock().join = ModemResponse::AlreadyInState;
    h.step(20);
    assert_eq!(h.link.state(), LinkState::Ready);
}

#[test]
fn test_status_sends_are_spaced() {
    let mut h = Harness::new();
    h.status.voltage = 12.3;
    h.tick();
    h.tick();
    h.step(10);
    h.step(19);
    assert_eq!(h.modem.count("send"), 1);
    h.step(1);
    assert_eq!(h.modem.count("send"), 2);

    let sent = h.modem.script.lock().sent.clone();
    assert!(sent[0].starts_with("CAR2:"), "{}", sent[0]);
    assert!(sent[0].contains("12.3"), "{}", sent[0]);
}

#[test]
fn test_consecutive_failures_trigger_channel_reconnect() {
    let mut h = ready_with_failing_sends();
    for _ in 0..199 {
        h.step(30);
    }
    assert_eq!(h.link.state(), LinkState::Ready);
    assert_eq!(h.link.health().consecutive_failures, 199);

    h.step(30);
    assert_eq!(h.link.state(), LinkState::UdpReconnecting);

    // Reconnect attempts: immediate, then every 5s
    h.modem.script.lock().data_channel = ModemResponse::Error;
    h.modem.clear_calls();
    h.step(30);
    assert_eq!(h.modem.count("data"), 1);
    h.step(4_000);
    assert_eq!(h.modem.count("data"), 1);
    h.step(1_000);
    assert_eq!(h.modem.count("data"), 2);
    assert_eq!(h.link.state(), LinkState::UdpReconnecting);
    h.step(5_000);
    assert_eq!(h.modem.count("data"), 3);
    assert_eq!(h.link.state(), LinkState::Init);
}

#[test]
fn test_channel_reconnect_returns_to_ready() {
    let mut h = ready_with_failing_sends();
    for _ in 0..200 {
        h.step(30);
    }
    assert_eq!(h.link.state(), LinkState::UdpReconnecting);

    h.modem.script.lock().send = ModemResponse::Ok;
    h.step(30);
    assert_eq!(h.link.state(), LinkState::Ready);
    assert_eq!(h.link.health().health, ConnectionHealth::Healthy);
    assert_eq!(h.link.health().consecutive_failures, 0);
}

#[test]
fn test_cumulative_failures_rebuild_data_channel() {
    let mut h = ready_with_failing_sends();
    for _ in 0..21 {
        h.step(30);
    }
    assert_eq!(h.link.health().cumulative_failures, 21);
    h.modem.clear_calls();

    h.clock.set(30_000);
    h.tick();
    assert_eq!(h.modem.count("data"), 1);
    assert_eq!(h.link.state(), LinkState::Ready);
    // Counter restarted by the rebuild, then this tick's send failed again
    assert_eq!(h.link.health().cumulative_failures, 1);
}

#[test]
fn test_failed_rebuild_disconnects() {
    let mut h = ready_with_failing_sends();
    for _ in 0..21 {
        h.step(30);
    }
    h.modem.script.lock().data_channel = ModemResponse::Timeout;
    h.clock.set(30_000);
    h.tick();
    assert_eq!(h.link.state(), LinkState::UdpReconnecting);
}

#[test]
fn test_few_failures_do_not_rebuild() {
    let mut h = ready_with_failing_sends();
    for _ in 0..20 {
        h.step(30);
    }
    h.modem.clear_calls();
    h.clock.set(30_000);
    h.tick();
    assert_eq!(h.modem.count("data"), 0);
}

#[test]
fn test_long_session_reinitializes() {
    let mut h = Harness::new();
    h.tick();
    h.step(3_600_000);
    assert_eq!(h.link.state(), LinkState::Ready);

    h.step(1);
    assert_eq!(h.link.state(), LinkState::Init);
    h.step(20);
    assert_eq!(h.link.state(), LinkState::Ready);
}

#[test]
fn test_init_timeout_escalates_to_hard_reset() {
    let mut h = Harness::new();
    h.modem.script.lock().ping = ModemResponse::Timeout;
    h.tick();
    h.step(30_000);
    assert_eq!(h.link.state(), LinkState::Init);
    h.step(1);
    assert_eq!(h.link.state(), LinkState::HardReset);

    // Reset succeeds: back to a fresh bring-up
    h.modem.script.lock().ping = ModemResponse::Ok;
    h.step(20);
    assert_eq!(h.link.state(), LinkState::Init);
    assert_eq!(h.modem.count("reset"), 1);
    h.step(20);
    assert_eq!(h.link.state(), LinkState::Ready);
}

#[test]
fn test_error_ping_recovers_after_interval() {
    let mut h = Harness::new();
    drive_to_error(&mut h);
    h.modem.clear_calls();
    h.modem.script.lock().ping = ModemResponse::Ok;

    h.step(4_999);
    assert_eq!(h.modem.count("ping"), 0);
    assert_eq!(h.link.state(), LinkState::Error);

    h.step(1);
    assert_eq!(h.modem.count("ping"), 1);
    assert_eq!(h.link.state(), LinkState::Init);
}

#[test]
fn test_error_escalates_to_hard_reset_after_a_minute() {
    let mut h = Harness::new();
    drive_to_error(&mut h);
    h.modem.clear_calls();

    for _ in 0..12 {
        h.step(5_000);
        assert_eq!(h.link.state(), LinkState::Error);
    }
    assert_eq!(h.modem.count("ping"), 12);

    h.step(1);
    assert_eq!(h.link.state(), LinkState::HardReset);
}

#[test]
fn test_requested_reconnect_pings_then_reinitializes() {
    let mut h = Harness::new();
    h.tick();
    h.link.request_reconnect();
    assert_eq!(h.link.state(), LinkState::Connecting);

    h.modem.clear_calls();
    h.step(20);
    assert_eq!(h.modem.count("ping"), 1);
    assert_eq!(h.link.state(), LinkState::Init);
    h.step(20);
    assert_eq!(h.link.state(), LinkState::Ready);
}

#[test]
fn test_connecting_times_out_into_init() {
    let mut h = Harness::new();
    h.tick();
    h.modem.script.lock().ping = ModemResponse::Error;
    h.link.request_reconnect();
    h.modem.clear_calls();

    h.tick();
    h.step(2_999);
    assert_eq!(h.modem.count("ping"), 1);
    h.step(1);
    assert_eq!(h.modem.count("ping"), 2);

    h.step(12_001);
    assert_eq!(h.link.state(), LinkState::Init);
}

#[test]
fn test_ready_pumps_broadcasts_into_peer_table() {
    let mut h = Harness::new();
    h.tick();
    h.modem
        .script
        .lock()
        .inbound
        .push_back(frame(1, "[2 C1 1.00 2.00 90.0 0.100 0.000 0.000 C2 9.0 9.0 0.0 0.0 0.0 0.0]"));
    h.step(20);

    let fleet = h.fleet.lock();
    let car1 = fleet.peers.lookup(VehicleId::car(1)).expect("CAR1 recorded");
    assert_eq!(car1.pose.x, 1.0);
    assert_eq!(car1.last_update_ms, 20);
    // Our own entry is not stored as a peer
    assert!(fleet.peers.lookup(VehicleId::car(2)).is_none());
}

#[test]
fn test_init_clears_fleet_tables() {
    let mut h = Harness::new();
    h.tick();
    h.modem.script.lock().inbound.push_back(frame(1, "[T,E,1]"));
    h.step(20);
    assert!(h.fleet.lock().topology.is_enabled());

    h.link.request_reconnect();
    h.step(20);
    h.step(20);
    assert_eq!(h.link.state(), LinkState::Ready);
    assert!(!h.fleet.lock().topology.is_enabled());
}
