//! Kafila daemon
//!
//! Runs the link loop against the modem's serial port and the formation
//! loop against a simulated chassis.

use kafila::clock::{Clock, MonotonicClock};
use kafila::config::AppConfig;
use kafila::core::types::VehicleStatus;
use kafila::dispatch::Dispatcher;
use kafila::error::{Error, Result};
use kafila::fleet::Fleet;
use kafila::formation::FormationController;
use kafila::link::TransportLink;
use kafila::modem::{AtModem, ModemChannel};
use kafila::runtime::{self, SharedStatus};
use kafila::sim::SimulatedChassis;
use kafila::transport::SerialTransport;
use parking_lot::Mutex;
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Parse config path from command line arguments.
///
/// Supports:
/// - `kafila <path>` (positional)
/// - `kafila --config <path>` (flag-based)
/// - `kafila -c <path>` (short flag)
///
/// Defaults to `/etc/kafila.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "/etc/kafila.toml".to_string()
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let (config, found) = AppConfig::load_or_default(&config_path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Kafila v{} starting...", env!("CARGO_PKG_VERSION"));
    if found {
        log::info!("Using config: {}", config_path);
    } else {
        log::warn!("Config file {} not found, using built-in defaults", config_path);
    }

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let fleet = Fleet::shared(config.link.peer_timeout_ms);
    let status: SharedStatus = Arc::new(Mutex::new(VehicleStatus::default()));

    let transport = SerialTransport::open(&config.modem)?;
    let channel = ModemChannel::new(transport, clock.clone(), config.modem.poll_interval_ms);
    let modem = AtModem::new(
        channel,
        config.modem.clone(),
        config.network.clone(),
        config.link.hard_reset_settle_ms,
    );
    let dispatcher = Dispatcher::new(fleet.clone(), config.link.housekeeping_interval_ms);
    let link = TransportLink::new(
        modem,
        clock.clone(),
        config.link.clone(),
        config.vehicle.clone(),
        dispatcher,
    );

    let controller = FormationController::new(config.formation.clone(), config.navigation.clone());
    let chassis = SimulatedChassis::new(&config.simulation, clock.clone());

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let link_handle = runtime::spawn_link_loop(
        link,
        status.clone(),
        clock.clone(),
        config.link.loop_rate_hz,
        running.clone(),
    )?;
    let formation_handle = runtime::spawn_formation_loop(
        controller,
        chassis,
        fleet,
        status,
        clock,
        config.formation.loop_rate_hz,
        running,
    )?;

    log::info!("Kafila running. Press Ctrl-C to stop.");

    runtime::join(formation_handle, "formation")?;
    runtime::join(link_handle, "link")?;

    log::info!("Kafila stopped");
    Ok(())
}
