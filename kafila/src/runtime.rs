//! Periodic loops of the daemon
//!
//! The link loop owns the modem and runs the supervision state machine plus
//! the dispatcher. The formation loop owns the chassis and runs the control
//! law. They share the fleet state and the latest local status snapshot.

use crate::clock::{Clock, Ticker};
use crate::core::chassis::Chassis;
use crate::core::types::{DriveCommand, VehicleStatus};
use crate::error::{Error, Result};
use crate::fleet::SharedFleet;
use crate::formation::FormationController;
use crate::link::TransportLink;
use crate::modem::RadioModem;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Latest local status, written by the formation loop and read by the link loop
pub type SharedStatus = Arc<Mutex<VehicleStatus>>;

/// Run the link loop until `running` clears
pub fn spawn_link_loop<M: RadioModem + 'static>(
    mut link: TransportLink<M>,
    status: SharedStatus,
    clock: Arc<dyn Clock>,
    rate_hz: u32,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("link".to_string())
        .spawn(move || {
            let mut ticker = Ticker::from_rate_hz(rate_hz, clock.now_ms());
            log::info!("Link loop running every {}ms", ticker.period_ms());
            while running.load(Ordering::Relaxed) {
                let snapshot = *status.lock();
                link.tick(&snapshot);
                if ticker.wait(clock.as_ref()) {
                    log::trace!("Link tick overran ({})", link.state());
                }
            }
            log::info!("Link loop stopped in state {}", link.state());
        })
        .map_err(|e| Error::Other(format!("Failed to spawn link loop: {}", e)))
}

/// Run the formation loop until `running` clears, then stop the vehicle
pub fn spawn_formation_loop<C: Chassis + 'static>(
    mut controller: FormationController,
    mut chassis: C,
    fleet: SharedFleet,
    status: SharedStatus,
    clock: Arc<dyn Clock>,
    rate_hz: u32,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("formation".to_string())
        .spawn(move || {
            let mut ticker = Ticker::from_rate_hz(rate_hz, clock.now_ms());
            log::info!("Formation loop running every {}ms", ticker.period_ms());
            while running.load(Ordering::Relaxed) {
                chassis.poll();
                let pose = chassis.pose();
                *status.lock() = VehicleStatus {
                    pose,
                    velocity: chassis.velocity(),
                    voltage: chassis.battery_voltage(),
                };

                let now = clock.now_ms();
                let cmd = controller.tick(&mut fleet.lock(), pose, now);
                chassis.drive(cmd);

                if ticker.wait(clock.as_ref()) {
                    log::trace!("Formation tick overran");
                }
            }
            chassis.drive(DriveCommand::STOP);
            log::info!("Formation loop stopped, vehicle halted");
        })
        .map_err(|e| Error::Other(format!("Failed to spawn formation loop: {}", e)))
}

/// Join a loop thread, reporting a panic as an error
pub fn join(handle: JoinHandle<()>, name: &'static str) -> Result<()> {
    handle.join().map_err(|_| Error::ThreadPanic(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{FormationConfig, NavigationConfig, SimulationConfig};
    use crate::fleet::Fleet;
    use crate::sim::SimulatedChassis;
    use std::time::Duration;

    #[test]
    fn test_formation_loop_publishes_status_and_stops() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let status: SharedStatus = Arc::new(Mutex::new(VehicleStatus::default()));
        let running = Arc::new(AtomicBool::new(true));
        let sim = SimulationConfig {
            start_x: 1.5,
            ..SimulationConfig::default()
        };

        let handle = spawn_formation_loop(
            FormationController::new(FormationConfig::default(), NavigationConfig::default()),
            SimulatedChassis::new(&sim, clock.clone()),
            Fleet::shared(30_000),
            status.clone(),
            clock,
            100,
            running.clone(),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        running.store(false, Ordering::Relaxed);
        join(handle, "formation").unwrap();

        let snapshot = *status.lock();
        assert_eq!(snapshot.pose.x, 1.5);
        assert_eq!(snapshot.voltage, 12.0);
    }
}
