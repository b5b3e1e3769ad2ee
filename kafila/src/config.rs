//! Configuration for the Kafila daemon
//!
//! Loads configuration from a TOML file. Every section and field has a
//! default, so a deployment file only needs to list what differs from the
//! stock four-vehicle setup.

use crate::error::{Error, Result};
use crate::fleet::VehicleId;
use crate::formation::motion::{MOTION_WINDOW_SAMPLES, STILLNESS_DEBOUNCE_TICKS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub modem: ModemConfig,
    pub network: NetworkConfig,
    pub vehicle: VehicleConfig,
    pub link: LinkConfig,
    pub formation: FormationConfig,
    pub navigation: NavigationConfig,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

/// Serial connection to the radio modem
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Serial port path (e.g. "/dev/ttyS1")
    pub port: String,
    pub baud_rate: u32,
    /// Timeout for short line commands (ping, mode, multiplexing)
    pub command_timeout_ms: u64,
    /// Timeout for the `>` prompt before a datagram payload
    pub send_prompt_timeout_ms: u64,
    /// Timeout for `SEND OK` after a datagram payload
    pub send_confirm_timeout_ms: u64,
    /// Sleep between receive polls while waiting for a response
    pub poll_interval_ms: u64,
    /// Time allowed for the modem to reboot after a hardware reset command
    pub reset_timeout_ms: u64,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyS1".to_string(),
            baud_rate: 115200,
            command_timeout_ms: 3000,
            send_prompt_timeout_ms: 500,
            send_confirm_timeout_ms: 50,
            poll_interval_ms: 3,
            reset_timeout_ms: 10_000,
        }
    }
}

/// Wireless network and base station addressing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub ssid: String,
    pub password: String,
    /// Base station address for the unicast data channel
    pub server_ip: String,
    pub server_port: u16,
    /// Local port of the unicast data channel
    pub local_port: u16,
    /// Subnet broadcast address for the peer channel
    pub broadcast_address: String,
    pub broadcast_port: u16,
    /// Timeout for joining the access point
    pub join_timeout_ms: u64,
    /// Timeout for opening a UDP channel
    pub channel_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ssid: "kafila".to_string(),
            password: "12345678".to_string(),
            server_ip: "192.168.31.46".to_string(),
            server_port: 8080,
            local_port: 12345,
            broadcast_address: "192.168.31.255".to_string(),
            broadcast_port: 8081,
            join_timeout_ms: 20000,
            channel_timeout_ms: 10000,
        }
    }
}

/// Identity of this vehicle
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Fixed canonical id (e.g. "CAR2"); when absent the id is assigned
    /// from the modem's station MAC during link initialization
    pub id: Option<String>,
    /// Station MACs of the fleet; entry `i` is assigned `CAR<i+1>`
    pub known_macs: Vec<String>,
}

impl VehicleConfig {
    /// Parsed fixed id, if configured
    pub fn fixed_id(&self) -> Result<Option<VehicleId>> {
        self.id.as_deref().map(str::parse).transpose()
    }
}

/// Timing and thresholds of the link supervision state machine
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Link/dispatcher loop rate
    pub loop_rate_hz: u32,
    /// Minimum spacing between status sends
    pub status_interval_ms: u64,
    /// Consecutive send failures before the data channel is declared down
    pub failure_threshold: u32,
    /// Period of the cumulative failure check
    pub health_check_interval_ms: u64,
    /// Failures since the last good send that trigger a data channel rebuild
    pub cumulative_failure_threshold: u32,
    /// Session length after which the link is reinitialized regardless of health
    pub max_session_ms: u64,
    /// Time allowed for initialization before a hardware reset
    pub init_timeout_ms: u64,
    pub connecting_timeout_ms: u64,
    pub connecting_retry_ms: u64,
    pub reconnect_interval_ms: u64,
    pub reconnect_attempts: u32,
    pub error_retry_ms: u64,
    /// Time in Error after which a hardware reset is attempted
    pub error_escalation_ms: u64,
    pub hard_reset_interval_ms: u64,
    pub hard_reset_attempts: u32,
    /// Boot time granted to the modem after a successful reset
    pub hard_reset_settle_ms: u64,
    /// Period of peer table eviction
    pub housekeeping_interval_ms: u64,
    /// Peer records older than this are invalidated
    pub peer_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            loop_rate_hz: 50,
            status_interval_ms: 30,
            failure_threshold: 200,
            health_check_interval_ms: 30_000,
            cumulative_failure_threshold: 20,
            max_session_ms: 3_600_000,
            init_timeout_ms: 30_000,
            connecting_timeout_ms: 15_000,
            connecting_retry_ms: 3_000,
            reconnect_interval_ms: 5_000,
            reconnect_attempts: 3,
            error_retry_ms: 5_000,
            error_escalation_ms: 60_000,
            hard_reset_interval_ms: 10_000,
            hard_reset_attempts: 3,
            hard_reset_settle_ms: 3_000,
            housekeeping_interval_ms: 10_000,
            peer_timeout_ms: 30_000,
        }
    }
}

/// Heading PID gains (output in normalized yaw-rate units, clamped to ±1)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadingPidConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Default for HeadingPidConfig {
    fn default() -> Self {
        Self {
            kp: 0.12,
            ki: 0.001,
            kd: 0.05,
        }
    }
}

/// Leader/follower control law parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FormationConfig {
    /// Formation/motion loop rate
    pub loop_rate_hz: u32,
    /// Position tolerance (meters)
    pub tolerance: f32,
    /// Maximum commanded planar speed (m/s)
    pub max_speed: f32,
    pub kp: f32,
    pub kd: f32,
    /// Feed-forward gain applied to the leader velocity
    pub velocity_gain: f32,
    /// Leader records older than this stop the follower
    pub leader_timeout_ms: u64,
    /// Leader velocity components below this are treated as zero
    pub velocity_deadband: f32,
    /// Averaged leader speed above this counts as moving
    pub motion_threshold: f32,
    pub motion_window: usize,
    pub stillness_debounce: u32,
    /// Heading difference beyond which the feed-forward vector is rotated
    pub heading_align_threshold_deg: f32,
    /// Share of `max_speed` available to the position correction term
    pub correction_share: f32,
    pub velocity_follow_heading_gain: f32,
    pub position_correct_heading_gain: f32,
    pub heading: HeadingPidConfig,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            loop_rate_hz: 100,
            tolerance: 0.15,
            max_speed: 0.3,
            kp: 0.5,
            kd: 1.8,
            velocity_gain: 1.05,
            leader_timeout_ms: 2000,
            velocity_deadband: 0.04,
            motion_threshold: 0.05,
            motion_window: MOTION_WINDOW_SAMPLES,
            stillness_debounce: STILLNESS_DEBOUNCE_TICKS,
            heading_align_threshold_deg: 10.0,
            correction_share: 0.4,
            velocity_follow_heading_gain: 0.8,
            position_correct_heading_gain: 1.2,
            heading: HeadingPidConfig::default(),
        }
    }
}

/// Point-to-point navigation parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub position_gain: f32,
    pub max_speed: f32,
    /// Within this distance only the heading is held
    pub arrival_tolerance: f32,
    /// Speed ramps down linearly inside this radius
    pub slowdown_radius: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            position_gain: 0.5,
            max_speed: 0.3,
            arrival_tolerance: 0.05,
            slowdown_radius: 0.5,
        }
    }
}

/// Simulated chassis used when no drive hardware is attached
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub start_x: f32,
    pub start_y: f32,
    /// Initial heading in degrees
    pub start_yaw: f32,
    /// Yaw rate (degrees/s) at a full-scale yaw command
    pub max_yaw_rate_dps: f32,
    pub battery_voltage: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_x: 0.0,
            start_y: 0.0,
            start_yaw: 0.0,
            max_yaw_rate_dps: 90.0,
            battery_voltage: 12.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use kafila::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("kafila.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    ///
    /// The second value is `false` when defaults were used.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            Ok((Self::from_file(path)?, true))
        } else {
            Ok((Self::default(), false))
        }
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the loops cannot run with
    pub fn validate(&self) -> Result<()> {
        self.vehicle.fixed_id()?;
        if self.link.loop_rate_hz == 0 || self.formation.loop_rate_hz == 0 {
            return Err(Error::InvalidParameter(
                "loop rates must be greater than zero".to_string(),
            ));
        }
        if self.formation.tolerance <= 0.0 || self.formation.max_speed <= 0.0 {
            return Err(Error::InvalidParameter(
                "formation tolerance and max_speed must be positive".to_string(),
            ));
        }
        if self.navigation.arrival_tolerance <= 0.0 {
            return Err(Error::InvalidParameter(
                "navigation.arrival_tolerance must be positive".to_string(),
            ));
        }
        if self.formation.motion_window == 0 {
            return Err(Error::InvalidParameter(
                "formation.motion_window must be at least 1".to_string(),
            ));
        }
        if self.formation.heading.ki <= 0.0 {
            return Err(Error::InvalidParameter(
                "formation.heading.ki must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.modem.baud_rate, 115200);
        assert_eq!(config.link.failure_threshold, 200);
        assert_eq!(config.link.cumulative_failure_threshold, 20);
        assert_eq!(config.link.health_check_interval_ms, 30_000);
        assert_eq!(config.formation.leader_timeout_ms, 2000);
        assert_eq!(config.network.broadcast_port, 8081);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_content = r#"
[modem]
port = "/dev/ttyUSB0"

[vehicle]
id = "CAR3"

[formation]
tolerance = 0.2
"#;

        let config = AppConfig::from_toml(toml_content).unwrap();
        assert_eq!(config.modem.port, "/dev/ttyUSB0");
        assert_eq!(config.modem.baud_rate, 115200);
        assert_eq!(config.formation.tolerance, 0.2);
        assert_eq!(config.formation.max_speed, 0.3);
        assert_eq!(
            config.vehicle.fixed_id().unwrap(),
            Some(VehicleId::car(3))
        );
    }

    #[test]
    fn test_toml_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kafila.toml");

        let mut config = AppConfig::default();
        config.vehicle.known_macs = vec!["78:1c:3c:8a:a5:00".to_string()];
        config.to_file(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[link]"));
        assert!(contents.contains("[formation.heading]"));

        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded.vehicle.known_macs, config.vehicle.known_macs);
        assert_eq!(loaded.link.reconnect_attempts, 3);
    }

    #[test]
    fn test_sample_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/kafila.toml");
        let config = AppConfig::from_file(path).unwrap();
        assert_eq!(config.vehicle.known_macs.len(), 4);
        assert_eq!(config.vehicle.fixed_id().unwrap(), None);
        assert_eq!(config.formation.motion_window, MOTION_WINDOW_SAMPLES);
        assert_eq!(config.link.hard_reset_attempts, 3);
        assert_eq!(config.modem.reset_timeout_ms, 10_000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_toml("[link]\nloop_rate_hz = 0\n").is_err());
        assert!(AppConfig::from_toml("[vehicle]\nid = \"\"\n").is_err());
        assert!(AppConfig::from_toml("[formation]\nmotion_window = 0\n").is_err());
        assert!(AppConfig::from_toml("[navigation]\narrival_tolerance = 0.0\n").is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, found) = AppConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert!(!found);
        assert_eq!(config.link.loop_rate_hz, 50);
    }
}
