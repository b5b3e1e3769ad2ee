//! Send-failure bookkeeping for the data channel

use super::state::ConnectionHealth;

/// Failure counters and timers of a Ready session
///
/// Reset on every Init attempt and on a successful data channel reopen.
#[derive(Debug, Clone, Default)]
pub struct LinkHealth {
    pub health: ConnectionHealth,
    /// Failed status sends since the last success
    pub consecutive_failures: u32,
    /// Failed sends since the last success or data channel rebuild
    pub cumulative_failures: u32,
    pub last_status_ms: Option<u64>,
    pub last_check_ms: u64,
    pub connected_since_ms: u64,
}

impl LinkHealth {
    /// Fresh session starting at `now_ms`
    pub fn start(now_ms: u64) -> Self {
        Self {
            last_check_ms: now_ms,
            connected_since_ms: now_ms,
            ..Self::default()
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.cumulative_failures = 0;
    }

    /// Count a failed send; marks the channel disconnected at `threshold`
    pub fn record_failure(&mut self, threshold: u32) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.cumulative_failures = self.cumulative_failures.saturating_add(1);
        if self.consecutive_failures >= threshold {
            self.health = ConnectionHealth::Disconnected;
        }
    }

    /// Whether a status send is due
    pub fn status_due(&self, now_ms: u64, spacing_ms: u64) -> bool {
        self.last_status_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= spacing_ms)
    }
}
