//! Adjacency matrix gating which peers' broadcasts are honored

use super::ids::{FLEET_SIZE, VehicleId};

/// Row-major adjacency, `matrix[sender][receiver]`
pub type TopologyMatrix = [[bool; FLEET_SIZE]; FLEET_SIZE];

/// Broadcast filter over the fixed fleet
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyFilter {
    matrix: TopologyMatrix,
    enabled: bool,
}

impl TopologyFilter {
    /// Fully connected, filtering disabled
    pub fn new() -> Self {
        let mut filter = Self {
            matrix: [[true; FLEET_SIZE]; FLEET_SIZE],
            enabled: false,
        };
        filter.clear_diagonal();
        filter
    }

    /// Whether a broadcast from `sender` should be acted on by `local`
    ///
    /// Ids outside the fleet cannot be a configured violation and are allowed.
    pub fn should_process(&self, sender: VehicleId, local: Option<VehicleId>) -> bool {
        if !self.enabled {
            return true;
        }
        match (sender.fleet_index(), local.and_then(|id| id.fleet_index())) {
            (Some(from), Some(to)) => self.matrix[from][to],
            _ => true,
        }
    }

    /// Replace the matrix; the diagonal is always cleared
    pub fn load_matrix(&mut self, matrix: TopologyMatrix) {
        self.matrix = matrix;
        self.clear_diagonal();
    }

    /// Load a row-major list of 0/1 entries
    pub fn load_flat(&mut self, values: &[u8; FLEET_SIZE * FLEET_SIZE]) {
        let mut matrix = [[false; FLEET_SIZE]; FLEET_SIZE];
        for (i, value) in values.iter().enumerate() {
            matrix[i / FLEET_SIZE][i % FLEET_SIZE] = *value != 0;
        }
        self.load_matrix(matrix);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn matrix(&self) -> &TopologyMatrix {
        &self.matrix
    }

    fn clear_diagonal(&mut self) {
        for i in 0..FLEET_SIZE {
            self.matrix[i][i] = false;
        }
    }
}

impl Default for TopologyFilter {
    fn default() -> Self {
        Self::new()
    }
}
