//! Debounced leader motion detection

/// Samples in the leader speed moving average
pub const MOTION_WINDOW_SAMPLES: usize = 1;
/// Consecutive slow samples before the leader is reported stationary
pub const STILLNESS_DEBOUNCE_TICKS: u32 = 4;

/// Decides whether the leader is moving from its broadcast velocity
///
/// A moving average over the last `window` samples is compared against the
/// threshold. Going from moving to stationary needs `debounce` consecutive
/// slow samples; going the other way is immediate.
#[derive(Debug, Clone)]
pub struct MotionDetector {
    threshold: f32,
    window: usize,
    debounce: u32,
    history: Vec<(f32, f32)>,
    next: usize,
    still_count: u32,
}

impl MotionDetector {
    pub fn new(threshold: f32, window: usize, debounce: u32) -> Self {
        Self {
            threshold,
            window: window.max(1),
            debounce,
            history: Vec::with_capacity(window.max(1)),
            next: 0,
            still_count: 0,
        }
    }

    /// Feed one velocity sample; returns `true` while the leader counts as moving
    pub fn update(&mut self, vx: f32, vy: f32) -> bool {
        let window = self.window;
        if self.history.is_empty() {
            // Seed the whole window so the first average is the first sample
            self.history.resize(window, (vx, vy));
        }
        self.history[self.next] = (vx, vy);
        self.next = (self.next + 1) % window;

        let n = self.history.len() as f32;
        let (sum_x, sum_y) = self
            .history
            .iter()
            .fold((0.0, 0.0), |(ax, ay), (x, y)| (ax + x, ay + y));
        let speed = (sum_x / n).hypot(sum_y / n);

        if speed > self.threshold {
            self.still_count = 0;
            true
        } else {
            self.still_count = self.still_count.saturating_add(1);
            self.still_count < self.debounce
        }
    }

    /// Forget history and the stillness count (leader lost or role change)
    pub fn reset(&mut self) {
        self.history.clear();
        self.next = 0;
        self.still_count = 0;
    }
}
