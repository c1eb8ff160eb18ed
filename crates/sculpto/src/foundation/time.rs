//! Frame timing utilities.

use std::time::Instant;

/// Wall-clock frame timer.
///
/// Tracks delta time between `update` calls and total elapsed time since
/// creation. Feed the delta into `Scene::update` to run the scene clock in
/// real time, or use a fixed step and keep the timer for measurement.
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer starting now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer; call once per frame.
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Time since the last frame in seconds.
    #[must_use]
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Total elapsed time since timer creation in seconds.
    #[must_use]
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Frames counted so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Fixed-cadence accumulator for rate-limited updates.
///
/// Rendering runs every frame; script updates are throttled to a fixed
/// cadence independent of render rate. Accumulate delta time and fire once
/// the threshold is reached.
#[derive(Debug, Clone, Copy)]
pub struct UpdateAccumulator {
    accumulated: f32,
    threshold: f32,
}

impl UpdateAccumulator {
    /// Create an accumulator firing every `threshold` seconds.
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        Self {
            accumulated: 0.0,
            threshold,
        }
    }

    /// Add frame delta time; returns true when an update is due, resetting
    /// the accumulator.
    pub fn tick(&mut self, delta_time: f32) -> bool {
        self.accumulated += delta_time;
        if self.accumulated > self.threshold {
            self.accumulated = 0.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_tracks_delta_and_total() {
        let mut timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        timer.update();
        assert!(timer.delta_time() > 0.0);
        assert!((timer.total_time() - timer.delta_time()).abs() < f32::EPSILON);
        assert_eq!(timer.frame_count(), 1);
    }

    #[test]
    fn accumulator_fires_at_threshold() {
        let mut acc = UpdateAccumulator::new(0.015);
        assert!(!acc.tick(0.010));
        assert!(acc.tick(0.010));
        // Reset after firing.
        assert!(!acc.tick(0.010));
    }

    #[test]
    fn accumulator_fires_once_for_large_delta() {
        let mut acc = UpdateAccumulator::new(0.015);
        assert!(acc.tick(1.0));
        assert!(!acc.tick(0.0));
    }
}
