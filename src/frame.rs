use std::time::Instant;

/// Step used for the very first frame, before there is a previous timestamp.
pub const FIRST_FRAME_DELTA: f64 = 1.0 / 60.0;

/// Turns frame timestamps (seconds) into time steps.
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick. Timestamps going backwards yield 0.
    pub fn tick(&mut self, now: f64) -> f64 {
        let delta = match self.last {
            Some(last) => (now - last).max(0.0),
            None => FIRST_FRAME_DELTA,
        };
        self.last = Some(now);
        delta
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Frames per second, recomputed once at least a second has passed.
#[derive(Debug)]
pub struct PerformanceMonitor {
    epoch: Instant,
    frame_count: u32,
    window_start: Option<f64>,
    fps: f64,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self {
            epoch: Instant::now(),
            frame_count: 0,
            window_start: None,
            fps: 0.0,
        }
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a frame at the current wall-clock time. Returns true when the FPS figure changed.
    pub fn frame(&mut self) -> bool {
        let now = self.epoch.elapsed().as_secs_f64();
        self.frame_at(now)
    }

    /// Counts a frame at `now` seconds.
    pub fn frame_at(&mut self, now: f64) -> bool {
        self.frame_count += 1;
        let start = *self.window_start.get_or_insert(now);

        let elapsed = now - start;
        if elapsed >= 1.0 {
            self.fps = self.frame_count as f64 / elapsed;
            self.frame_count = 0;
            self.window_start = Some(now);
            return true;
        }
        false
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn log_metrics(&self) {
        log::info!("FPS: {:.1}", self.fps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_uses_nominal_step() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(10.0), FIRST_FRAME_DELTA);
        assert_eq!(clock.tick(10.5), 0.5);
        assert_eq!(clock.tick(10.25), 0.0);

        clock.reset();
        assert_eq!(clock.tick(42.0), FIRST_FRAME_DELTA);
    }

    #[test]
    fn fps_updates_once_per_second() {
        let mut monitor = PerformanceMonitor::new();
        assert!(!monitor.frame_at(0.0));
        for i in 1..60 {
            assert!(!monitor.frame_at(i as f64 / 60.0));
        }
        assert_eq!(monitor.fps(), 0.0);

        assert!(monitor.frame_at(1.0));
        assert_eq!(monitor.fps(), 61.0);
        assert!(!monitor.frame_at(1.5));
    }
}
