/// Frame rate over a sliding window of frame timestamps
use std::collections::VecDeque;
use std::time::Instant;

pub const DEFAULT_WINDOW: usize = 64;

pub struct FpsMeter {
    window: usize,
    timestamps: VecDeque<Instant>,
}

impl FpsMeter {
    /// Meter averaging over the last `window` frames (at least two).
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            window,
            timestamps: VecDeque::with_capacity(window),
        }
    }

    /// Record a frame finished at `now`.
    pub fn tick(&mut self, now: Instant) {
        if self.timestamps.len() == self.window {
            self.timestamps.pop_front();
        }
        self.timestamps.push_back(now);
    }

    /// Frames per second across the window, once two frames are recorded.
    pub fn fps(&self) -> Option<f32> {
        let (oldest, newest) = (self.timestamps.front()?, self.timestamps.back()?);
        let span = newest.duration_since(*oldest).as_secs_f32();
        if span <= 0.0 {
            return None;
        }
        Some((self.timestamps.len() - 1) as f32 / span)
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_needs_two_frames() {
        let mut meter = FpsMeter::new(4);
        assert_eq!(meter.fps(), None);
        meter.tick(Instant::now());
        assert_eq!(meter.fps(), None);
    }

    #[test]
    fn test_steady_rate() {
        let start = Instant::now();
        let mut meter = FpsMeter::new(8);
        for i in 0..5 {
            meter.tick(start + Duration::from_millis(20 * i));
        }
        let fps = meter.fps().unwrap();
        assert!((fps - 50.0).abs() < 0.01, "fps = {fps}");
    }

    #[test]
    fn test_window_slides() {
        let start = Instant::now();
        let mut meter = FpsMeter::new(3);
        // Slow frames first, then three at 100 fps.
        meter.tick(start);
        meter.tick(start + Duration::from_secs(1));
        for i in 1..=3 {
            meter.tick(start + Duration::from_secs(1) + Duration::from_millis(10 * i));
        }
        let fps = meter.fps().unwrap();
        assert!((fps - 100.0).abs() < 0.01, "fps = {fps}");
    }
}
