//! Frame pacing and FPS statistics.

use std::collections::VecDeque;

use web_time::{Duration, Instant};

/// Number of frame times kept for the min/max/avg statistics.
pub const HISTORY_LEN: usize = 128;

/// Longest delta handed to the simulation; longer stalls (debugger,
/// window drag) are clamped to this.
pub const MAX_DELTA: Duration = Duration::from_secs(1);

/// Summary of the recent frame-rate history.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FpsStats {
    /// Slowest frame rate in the window.
    pub min: f32,
    /// Fastest frame rate in the window.
    pub max: f32,
    /// Mean frame rate in the window.
    pub avg: f32,
}

/// Frame timing with delta clamping, smoothed FPS and a rolling history.
pub struct FrameTiming {
    /// Target FPS (0 = unlimited)
    target_fps: u32,
    /// Minimum frame duration based on target FPS
    min_frame_duration: Duration,
    /// Last frame timestamp
    last_frame: Instant,
    /// Clamped duration of the last frame
    delta: Duration,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
    history: VecDeque<f32>,
}

impl FrameTiming {
    /// Create a new frame timer with the given FPS target (0 = unlimited).
    pub fn new(target_fps: u32) -> Self {
        let min_frame_duration = if target_fps > 0 {
            Duration::from_secs_f64(1.0 / target_fps as f64)
        } else {
            Duration::ZERO
        };

        Self {
            target_fps,
            min_frame_duration,
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            smoothed_fps: 60.0,
            smoothing: 0.05,
            history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    /// Whether enough time has passed since the last frame to render
    /// another one.
    pub fn should_render(&self) -> bool {
        if self.target_fps == 0 {
            return true;
        }
        self.last_frame.elapsed() >= self.min_frame_duration
    }

    /// Call once per frame; returns the clamped delta in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.record(elapsed)
    }

    fn record(&mut self, elapsed: Duration) -> f32 {
        self.delta = elapsed.min(MAX_DELTA);
        let frame_time = elapsed.as_secs_f32();
        if frame_time > 0.0 {
            let instant_fps = 1.0 / frame_time;
            self.smoothed_fps = self.smoothed_fps * (1.0 - self.smoothing)
                + instant_fps * self.smoothing;
            if self.history.len() == HISTORY_LEN {
                let _ = self.history.pop_front();
            }
            self.history.push_back(instant_fps);
        }
        self.delta.as_secs_f32()
    }

    /// Clamped duration of the last frame, in seconds.
    pub fn delta(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Smoothed FPS.
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }

    /// Min / max / average over the last [`HISTORY_LEN`] frames.
    pub fn stats(&self) -> FpsStats {
        if self.history.is_empty() {
            return FpsStats::default();
        }
        let (min, max, sum) = self.history.iter().fold(
            (f32::MAX, f32::MIN, 0.0),
            |(min, max, sum), &fps| (min.min(fps), max.max(fps), sum + fps),
        );
        FpsStats {
            min,
            max,
            avg: sum / self.history.len() as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_stalls_are_clamped() {
        let mut timing = FrameTiming::new(0);
        let dt = timing.record(Duration::from_secs(5));
        assert_eq!(dt, 1.0);
        assert_eq!(timing.delta(), 1.0);
    }

    #[test]
    fn history_is_bounded_and_summarized() {
        let mut timing = FrameTiming::new(0);
        let _ = timing.record(Duration::from_millis(100));
        let _ = timing.record(Duration::from_millis(50));
        let stats = timing.stats();
        assert!((stats.min - 10.0).abs() < 1e-3);
        assert!((stats.max - 20.0).abs() < 1e-3);
        assert!((stats.avg - 15.0).abs() < 1e-3);

        for _ in 0..HISTORY_LEN {
            let _ = timing.record(Duration::from_millis(10));
        }
        assert_eq!(timing.history.len(), HISTORY_LEN);
        assert!((timing.stats().min - 100.0).abs() < 1e-2);
    }

    #[test]
    fn unlimited_target_always_renders() {
        assert!(FrameTiming::new(0).should_render());
    }
}
