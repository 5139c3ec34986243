use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

/// Longest delta a single frame may report, in seconds.
const MAX_FRAME_DT: f64 = 0.25;

/// Wall-clock frame timing for a variable-step poll/draw loop.
pub struct FrameClock {
    pub frame_count: u64,
    pub total_time: f64,
    real_dt: f64,
    last_instant: Instant,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            total_time: 0.0,
            real_dt: 0.0,
            last_instant: Instant::now(),
            fps_samples: [1.0 / 60.0; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 60.0,
            smoothed_frame_time_ms: 16.667,
        }
    }

    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.record(elapsed);
    }

    /// Seconds covered by the current frame.
    pub fn dt(&self) -> f64 {
        self.real_dt
    }

    fn record(&mut self, elapsed: f64) {
        // A stalled frame (window drag, debugger) must not fast-forward fades.
        self.real_dt = if elapsed > MAX_FRAME_DT {
            log::warn!(
                "Frame took {:.1}ms, capping delta to {}ms",
                elapsed * 1000.0,
                MAX_FRAME_DT * 1000.0
            );
            MAX_FRAME_DT
        } else {
            elapsed
        };
        self.total_time += self.real_dt;
        self.frame_count += 1;

        self.fps_samples[self.fps_sample_index] = self.real_dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_frames_and_accumulates_time() {
        let mut clock = FrameClock::new();
        clock.record(0.01);
        clock.record(0.02);
        assert_eq!(clock.frame_count, 2);
        assert!((clock.total_time - 0.03).abs() < 1e-9);
        assert!((clock.dt() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn long_frames_are_capped() {
        let mut clock = FrameClock::new();
        clock.record(2.0);
        assert_eq!(clock.dt(), MAX_FRAME_DT);
    }

    #[test]
    fn smoothed_fps_converges_to_steady_rate() {
        let mut clock = FrameClock::new();
        for _ in 0..FPS_SAMPLE_COUNT {
            clock.record(1.0 / 30.0);
        }
        assert!((clock.smoothed_fps - 30.0).abs() < 1e-6);
        assert!((clock.smoothed_frame_time_ms - 33.333).abs() < 0.01);
    }
}
