//! Linear volume ramps driven by frame time.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    pub direction: FadeDirection,
    /// Seconds.
    pub duration: f32,
    pub elapsed: f32,
}

impl Fade {
    pub fn new(direction: FadeDirection, duration_ms: u32) -> Self {
        Self {
            direction,
            duration: duration_ms as f32 / 1000.0,
            elapsed: 0.0,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
    }

    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Multiplier applied on top of the player volume.
    pub fn gain(&self) -> f32 {
        match self.direction {
            FadeDirection::In => self.progress(),
            FadeDirection::Out => 1.0 - self.progress(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}
