pub const DEFAULT_SAMPLE_WINDOW: usize = 30;

/// Moving average of instantaneous frame rate over a fixed window of frames.
pub struct FrameRateMonitor {
    vals: Vec<f32>,
    len: usize,
    pos: usize,
    last_fps: f32,
}

impl FrameRateMonitor {
    pub fn new(window: usize) -> Self {
        Self {
            vals: vec![0.0; window.max(1)],
            len: 0,
            pos: 0,
            last_fps: 0.0,
        }
    }

    pub fn window(&self) -> usize {
        self.vals.len()
    }

    /// Feeds one frame's delta time (seconds) and returns the smoothed FPS.
    ///
    /// Non-positive or non-finite deltas carry no signal: the window is left
    /// untouched and `None` is returned.
    pub fn update(&mut self, dt: f32) -> Option<f32> {
        if !dt.is_finite() || dt <= 0.0 {
            return None;
        }

        self.vals[self.pos] = 1.0 / dt;
        self.pos = (self.pos + 1) % self.vals.len();
        if self.len < self.vals.len() {
            self.len += 1;
        }

        let sum: f32 = self.vals[..self.len].iter().sum();
        self.last_fps = sum / self.len as f32;
        Some(self.last_fps)
    }

    pub fn fps(&self) -> f32 {
        self.last_fps
    }

    pub fn samples(&self) -> usize {
        self.len
    }

    pub fn reset(&mut self) {
        self.len = 0;
        self.pos = 0;
        self.last_fps = 0.0;
    }
}

impl Default for FrameRateMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_WINDOW)
    }
}
