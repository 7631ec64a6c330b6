use crate::config::QualityTier;

/// Hysteresis configuration for the adaptive quality controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveThresholds {
    pub low_fps_threshold: f32,
    pub high_fps_threshold: f32,
    pub low_streak_frames: u32,
    pub high_streak_frames: u32,
}

impl Default for AdaptiveThresholds {
    fn default() -> Self {
        Self {
            low_fps_threshold: 27.0,
            high_fps_threshold: 56.0,
            low_streak_frames: 220,
            high_streak_frames: 520,
        }
    }
}

/// Requests a coarser or finer tier after a sustained run of slow or fast frames.
#[derive(Debug, Clone, Default)]
pub struct AdaptiveQuality {
    thresholds: AdaptiveThresholds,
    low_streak: u32,
    high_streak: u32,
}

impl AdaptiveQuality {
    pub fn new(thresholds: AdaptiveThresholds) -> Self {
        Self {
            thresholds,
            low_streak: 0,
            high_streak: 0,
        }
    }

    pub fn thresholds(&self) -> &AdaptiveThresholds {
        &self.thresholds
    }

    /// Current `(low_streak, high_streak)`.
    pub fn streaks(&self) -> (u32, u32) {
        (self.low_streak, self.high_streak)
    }

    pub fn reset(&mut self) {
        self.low_streak = 0;
        self.high_streak = 0;
    }

    pub fn update(&mut self, fps: f32, current: QualityTier) -> Option<QualityTier> {
        if !fps.is_finite() {
            return None;
        }

        let t = self.thresholds;
        if fps < t.low_fps_threshold {
            self.low_streak = self.low_streak.saturating_add(1);
            self.high_streak = self.high_streak.saturating_sub(1);
        } else if fps > t.high_fps_threshold {
            self.high_streak = self.high_streak.saturating_add(1);
            self.low_streak = self.low_streak.saturating_sub(1);
        } else {
            self.low_streak = self.low_streak.saturating_sub(1);
            self.high_streak = self.high_streak.saturating_sub(1);
        }

        if self.low_streak >= t.low_streak_frames {
            self.reset();
            return current.coarser();
        }

        if self.high_streak >= t.high_streak_frames {
            self.reset();
            return current.finer();
        }

        None
    }
}
