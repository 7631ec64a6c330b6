//! Hand-landmark gesture classification and temporal stabilisation.

use std::collections::VecDeque;

use crate::fusion::{GestureLabel, GestureSample};

pub const LANDMARK_COUNT: usize = 21;
pub const STABLE_HISTORY: usize = 8;
pub const STABLE_MAJORITY: f32 = 0.55;

const INDEX_TIP: usize = 8;
const DEFAULT_HANDEDNESS: f32 = 0.5;

// (tip, pip) landmark pairs for index, middle, ring and pinky.
const FINGERS: [(usize, usize); 4] = [(8, 6), (12, 10), (16, 14), (20, 18)];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

/// One hand, in normalised image coordinates (y grows downward).
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    pub points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn from_coords(coords: &[f32]) -> Option<Self> {
        if coords.len() != LANDMARK_COUNT * 2 {
            return None;
        }
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        for (p, xy) in points.iter_mut().zip(coords.chunks_exact(2)) {
            *p = Landmark { x: xy[0], y: xy[1] };
        }
        Some(Self { points })
    }

    fn finger_up(&self, tip: usize, pip: usize) -> bool {
        self.points[tip].y < self.points[pip].y
    }
}

/// Raw per-frame classification from finger extension.
pub fn classify(hand: &HandLandmarks) -> GestureLabel {
    let [index, middle, ring, pinky] = FINGERS.map(|(tip, pip)| hand.finger_up(tip, pip));

    match (index, middle, ring, pinky) {
        (false, false, false, false) => GestureLabel::Fist,
        (true, true, true, true) => GestureLabel::Open,
        (true, true, false, false) => GestureLabel::Victory,
        (true, false, false, true) => GestureLabel::HangLoose,
        _ => GestureLabel::Pointer,
    }
}

/// Majority vote over the last few raw labels.
pub struct StableGestureFilter {
    history: VecDeque<GestureLabel>,
    stable: GestureLabel,
}

impl StableGestureFilter {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(STABLE_HISTORY),
            stable: GestureLabel::None,
        }
    }

    pub fn stable(&self) -> GestureLabel {
        self.stable
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.stable = GestureLabel::None;
    }

    pub fn push(&mut self, raw: GestureLabel) -> GestureLabel {
        self.history.push_back(raw);
        if self.history.len() > STABLE_HISTORY {
            self.history.pop_front();
        }

        // First-seen order breaks ties.
        let mut counts: Vec<(GestureLabel, usize)> = Vec::with_capacity(STABLE_HISTORY);
        for &g in &self.history {
            match counts.iter_mut().find(|(label, _)| *label == g) {
                Some((_, n)) => *n += 1,
                None => counts.push((g, 1)),
            }
        }
        let mut winner = (raw, 0usize);
        for &(label, n) in &counts {
            if n > winner.1 {
                winner = (label, n);
            }
        }

        let threshold = (self.history.len() as f32 * STABLE_MAJORITY).ceil() as usize;
        if winner.1 >= threshold {
            self.stable = winner.0;
        }
        self.stable
    }
}

impl Default for StableGestureFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns landmark frames into the samples fusion consumes.
#[derive(Default)]
pub struct GestureTracker {
    filter: StableGestureFilter,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, hand: Option<&HandLandmarks>, handedness: Option<f32>) -> GestureSample {
        let Some(hand) = hand else {
            self.filter.clear();
            return GestureSample::lost();
        };

        let gesture = self.filter.push(classify(hand));
        let tip = hand.points[INDEX_TIP];
        // The camera image is mirrored.
        GestureSample::hand(
            gesture,
            1.0 - tip.x,
            tip.y,
            handedness.unwrap_or(DEFAULT_HANDEDNESS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_with(up: [bool; 4]) -> HandLandmarks {
        let mut points = [Landmark { x: 0.5, y: 0.5 }; LANDMARK_COUNT];
        for (&(tip, pip), is_up) in FINGERS.iter().zip(up) {
            points[pip].y = 0.5;
            points[tip].y = if is_up { 0.3 } else { 0.7 };
        }
        HandLandmarks { points }
    }

    #[test]
    fn classifies_canonical_shapes() {
        assert_eq!(classify(&hand_with([false; 4])), GestureLabel::Fist);
        assert_eq!(classify(&hand_with([true; 4])), GestureLabel::Open);
        assert_eq!(
            classify(&hand_with([true, true, false, false])),
            GestureLabel::Victory
        );
        assert_eq!(
            classify(&hand_with([true, false, false, true])),
            GestureLabel::HangLoose
        );
        assert_eq!(
            classify(&hand_with([true, false, false, false])),
            GestureLabel::Pointer
        );
    }

    #[test]
    fn from_coords_requires_all_landmarks() {
        assert!(HandLandmarks::from_coords(&[0.0; 40]).is_none());
        assert!(HandLandmarks::from_coords(&[0.0; 42]).is_some());
    }

    #[test]
    fn filter_needs_majority_before_switching() {
        let mut f = StableGestureFilter::new();
        for _ in 0..STABLE_HISTORY {
            f.push(GestureLabel::Open);
        }
        assert_eq!(f.stable(), GestureLabel::Open);

        // 3 of 8 is below the 55% majority.
        for _ in 0..3 {
            assert_eq!(f.push(GestureLabel::Fist), GestureLabel::Open);
        }
        // 5 of 8 clears ceil(8 * 0.55) = 5.
        f.push(GestureLabel::Fist);
        assert_eq!(f.push(GestureLabel::Fist), GestureLabel::Fist);
    }

    #[test]
    fn single_frame_wins_on_empty_history() {
        let mut f = StableGestureFilter::new();
        assert_eq!(f.push(GestureLabel::Victory), GestureLabel::Victory);
    }

    #[test]
    fn tracker_mirrors_index_tip_and_resets_on_loss() {
        let mut hand = hand_with([true, false, false, false]);
        hand.points[INDEX_TIP] = Landmark { x: 0.2, y: 0.3 };
        let mut tracker = GestureTracker::new();

        let s = tracker.observe(Some(&hand), None);
        assert!(s.detected);
        assert_eq!(s.gesture, GestureLabel::Pointer);
        assert!((s.pointer.0 - 0.8).abs() < 1e-6);
        assert!((s.pointer.1 - 0.3).abs() < 1e-6);
        assert_eq!(s.confidence, DEFAULT_HANDEDNESS);

        assert_eq!(tracker.observe(None, Some(0.9)), GestureSample::lost());
        assert_eq!(tracker.filter.stable(), GestureLabel::None);
    }
}
