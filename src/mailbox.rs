use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::fusion::{GestureLabel, GestureSample};

/// Single-slot, last-value-wins cell between the gesture producer and the frame loop.
///
/// Writers never block; readers retry while a write is in flight.
pub struct GestureMailbox {
    seq: AtomicU64,
    detected: AtomicU32,
    gesture: AtomicU32,
    x: AtomicU32,
    y: AtomicU32,
    confidence: AtomicU32,
    posted: AtomicU64,
}

impl GestureMailbox {
    pub fn new() -> Self {
        let lost = GestureSample::lost();
        Self {
            seq: AtomicU64::new(0),
            detected: AtomicU32::new(0),
            gesture: AtomicU32::new(lost.gesture.index()),
            x: AtomicU32::new(lost.pointer.0.to_bits()),
            y: AtomicU32::new(lost.pointer.1.to_bits()),
            confidence: AtomicU32::new(0),
            posted: AtomicU64::new(0),
        }
    }

    pub fn post(&self, s: GestureSample) {
        self.seq.fetch_add(1, Ordering::Release); // odd => write in progress
        self.detected
            .store(if s.detected { 1 } else { 0 }, Ordering::Relaxed);
        self.gesture.store(s.gesture.index(), Ordering::Relaxed);
        self.x.store(s.pointer.0.to_bits(), Ordering::Relaxed);
        self.y.store(s.pointer.1.to_bits(), Ordering::Relaxed);
        self.confidence
            .store(s.confidence.to_bits(), Ordering::Relaxed);
        self.posted.fetch_add(1, Ordering::Relaxed);
        self.seq.fetch_add(1, Ordering::Release); // even => stable
    }

    pub fn latest(&self) -> GestureSample {
        loop {
            let v1 = self.seq.load(Ordering::Acquire);
            if v1 & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let detected = self.detected.load(Ordering::Relaxed) != 0;
            let gesture = GestureLabel::from_index(self.gesture.load(Ordering::Relaxed));
            let x = f32::from_bits(self.x.load(Ordering::Relaxed));
            let y = f32::from_bits(self.y.load(Ordering::Relaxed));
            let confidence = f32::from_bits(self.confidence.load(Ordering::Relaxed));

            let v2 = self.seq.load(Ordering::Acquire);
            if v1 == v2 {
                return GestureSample {
                    detected,
                    gesture,
                    pointer: (x, y),
                    confidence,
                };
            }
        }
    }

    /// Number of samples posted so far.
    pub fn posted(&self) -> u64 {
        self.posted.load(Ordering::Relaxed)
    }
}

impl Default for GestureMailbox {
    fn default() -> Self {
        Self::new()
    }
}
