//! Gesture producers that stand in for a camera: a keyboard-driven hand and scripted replays.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::fusion::{GestureLabel, GestureSample};
use crate::gesture::{GestureTracker, HandLandmarks, LANDMARK_COUNT};
use crate::mailbox::GestureMailbox;

const DEFAULT_CONFIDENCE: f32 = 0.9;
const STOP_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScriptError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("gesture script has no steps")]
    Empty,
}

/// Virtual hand toggled from the keyboard; its pointer follows the mouse.
pub struct KeyboardHand {
    mailbox: Arc<GestureMailbox>,
    detected: bool,
    gesture: GestureLabel,
    pointer: (f32, f32),
}

impl KeyboardHand {
    pub fn new(mailbox: Arc<GestureMailbox>) -> Self {
        Self {
            mailbox,
            detected: false,
            gesture: GestureLabel::None,
            pointer: (0.5, 0.5),
        }
    }

    pub fn show(&mut self, gesture: GestureLabel) {
        self.detected = gesture != GestureLabel::None;
        self.gesture = gesture;
        self.post();
    }

    pub fn hide(&mut self) {
        self.show(GestureLabel::None);
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.pointer = (x, y);
        if self.detected {
            self.post();
        }
    }

    pub fn gesture(&self) -> Option<GestureLabel> {
        self.detected.then_some(self.gesture)
    }

    fn post(&self) {
        let sample = if self.detected {
            GestureSample::hand(self.gesture, self.pointer.0, self.pointer.1, DEFAULT_CONFIDENCE)
        } else {
            GestureSample::lost()
        };
        self.mailbox.post(sample);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptEvent {
    Lost,
    Gesture(GestureSample),
    Landmarks {
        hand: HandLandmarks,
        handedness: Option<f32>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStep {
    pub delay: Duration,
    pub event: ScriptEvent,
}

/// Timed gesture events, one per line:
///
/// ```text
/// <delay_ms> none
/// <delay_ms> gesture <label> <x> <y> [confidence]
/// <delay_ms> landmarks <x0> <y0> ... <x20> <y20> [handedness]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GestureScript {
    steps: Vec<ScriptStep>,
}

impl GestureScript {
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(|e| ScriptError::Io(e.to_string()))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut steps = Vec::new();
        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            steps.push(parse_step(line, line_no)?);
        }
        if steps.is_empty() {
            return Err(ScriptError::Empty);
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }
}

fn parse_step(line: &str, line_no: usize) -> Result<ScriptStep, ScriptError> {
    let err = |message: String| ScriptError::Parse {
        line: line_no,
        message,
    };

    let mut parts = line.split_whitespace();
    let delay_raw = parts.next().ok_or_else(|| err("missing delay".to_string()))?;
    let delay_ms = delay_raw
        .parse::<u64>()
        .map_err(|_| err(format!("invalid delay '{delay_raw}'")))?;
    let kind = parts
        .next()
        .ok_or_else(|| err("missing event kind".to_string()))?;
    let args = parts
        .map(|s| {
            s.parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or(s)
        })
        .collect::<Vec<_>>();

    let event = match kind {
        "none" => {
            if !args.is_empty() {
                return Err(err("'none' takes no arguments".to_string()));
            }
            ScriptEvent::Lost
        }
        "gesture" => {
            // The label is the first argument and is not numeric.
            let mut rest = line.split_whitespace().skip(2);
            let label_raw = rest
                .next()
                .ok_or_else(|| err("missing gesture label".to_string()))?;
            let label = GestureLabel::parse(label_raw)
                .ok_or_else(|| err(format!("unknown gesture '{label_raw}'")))?;
            let nums = numbers(&args[1..]).map_err(|bad| err(format!("invalid number '{bad}'")))?;
            let (x, y, confidence) = match nums.as_slice() {
                [x, y] => (*x, *y, DEFAULT_CONFIDENCE),
                [x, y, c] => (*x, *y, *c),
                _ => return Err(err("gesture expects <label> <x> <y> [confidence]".to_string())),
            };
            if label == GestureLabel::None {
                ScriptEvent::Lost
            } else {
                ScriptEvent::Gesture(GestureSample::hand(label, x, y, confidence))
            }
        }
        "landmarks" => {
            let nums = numbers(&args).map_err(|bad| err(format!("invalid number '{bad}'")))?;
            let coords = LANDMARK_COUNT * 2;
            let handedness = match nums.len() {
                n if n == coords => None,
                n if n == coords + 1 => Some(nums[coords].clamp(0.0, 1.0)),
                n => {
                    return Err(err(format!(
                        "landmarks expects {coords} coordinates (+ optional handedness), got {n}"
                    )));
                }
            };
            let hand = HandLandmarks::from_coords(&nums[..coords])
                .ok_or_else(|| err("malformed landmark list".to_string()))?;
            ScriptEvent::Landmarks { hand, handedness }
        }
        other => return Err(err(format!("unknown event kind '{other}'"))),
    };

    Ok(ScriptStep {
        delay: Duration::from_millis(delay_ms),
        event,
    })
}

fn numbers<'a>(args: &[Result<f32, &'a str>]) -> Result<Vec<f32>, &'a str> {
    args.iter().copied().collect()
}

/// Replays a script into the mailbox from a worker thread.
pub struct ScriptFeed {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ScriptFeed {
    pub fn start(script: GestureScript, mailbox: Arc<GestureMailbox>, looping: bool) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let handle = thread::spawn(move || replay(&script, &mailbox, &stop_for_thread, looping));
        log::info!("gesture script feed started (loop={looping})");
        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }
}

impl Drop for ScriptFeed {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
        log::info!("gesture script feed stopped");
    }
}

fn replay(script: &GestureScript, mailbox: &GestureMailbox, stop: &AtomicBool, looping: bool) {
    let mut tracker = GestureTracker::new();
    loop {
        for step in script.steps() {
            if !sleep_unless_stopped(step.delay, stop) {
                return;
            }
            let sample = match &step.event {
                ScriptEvent::Lost => {
                    tracker.observe(None, None);
                    GestureSample::lost()
                }
                ScriptEvent::Gesture(s) => *s,
                ScriptEvent::Landmarks { hand, handedness } => tracker.observe(Some(hand), *handedness),
            };
            mailbox.post(sample);
        }
        if !looping {
            return;
        }
    }
}

fn sleep_unless_stopped(delay: Duration, stop: &AtomicBool) -> bool {
    let mut left = delay;
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        if left.is_zero() {
            return true;
        }
        let nap = left.min(STOP_POLL);
        thread::sleep(nap);
        left -= nap;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_hand_posts_only_while_visible() {
        let mb = Arc::new(GestureMailbox::new());
        let mut hand = KeyboardHand::new(Arc::clone(&mb));
        hand.move_to(0.1, 0.2);
        assert_eq!(mb.posted(), 0);

        hand.show(GestureLabel::Fist);
        let s = mb.latest();
        assert!(s.detected);
        assert_eq!(s.gesture, GestureLabel::Fist);
        assert_eq!(s.pointer, (0.1, 0.2));

        hand.move_to(0.7, 0.4);
        assert_eq!(mb.latest().pointer, (0.7, 0.4));

        hand.hide();
        assert_eq!(mb.latest(), GestureSample::lost());
        assert_eq!(hand.gesture(), None);
    }

    #[test]
    fn gesture_none_line_means_hand_lost() {
        let script = GestureScript::parse("0 gesture none 0.5 0.5").unwrap();
        assert_eq!(script.steps()[0].event, ScriptEvent::Lost);
    }

    #[test]
    fn finite_script_runs_to_completion() {
        let mb = Arc::new(GestureMailbox::new());
        let script = GestureScript::parse("0 gesture open 0.25 0.75\n0 gesture fist 0.5 0.5 0.6").unwrap();
        let feed = ScriptFeed::start(script, Arc::clone(&mb), false);
        while !feed.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        drop(feed);
        assert_eq!(mb.posted(), 2);
        let s = mb.latest();
        assert_eq!(s.gesture, GestureLabel::Fist);
        assert!((s.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn dropping_a_looping_feed_stops_it() {
        let mb = Arc::new(GestureMailbox::new());
        let script = GestureScript::parse("5 gesture victory 0.5 0.5\n5 none").unwrap();
        let feed = ScriptFeed::start(script, Arc::clone(&mb), true);
        thread::sleep(Duration::from_millis(30));
        drop(feed);
        let after = mb.posted();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(mb.posted(), after);
    }
}
