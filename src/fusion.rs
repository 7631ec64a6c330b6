//! Resolves which input source drives the field each frame.

use crate::modes::ModeKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    None,
    Pointer,
    Fist,
    Victory,
    HangLoose,
    Open,
}

impl GestureLabel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "pointer" => Some(Self::Pointer),
            "fist" => Some(Self::Fist),
            "victory" => Some(Self::Victory),
            "hang_loose" | "hangloose" => Some(Self::HangLoose),
            "open" => Some(Self::Open),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pointer => "pointer",
            Self::Fist => "fist",
            Self::Victory => "victory",
            Self::HangLoose => "hang_loose",
            Self::Open => "open",
        }
    }

    pub fn mode_key(self) -> ModeKey {
        match self {
            Self::None => ModeKey::Idle,
            Self::Pointer => ModeKey::Pointer,
            Self::Fist => ModeKey::Fist,
            Self::Victory => ModeKey::Victory,
            Self::HangLoose => ModeKey::HangLoose,
            Self::Open => ModeKey::Open,
        }
    }

    pub(crate) fn index(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Pointer => 1,
            Self::Fist => 2,
            Self::Victory => 3,
            Self::HangLoose => 4,
            Self::Open => 5,
        }
    }

    pub(crate) fn from_index(i: u32) -> Self {
        match i {
            1 => Self::Pointer,
            2 => Self::Fist,
            3 => Self::Victory,
            4 => Self::HangLoose,
            5 => Self::Open,
            _ => Self::None,
        }
    }
}

/// Pointer device state in normalised canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub active: bool,
    pub x: f32,
    pub y: f32,
}

impl PointerSample {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            active: true,
            x: clamp01(x),
            y: clamp01(y),
        }
    }

    pub fn inactive() -> Self {
        Self {
            active: false,
            x: 0.5,
            y: 0.5,
        }
    }
}

impl Default for PointerSample {
    fn default() -> Self {
        Self::inactive()
    }
}

/// Latest output of the hand-tracking source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSample {
    pub detected: bool,
    pub gesture: GestureLabel,
    pub pointer: (f32, f32),
    pub confidence: f32,
}

impl GestureSample {
    pub fn lost() -> Self {
        Self {
            detected: false,
            gesture: GestureLabel::None,
            pointer: (0.5, 0.5),
            confidence: 0.0,
        }
    }

    pub fn hand(gesture: GestureLabel, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            detected: true,
            gesture,
            pointer: (clamp01(x), clamp01(y)),
            confidence: clamp01(confidence),
        }
    }
}

impl Default for GestureSample {
    fn default() -> Self {
        Self::lost()
    }
}

/// Authoritative interaction pointer after fusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionPointer {
    pub active: bool,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Gesture,
    Pointer,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionStatus {
    Gesture,
    Pointer,
    /// Camera on, no hand in view, no pointer.
    AwaitingHand,
    Idle,
}

impl FusionStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Gesture => "Gesture",
            Self::Pointer | Self::Idle => "Mouse",
            Self::AwaitingHand => "Camera standby",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub mode: ModeKey,
    pub pointer: InteractionPointer,
    pub source: InputSource,
    pub status: FusionStatus,
    /// True only on the frame the mode key changed.
    pub mode_changed: bool,
}

pub struct InputFusion {
    active_mode: ModeKey,
}

impl InputFusion {
    pub fn new() -> Self {
        Self {
            active_mode: ModeKey::Idle,
        }
    }

    pub fn active_mode(&self) -> ModeKey {
        self.active_mode
    }

    /// Gesture (camera on and hand detected) wins over an active pointer, which wins over idle.
    pub fn resolve(
        &mut self,
        camera_active: bool,
        gesture: &GestureSample,
        pointer: &PointerSample,
    ) -> Resolution {
        let (mode, interaction, source, status) = if camera_active && gesture.detected {
            (
                gesture.gesture.mode_key(),
                InteractionPointer {
                    active: true,
                    x: gesture.pointer.0,
                    y: gesture.pointer.1,
                },
                InputSource::Gesture,
                FusionStatus::Gesture,
            )
        } else if pointer.active {
            (
                ModeKey::Pointer,
                InteractionPointer {
                    active: true,
                    x: pointer.x,
                    y: pointer.y,
                },
                InputSource::Pointer,
                FusionStatus::Pointer,
            )
        } else {
            let status = if camera_active {
                FusionStatus::AwaitingHand
            } else {
                FusionStatus::Idle
            };
            (
                ModeKey::Idle,
                InteractionPointer {
                    active: false,
                    x: 0.5,
                    y: 0.5,
                },
                InputSource::None,
                status,
            )
        };

        let mode_changed = mode != self.active_mode;
        self.active_mode = mode;

        Resolution {
            mode,
            pointer: interaction,
            source,
            status,
            mode_changed,
        }
    }
}

impl Default for InputFusion {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp01(v: f32) -> f32 {
    if v.is_nan() { 0.5 } else { v.clamp(0.0, 1.0) }
}
