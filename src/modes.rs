//! Interaction modes and the per-frame parameter blender.

/// Blend factor applied per frame when reduced motion is off.
pub const BLEND_FACTOR: f32 = 0.08;
/// Blend factor applied per frame under reduced motion.
pub const BLEND_FACTOR_REDUCED: f32 = 0.18;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn to_u8(self) -> (u8, u8, u8) {
        (unit_to_u8(self.r), unit_to_u8(self.g), unit_to_u8(self.b))
    }
}

fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKey {
    Idle,
    Pointer,
    Fist,
    Victory,
    HangLoose,
    Open,
}

impl ModeKey {
    pub const ALL: [Self; 6] = [
        Self::Idle,
        Self::Pointer,
        Self::Fist,
        Self::Victory,
        Self::HangLoose,
        Self::Open,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" | "none" => Some(Self::Idle),
            "pointer" => Some(Self::Pointer),
            "fist" => Some(Self::Fist),
            "victory" => Some(Self::Victory),
            "hang_loose" | "hangloose" => Some(Self::HangLoose),
            "open" => Some(Self::Open),
            _ => None,
        }
    }

    /// Unknown keys fall back to Idle.
    pub fn parse_or_idle(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Idle)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pointer => "pointer",
            Self::Fist => "fist",
            Self::Victory => "victory",
            Self::HangLoose => "hang_loose",
            Self::Open => "open",
        }
    }

    pub fn mode(self) -> &'static Mode {
        Mode::get(self)
    }
}

/// Immutable parameter template for one interaction mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Mode {
    pub key: ModeKey,
    pub label: &'static str,
    pub status_label: &'static str,
    pub time_speed: f32,
    pub rotation_speed: f32,
    pub point_size: f32,
    pub influence_radius: f32,
    pub sink_strength: f32,
    pub burst_strength: f32,
    pub freeze: bool,
    pub color: Rgb,
}

static MODES: [Mode; 6] = [
    Mode {
        key: ModeKey::Idle,
        label: "Idle",
        status_label: "No gesture detected",
        time_speed: 0.9,
        rotation_speed: 0.001,
        point_size: 1.0,
        influence_radius: 32.0,
        sink_strength: 9.0,
        burst_strength: 8.0,
        freeze: false,
        color: Rgb::new(0.35, 0.62, 0.95),
    },
    Mode {
        key: ModeKey::Pointer,
        label: "Free control",
        status_label: "Free control",
        time_speed: 1.1,
        rotation_speed: 0.002,
        point_size: 1.0,
        influence_radius: 36.0,
        sink_strength: 14.0,
        burst_strength: 10.0,
        freeze: false,
        color: Rgb::new(0.28, 0.82, 0.98),
    },
    Mode {
        key: ModeKey::Fist,
        label: "Impact",
        status_label: "Impact mode",
        time_speed: 2.8,
        rotation_speed: 0.016,
        point_size: 1.15,
        influence_radius: 42.0,
        sink_strength: 16.0,
        burst_strength: 22.0,
        freeze: false,
        color: Rgb::new(1.0, 0.42, 0.22),
    },
    Mode {
        key: ModeKey::Victory,
        label: "Macro",
        status_label: "Macro zoom",
        time_speed: 0.52,
        rotation_speed: 0.0006,
        point_size: 2.2,
        influence_radius: 45.0,
        sink_strength: 8.0,
        burst_strength: 8.0,
        freeze: false,
        color: Rgb::new(0.35, 1.0, 0.64),
    },
    Mode {
        key: ModeKey::HangLoose,
        label: "Freeze",
        status_label: "Frozen",
        time_speed: 0.0,
        rotation_speed: 0.0,
        point_size: 1.25,
        influence_radius: 24.0,
        sink_strength: 4.0,
        burst_strength: 0.0,
        freeze: true,
        color: Rgb::new(0.9, 0.95, 1.0),
    },
    Mode {
        key: ModeKey::Open,
        label: "Zen",
        status_label: "Zen mode",
        time_speed: 0.25,
        rotation_speed: 0.00045,
        point_size: 0.9,
        influence_radius: 34.0,
        sink_strength: 9.0,
        burst_strength: 5.0,
        freeze: false,
        color: Rgb::new(0.32, 0.92, 1.0),
    },
];

impl Mode {
    pub fn get(key: ModeKey) -> &'static Mode {
        match key {
            ModeKey::Idle => &MODES[0],
            ModeKey::Pointer => &MODES[1],
            ModeKey::Fist => &MODES[2],
            ModeKey::Victory => &MODES[3],
            ModeKey::HangLoose => &MODES[4],
            ModeKey::Open => &MODES[5],
        }
    }

    pub fn table() -> &'static [Mode] {
        &MODES
    }
}

/// Displayed (interpolated) mode parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendedMode {
    pub time_speed: f32,
    pub rotation_speed: f32,
    pub point_size: f32,
    pub influence_radius: f32,
    pub sink_strength: f32,
    pub burst_strength: f32,
    pub color: Rgb,
}

impl BlendedMode {
    pub fn from_mode(mode: &Mode) -> Self {
        Self {
            time_speed: mode.time_speed,
            rotation_speed: mode.rotation_speed,
            point_size: mode.point_size,
            influence_radius: mode.influence_radius,
            sink_strength: mode.sink_strength,
            burst_strength: mode.burst_strength,
            color: mode.color,
        }
    }

    pub fn idle() -> Self {
        Self::from_mode(Mode::get(ModeKey::Idle))
    }

    pub fn advance(&mut self, target: &Mode, factor: f32) {
        *self = blend(self, target, factor);
    }
}

impl Default for BlendedMode {
    fn default() -> Self {
        Self::idle()
    }
}

pub fn blend_factor(reduced_motion: bool) -> f32 {
    if reduced_motion {
        BLEND_FACTOR_REDUCED
    } else {
        BLEND_FACTOR
    }
}

/// Moves every numeric field and colour channel a fixed fraction toward the target.
///
/// The factor is applied per call, not per second. For `factor` in `[0, 1]`
/// every output lies between the current and target values.
pub fn blend(current: &BlendedMode, target: &Mode, factor: f32) -> BlendedMode {
    BlendedMode {
        time_speed: approach(current.time_speed, target.time_speed, factor),
        rotation_speed: approach(current.rotation_speed, target.rotation_speed, factor),
        point_size: approach(current.point_size, target.point_size, factor),
        influence_radius: approach(current.influence_radius, target.influence_radius, factor),
        sink_strength: approach(current.sink_strength, target.sink_strength, factor),
        burst_strength: approach(current.burst_strength, target.burst_strength, factor),
        color: Rgb {
            r: approach(current.color.r, target.color.r, factor),
            g: approach(current.color.g, target.color.g, factor),
            b: approach(current.color.b, target.color.b, factor),
        },
    }
}

#[inline]
fn approach(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}
