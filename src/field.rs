//! Particle height field: per-particle baseline plus per-frame height and colour.

use clap::ValueEnum;
use thiserror::Error;

use crate::modes::{BlendedMode, ModeKey, Rgb};

/// Side length of the square the particles are scattered over, centred at the origin.
pub const GRID_EXTENT: f32 = 260.0;

const INITIAL_COLOR: Rgb = Rgb::new(0.28, 0.62, 0.96);
const REDUCED_MOTION_TIME_SCALE: f32 = 0.55;
const REDUCED_MOTION_POINT_SCALE: f32 = 0.9;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("particle count must be greater than zero")]
    EmptyField,
    #[error("could not allocate buffers for {count} particles")]
    Allocation { count: usize },
    #[error("invalid field update: {0}")]
    Precondition(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum WaveKind {
    Cosmos,
    Ripple,
    Storm,
}

impl WaveKind {
    pub const ALL: [Self; 3] = [Self::Cosmos, Self::Ripple, Self::Storm];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosmos" => Some(Self::Cosmos),
            "ripple" => Some(Self::Ripple),
            "storm" => Some(Self::Storm),
            _ => None,
        }
    }

    /// Unknown ids fall back to cosmos.
    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Cosmos)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosmos => "cosmos",
            Self::Ripple => "ripple",
            Self::Storm => "storm",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Cosmos => Self::Ripple,
            Self::Ripple => Self::Storm,
            Self::Storm => Self::Cosmos,
        }
    }

    pub fn profile(self) -> WaveProfile {
        match self {
            Self::Cosmos => WaveProfile {
                kind: self,
                label: "Cosmos",
                intensity: 1.0,
            },
            Self::Ripple => WaveProfile {
                kind: self,
                label: "Ripple",
                intensity: 1.15,
            },
            Self::Storm => WaveProfile {
                kind: self,
                label: "Storm",
                intensity: 1.35,
            },
        }
    }
}

/// A wave function plus its fixed intensity scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveProfile {
    pub kind: WaveKind,
    pub label: &'static str,
    pub intensity: f32,
}

impl WaveProfile {
    pub fn height(
        &self,
        x: f32,
        z: f32,
        radial: f32,
        time: f32,
        noise: f32,
        reduced_motion: bool,
    ) -> f32 {
        compute_wave_height(x, z, radial, time, self.kind, noise, reduced_motion) * self.intensity
    }
}

/// Unscaled wave height for one particle.
pub fn compute_wave_height(
    x: f32,
    z: f32,
    radial: f32,
    time: f32,
    kind: WaveKind,
    noise: f32,
    reduced_motion: bool,
) -> f32 {
    let t = if reduced_motion {
        time * REDUCED_MOTION_TIME_SCALE
    } else {
        time
    };

    match kind {
        WaveKind::Cosmos => {
            let base = (x * 0.047 + t).sin() * (z * 0.043 + t).cos() * 2.2;
            let ring = (radial * 0.1 - t * 1.9).sin() * 1.55;
            base + ring
        }
        WaveKind::Ripple => {
            let radial_wave = (radial * 0.16 - t * 2.2).sin() * 2.7;
            let lateral = ((x - z) * 0.035 + t).cos() * 0.95;
            radial_wave + lateral
        }
        WaveKind::Storm => {
            let swirl = (x * 0.085 + t * 2.8).sin() * (z * 0.09 + t * 2.2).cos() * 1.9;
            let pulse = (radial * 0.21 - t * 4.1 + noise * 10.0).sin() * 1.4;
            swirl + pulse
        }
    }
}

/// Height offset from the interaction point for a particle at `distance_sq`.
///
/// Zero outside `influence_radius * sensitivity`. Inside, the falloff is
/// `1 - distance_sq / radius_sq`: Fist bursts by `(noise - 0.5) * burst`,
/// every other mode sinks by `sink * sensitivity`.
pub fn interaction_offset(
    mode_key: ModeKey,
    mode: &BlendedMode,
    noise: f32,
    distance_sq: f32,
    sensitivity: f32,
) -> f32 {
    let radius = mode.influence_radius * sensitivity;
    let radius_sq = radius * radius;
    if !(distance_sq < radius_sq) {
        return 0.0;
    }

    let falloff = 1.0 - distance_sq / radius_sq;
    if mode_key == ModeKey::Fist {
        (noise - 0.5) * mode.burst_strength * falloff
    } else {
        -(mode.sink_strength * sensitivity) * falloff
    }
}

pub fn height_color(height: f32, base: Rgb) -> Rgb {
    let h = ((height + 8.0) / 16.0).clamp(0.0, 1.0);
    let tone = 0.58 + h * 0.42;
    Rgb {
        r: (base.r * tone + h * 0.08).clamp(0.0, 1.0),
        g: (base.g * tone + h * 0.1).clamp(0.0, 1.0),
        b: (base.b * tone + h * 0.12).clamp(0.0, 1.0),
    }
}

/// Renderer hint for the current frame.
pub fn point_size(mode: &BlendedMode, reduced_motion: bool) -> f32 {
    if reduced_motion {
        mode.point_size * REDUCED_MOTION_POINT_SCALE
    } else {
        mode.point_size
    }
}

/// Fused interaction point in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    pub active: bool,
    pub cursor_x: f32,
    pub cursor_z: f32,
    pub sensitivity: f32,
}

impl Interaction {
    pub fn inactive(sensitivity: f32) -> Self {
        Self {
            active: false,
            cursor_x: 0.0,
            cursor_z: 0.0,
            sensitivity,
        }
    }
}

pub struct FieldUpdate<'a> {
    pub time: f32,
    pub mode_key: ModeKey,
    pub mode: &'a BlendedMode,
    pub wave: &'a WaveProfile,
    pub interaction: &'a Interaction,
    pub reduced_motion: bool,
}

impl FieldUpdate<'_> {
    fn validate(&self) -> Result<(), FieldError> {
        if !self.time.is_finite() {
            return Err(FieldError::Precondition("time must be finite"));
        }
        let s = self.interaction.sensitivity;
        if !s.is_finite() || s <= 0.0 {
            return Err(FieldError::Precondition("sensitivity must be finite and positive"));
        }
        if self.interaction.active
            && !(self.interaction.cursor_x.is_finite() && self.interaction.cursor_z.is_finite())
        {
            return Err(FieldError::Precondition("interaction point must be finite"));
        }
        if !self.wave.intensity.is_finite() {
            return Err(FieldError::Precondition("wave intensity must be finite"));
        }
        Ok(())
    }
}

/// Read-only view of the output buffers for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FieldBuffers<'a> {
    /// `count * 3` floats, x/y/z interleaved.
    pub positions: &'a [f32],
    /// `count * 3` floats, r/g/b interleaved in `[0, 1]`.
    pub colors: &'a [f32],
    pub count: usize,
}

pub struct ParticleField {
    count: usize,
    base_x: Vec<f32>,
    base_z: Vec<f32>,
    base_radius: Vec<f32>,
    noise: Vec<f32>,
    positions: Vec<f32>,
    colors: Vec<f32>,
}

impl ParticleField {
    pub fn allocate(count: usize) -> Result<Self, FieldError> {
        Self::allocate_with_rng(count, &mut fastrand::Rng::new())
    }

    pub fn allocate_with_rng(count: usize, rng: &mut fastrand::Rng) -> Result<Self, FieldError> {
        if count == 0 {
            return Err(FieldError::EmptyField);
        }
        let triple = count
            .checked_mul(3)
            .ok_or(FieldError::Allocation { count })?;

        let mut base_x = reserve(count, count)?;
        let mut base_z = reserve(count, count)?;
        let mut base_radius = reserve(count, count)?;
        let mut noise = reserve(count, count)?;
        let mut positions = reserve(triple, count)?;
        let mut colors = reserve(triple, count)?;

        let half = GRID_EXTENT * 0.5;
        for _ in 0..count {
            let x = rng.f32() * GRID_EXTENT - half;
            let z = rng.f32() * GRID_EXTENT - half;
            let radial = (x * x + z * z).sqrt();

            base_x.push(x);
            base_z.push(z);
            base_radius.push(radial);
            noise.push(rng.f32());

            positions.extend_from_slice(&[x, 0.0, z]);
            colors.extend_from_slice(&[INITIAL_COLOR.r, INITIAL_COLOR.g, INITIAL_COLOR.b]);
        }

        Ok(Self {
            count,
            base_x,
            base_z,
            base_radius,
            noise,
            positions,
            colors,
        })
    }

    /// Rebuilds every buffer for a new particle count; a no-op when unchanged.
    ///
    /// On error the current field is left untouched.
    pub fn set_particle_count(&mut self, count: usize) -> Result<bool, FieldError> {
        if count == self.count {
            return Ok(false);
        }
        *self = Self::allocate(count)?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn base_x(&self) -> &[f32] {
        &self.base_x
    }

    pub fn base_z(&self) -> &[f32] {
        &self.base_z
    }

    pub fn base_radius(&self) -> &[f32] {
        &self.base_radius
    }

    pub fn noise(&self) -> &[f32] {
        &self.noise
    }

    pub fn heights(&self) -> impl Iterator<Item = f32> + '_ {
        self.positions.chunks_exact(3).map(|p| p[1])
    }

    pub fn buffers(&self) -> FieldBuffers<'_> {
        FieldBuffers {
            positions: &self.positions,
            colors: &self.colors,
            count: self.count,
        }
    }

    pub fn update(&mut self, ctx: &FieldUpdate<'_>) -> Result<(), FieldError> {
        ctx.validate()?;

        let mode = ctx.mode;
        let wave = ctx.wave;
        let interaction = ctx.interaction;
        let sensitivity = interaction.sensitivity;

        let particles = self
            .positions
            .chunks_exact_mut(3)
            .zip(self.colors.chunks_exact_mut(3));
        for (i, (pos, col)) in particles.enumerate() {
            let x = self.base_x[i];
            let z = self.base_z[i];
            let noise = self.noise[i];

            let mut y = wave.height(x, z, self.base_radius[i], ctx.time, noise, ctx.reduced_motion);

            if interaction.active {
                let dx = x - interaction.cursor_x;
                let dz = z - interaction.cursor_z;
                y += interaction_offset(ctx.mode_key, mode, noise, dx * dx + dz * dz, sensitivity);
            }

            pos[1] = y;

            let c = height_color(y, mode.color);
            col[0] = c.r;
            col[1] = c.g;
            col[2] = c.b;
        }

        Ok(())
    }
}

fn reserve(len: usize, count: usize) -> Result<Vec<f32>, FieldError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| FieldError::Allocation { count })?;
    Ok(v)
}
