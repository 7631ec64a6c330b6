//! Per-run simulation context: owns every piece of per-frame state and runs the frame pipeline.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::adaptive::AdaptiveQuality;
use crate::capability::{resolve_auto_tier, DeviceProfile};
use crate::config::{resolve_quality, QualityKey, QualityTier, ResolvedQuality};
use crate::field::{point_size, FieldBuffers, FieldError, FieldUpdate, Interaction, ParticleField, WaveKind};
use crate::fps::FrameRateMonitor;
use crate::fusion::{FusionStatus, InputFusion, InputSource, PointerSample, Resolution};
use crate::mailbox::GestureMailbox;
use crate::modes::{blend_factor, BlendedMode, Mode, ModeKey};
use crate::settings::{clamp_sensitivity, infer_preset, next_preset, PresetKey, Settings};

pub const MAX_FRAME_DT: f32 = 0.05;
pub const FPS_DISPLAY_INTERVAL: f32 = 0.2;

pub const WORLD_HALF_X: f32 = 120.0;
pub const WORLD_HALF_Z: f32 = 95.0;
pub const CURSOR_HEIGHT: f32 = 2.8;
pub const CURSOR_REST_Z: f32 = 14.0;

const CURSOR_LERP: f32 = 0.13;
const CURSOR_LERP_REDUCED: f32 = 0.24;
const ROTATION_Y_CURSOR_GAIN: f32 = 0.000014;
const ROTATION_X_CURSOR_GAIN: f32 = 0.00002;
const ROTATION_X_EASE: f32 = 0.06;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("session has been stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Only drawn while an interaction pointer is active.
    pub visible: bool,
}

impl Cursor {
    pub fn rest() -> Self {
        Self {
            x: 0.0,
            y: CURSOR_HEIGHT,
            z: CURSOR_REST_Z,
            visible: false,
        }
    }
}

/// Field rotation in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    Manual,
    Adaptive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityChange {
    pub from: QualityTier,
    pub to: QualityTier,
    pub reason: ChangeReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    QualityApplied { label: String, reason: ChangeReason },
    ModeChanged(ModeKey),
    AwaitingHand,
    PresetApplied(PresetKey),
    Camera(bool),
    Paused(bool),
    ViewReset,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QualityApplied { label, reason } => match reason {
                ChangeReason::Manual => write!(f, "Quality: {label}"),
                ChangeReason::Adaptive => write!(f, "Quality adjusted: {label}"),
            },
            Self::ModeChanged(key) => write!(f, "Mode: {}", key.mode().label),
            Self::AwaitingHand => write!(f, "Camera on, show a hand"),
            Self::PresetApplied(p) => write!(f, "Preset: {}", p.label()),
            Self::Camera(true) => write!(f, "Camera on"),
            Self::Camera(false) => write!(f, "Camera off"),
            Self::Paused(true) => write!(f, "Paused"),
            Self::Paused(false) => write!(f, "Resumed"),
            Self::ViewReset => write!(f, "View reset"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub fps: f32,
    /// Set at most every [`FPS_DISPLAY_INTERVAL`] seconds.
    pub display_fps: Option<f32>,
    pub mode: ModeKey,
    pub source: InputSource,
    pub status: FusionStatus,
    pub quality_change: Option<QualityChange>,
}

/// Maps a normalised pointer to world x/z on the field plane.
pub fn pointer_to_world(x: f32, y: f32) -> (f32, f32) {
    let wx = (x - 0.5) * 2.0 * WORLD_HALF_X;
    let wz = -(y - 0.5) * 2.0 * WORLD_HALF_Z + CURSOR_REST_Z;
    (wx, wz)
}

pub fn clamp_dt(raw_dt: f32) -> f32 {
    if raw_dt.is_finite() {
        raw_dt.clamp(0.0, MAX_FRAME_DT)
    } else {
        0.0
    }
}

pub struct Session {
    settings: Settings,
    profile: DeviceProfile,
    auto_tier: QualityTier,
    quality: ResolvedQuality,
    field: Option<ParticleField>,
    fusion: InputFusion,
    last: Resolution,
    blended: BlendedMode,
    adaptive: AdaptiveQuality,
    monitor: FrameRateMonitor,
    mailbox: Arc<GestureMailbox>,
    pointer: PointerSample,
    camera_active: bool,
    paused: bool,
    time: f32,
    cursor: Cursor,
    rotation: Rotation,
    fps_ui_timer: f32,
    notices: Vec<Notice>,
}

impl Session {
    pub fn new(settings: Settings, profile: &DeviceProfile) -> Result<Self, SessionError> {
        let settings = settings.sanitized();
        let auto_tier = resolve_auto_tier(profile);
        let quality = resolve_quality(settings.quality, auto_tier);
        let field = ParticleField::allocate(quality.particle_count())?;
        log::info!(
            "session ready: quality={} particles={} wave={}",
            quality.label,
            field.len(),
            settings.wave.as_str()
        );

        let mut fusion = InputFusion::new();
        let last = fusion.resolve(false, &Default::default(), &PointerSample::inactive());

        Ok(Self {
            settings,
            profile: *profile,
            auto_tier,
            quality,
            field: Some(field),
            fusion,
            last,
            blended: BlendedMode::idle(),
            adaptive: AdaptiveQuality::default(),
            monitor: FrameRateMonitor::default(),
            mailbox: Arc::new(GestureMailbox::new()),
            pointer: PointerSample::inactive(),
            camera_active: false,
            paused: false,
            time: 0.0,
            cursor: Cursor::rest(),
            rotation: Rotation::default(),
            fps_ui_timer: 0.0,
            notices: Vec::new(),
        })
    }

    /// Runs one frame: fps, adaptive quality, input fusion, mode blend, field update.
    pub fn frame(&mut self, raw_dt: f32) -> Result<FrameReport, SessionError> {
        if self.field.is_none() {
            return Err(SessionError::Stopped);
        }
        let dt = clamp_dt(raw_dt);

        // A rejected delta is no signal: the adaptive streaks stay untouched.
        let sample = self.monitor.update(dt);
        let fps = sample.unwrap_or_else(|| self.monitor.fps());
        self.fps_ui_timer += dt;
        let display_fps = if self.fps_ui_timer >= FPS_DISPLAY_INTERVAL {
            self.fps_ui_timer = 0.0;
            Some(fps)
        } else {
            None
        };

        if self.paused {
            self.adaptive.reset();
            return Ok(self.report(fps, display_fps, None));
        }

        let mut quality_change = None;
        if self.settings.quality != QualityKey::Auto {
            self.adaptive.reset();
        } else if let Some(fps) = sample {
            if let Some(next) = self.adaptive.update(fps, self.auto_tier) {
                let from = self.auto_tier;
                self.auto_tier = next;
                self.apply_quality(ChangeReason::Adaptive)?;
                quality_change = Some(QualityChange {
                    from,
                    to: next,
                    reason: ChangeReason::Adaptive,
                });
            }
        }

        let gesture = self.mailbox.latest();
        let res = self.fusion.resolve(self.camera_active, &gesture, &self.pointer);
        if res.mode_changed {
            log::debug!("mode {} -> {}", self.last.mode.as_str(), res.mode.as_str());
            self.notices.push(Notice::ModeChanged(res.mode));
        }
        if res.status == FusionStatus::AwaitingHand && self.last.status != FusionStatus::AwaitingHand {
            self.notices.push(Notice::AwaitingHand);
        }
        self.last = res;

        let target = Mode::get(res.mode);
        let reduced = self.settings.reduced_motion;
        self.blended.advance(target, blend_factor(reduced));

        if !target.freeze {
            self.time += dt * self.blended.time_speed.max(0.0);
        }

        self.follow_pointer(&res);

        self.rotation.y += self.blended.rotation_speed + self.cursor.x * ROTATION_Y_CURSOR_GAIN;
        self.rotation.x +=
            (-self.cursor.z * ROTATION_X_CURSOR_GAIN - self.rotation.x) * ROTATION_X_EASE;

        let interaction = Interaction {
            active: res.pointer.active,
            cursor_x: self.cursor.x,
            cursor_z: self.cursor.z,
            sensitivity: self.settings.sensitivity,
        };
        let wave = self.settings.wave.profile();
        let update = FieldUpdate {
            time: self.time,
            mode_key: res.mode,
            mode: &self.blended,
            wave: &wave,
            interaction: &interaction,
            reduced_motion: reduced,
        };
        self.field
            .as_mut()
            .ok_or(SessionError::Stopped)?
            .update(&update)?;

        Ok(self.report(fps, display_fps, quality_change))
    }

    fn follow_pointer(&mut self, res: &Resolution) {
        if !res.pointer.active {
            self.cursor.visible = false;
            return;
        }
        let (tx, tz) = pointer_to_world(res.pointer.x, res.pointer.y);
        let k = if self.settings.reduced_motion {
            CURSOR_LERP_REDUCED
        } else {
            CURSOR_LERP
        };
        self.cursor.x += (tx - self.cursor.x) * k;
        self.cursor.y += (CURSOR_HEIGHT - self.cursor.y) * k;
        self.cursor.z += (tz - self.cursor.z) * k;
        self.cursor.visible = true;
    }

    fn report(&self, fps: f32, display_fps: Option<f32>, quality_change: Option<QualityChange>) -> FrameReport {
        FrameReport {
            fps,
            display_fps,
            mode: self.last.mode,
            source: self.last.source,
            status: self.last.status,
            quality_change,
        }
    }

    fn apply_quality(&mut self, reason: ChangeReason) -> Result<(), SessionError> {
        let field = self.field.as_mut().ok_or(SessionError::Stopped)?;
        let quality = resolve_quality(self.settings.quality, self.auto_tier);
        let resized = field.set_particle_count(quality.particle_count())?;
        self.adaptive.reset();
        log::info!(
            "quality {} ({:?}): {} particles{}",
            quality.label,
            reason,
            field.len(),
            if resized { "" } else { ", buffers kept" }
        );
        self.notices.push(Notice::QualityApplied {
            label: quality.label.clone(),
            reason,
        });
        self.quality = quality;
        Ok(())
    }

    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.pointer = PointerSample::at(x, y);
    }

    pub fn clear_pointer(&mut self) {
        self.pointer = PointerSample::inactive();
    }

    pub fn set_camera_active(&mut self, active: bool) {
        if self.camera_active == active {
            return;
        }
        self.camera_active = active;
        log::info!("camera {}", if active { "on" } else { "off" });
        self.notices.push(Notice::Camera(active));
    }

    pub fn camera_active(&self) -> bool {
        self.camera_active
    }

    pub fn gesture_mailbox(&self) -> Arc<GestureMailbox> {
        Arc::clone(&self.mailbox)
    }

    /// Entering `auto` re-resolves the tier from the device profile.
    pub fn set_quality(&mut self, key: QualityKey) -> Result<(), SessionError> {
        if self.field.is_none() {
            return Err(SessionError::Stopped);
        }
        let was_auto = self.settings.quality == QualityKey::Auto;
        if key == QualityKey::Auto && !was_auto {
            self.auto_tier = resolve_auto_tier(&self.profile);
        }
        if was_auto && key != QualityKey::Auto {
            self.adaptive.reset();
        }
        self.settings.quality = key;
        self.apply_quality(ChangeReason::Manual)
    }

    pub fn set_wave(&mut self, wave: WaveKind) {
        self.settings.wave = wave;
    }

    pub fn set_sensitivity(&mut self, value: f32) {
        self.settings.sensitivity = clamp_sensitivity(value);
    }

    pub fn set_reduced_motion(&mut self, on: bool) {
        self.settings.reduced_motion = on;
    }

    pub fn set_high_contrast(&mut self, on: bool) {
        self.settings.high_contrast = on;
    }

    pub fn apply_preset(&mut self, preset: PresetKey) -> Result<(), SessionError> {
        let next = preset.apply(self.settings);
        let quality_changed = next.quality != self.settings.quality;
        if quality_changed {
            self.set_quality(next.quality)?;
        }
        self.settings = next.sanitized();
        log::info!("preset {}", preset.label());
        self.notices.push(Notice::PresetApplied(preset));
        Ok(())
    }

    pub fn cycle_preset(&mut self) -> Result<PresetKey, SessionError> {
        let preset = next_preset(&self.settings);
        self.apply_preset(preset)?;
        Ok(preset)
    }

    pub fn preset(&self) -> Option<PresetKey> {
        infer_preset(&self.settings)
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.notices.push(Notice::Paused(self.paused));
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn reset_view(&mut self) {
        self.time = 0.0;
        self.rotation = Rotation::default();
        self.cursor = Cursor {
            visible: self.cursor.visible,
            ..Cursor::rest()
        };
        self.notices.push(Notice::ViewReset);
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Releases the particle buffers. Later frames fail with [`SessionError::Stopped`].
    pub fn stop(&mut self) {
        if self.field.take().is_some() {
            log::info!("session stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.field.is_none()
    }

    pub fn buffers(&self) -> Option<FieldBuffers<'_>> {
        self.field.as_ref().map(ParticleField::buffers)
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn point_size(&self) -> f32 {
        point_size(&self.blended, self.settings.reduced_motion)
    }

    pub fn blended(&self) -> &BlendedMode {
        &self.blended
    }

    pub fn quality(&self) -> &ResolvedQuality {
        &self.quality
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn fps(&self) -> f32 {
        self.monitor.fps()
    }

    pub fn adaptive(&self) -> &AdaptiveQuality {
        &self.adaptive
    }

    pub fn mode(&self) -> ModeKey {
        self.last.mode
    }

    pub fn status(&self) -> FusionStatus {
        self.last.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dt_is_clamped() {
        assert_eq!(clamp_dt(1.0), MAX_FRAME_DT);
        assert_eq!(clamp_dt(-0.01), 0.0);
        assert_eq!(clamp_dt(f32::INFINITY), 0.0);
        assert_eq!(clamp_dt(0.016), 0.016);
    }

    #[test]
    fn pointer_centre_maps_to_rest_depth() {
        assert_eq!(pointer_to_world(0.5, 0.5), (0.0, CURSOR_REST_Z));
        let (x, z) = pointer_to_world(1.0, 0.0);
        assert_eq!(x, WORLD_HALF_X);
        assert_eq!(z, WORLD_HALF_Z + CURSOR_REST_Z);
    }

    #[test]
    fn notices_read_like_toasts() {
        assert_eq!(Notice::Paused(true).to_string(), "Paused");
        assert_eq!(
            Notice::QualityApplied {
                label: "Auto (High)".to_string(),
                reason: ChangeReason::Adaptive
            }
            .to_string(),
            "Quality adjusted: Auto (High)"
        );
    }
}
