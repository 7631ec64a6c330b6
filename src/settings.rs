use std::path::{Path, PathBuf};

use clap::ValueEnum;
use thiserror::Error;

use crate::config::{Config, QualityKey};
use crate::field::WaveKind;

pub const SENSITIVITY_MIN: f32 = 0.6;
pub const SENSITIVITY_MAX: f32 = 1.6;
pub const DEFAULT_SENSITIVITY: f32 = 1.0;
const PRESET_TOLERANCE: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub quality: QualityKey,
    pub wave: WaveKind,
    pub sensitivity: f32,
    pub reduced_motion: bool,
    pub high_contrast: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityKey::Auto,
            wave: WaveKind::Cosmos,
            sensitivity: DEFAULT_SENSITIVITY,
            reduced_motion: false,
            high_contrast: false,
        }
    }
}

impl Settings {
    pub fn sanitized(mut self) -> Self {
        self.sensitivity = clamp_sensitivity(self.sensitivity);
        self
    }

    /// Layers `--preset` and then the explicit flags over `self`.
    pub fn with_cli(mut self, cfg: &Config) -> Self {
        if let Some(preset) = cfg.preset {
            self = preset.apply(self);
        }
        if let Some(q) = cfg.quality {
            self.quality = q;
        }
        if let Some(w) = cfg.wave {
            self.wave = w;
        }
        if let Some(s) = cfg.sensitivity {
            self.sensitivity = s;
        }
        if let Some(r) = cfg.reduced_motion {
            self.reduced_motion = r;
        }
        if let Some(h) = cfg.high_contrast {
            self.high_contrast = h;
        }
        self.sanitized()
    }
}

pub fn clamp_sensitivity(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(SENSITIVITY_MIN, SENSITIVITY_MAX)
    } else {
        DEFAULT_SENSITIVITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetKey {
    Calm,
    Explorer,
    Impact,
}

impl PresetKey {
    pub const ALL: [Self; 3] = [Self::Calm, Self::Explorer, Self::Impact];

    pub fn label(self) -> &'static str {
        match self {
            Self::Calm => "Calm",
            Self::Explorer => "Explorer",
            Self::Impact => "Impact",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Calm => Self::Explorer,
            Self::Explorer => Self::Impact,
            Self::Impact => Self::Calm,
        }
    }

    /// Presets leave `high_contrast` alone.
    pub fn apply(self, base: Settings) -> Settings {
        let (quality, wave, sensitivity, reduced_motion) = match self {
            Self::Calm => (QualityKey::Auto, WaveKind::Cosmos, 0.8, true),
            Self::Explorer => (QualityKey::Balanced, WaveKind::Ripple, 1.0, false),
            Self::Impact => (QualityKey::High, WaveKind::Storm, 1.3, false),
        };
        Settings {
            quality,
            wave,
            sensitivity,
            reduced_motion,
            ..base
        }
    }
}

/// The preset the settings currently match, `None` for a custom mix.
pub fn infer_preset(s: &Settings) -> Option<PresetKey> {
    PresetKey::ALL.into_iter().find(|p| {
        let want = p.apply(*s);
        want.quality == s.quality
            && want.wave == s.wave
            && want.reduced_motion == s.reduced_motion
            && (want.sensitivity - s.sensitivity).abs() < PRESET_TOLERANCE
    })
}

pub fn next_preset(s: &Settings) -> PresetKey {
    infer_preset(s).map_or(PresetKey::Calm, PresetKey::next)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Key=value settings file. A store without a path neither reads nor writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsStore {
    path: Option<PathBuf>,
}

impl SettingsStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn default_location() -> Self {
        Self::new(settings_storage_path())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self) -> Result<Settings, SettingsError> {
        let Some(path) = self.path() else {
            return Ok(Settings::default());
        };

        let text = match std::fs::read_to_string(path) {
            Ok(v) => v,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Settings::default());
            }
            Err(err) => return Err(SettingsError::Io(err.to_string())),
        };
        parse_settings(&text)
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, render_settings(settings))
            .map_err(|e| SettingsError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| SettingsError::Io(e.to_string()))
    }
}

pub fn parse_settings(text: &str) -> Result<Settings, SettingsError> {
    let mut s = Settings::default();
    for (line_idx, raw) in text.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key_raw, value_raw)) = line.split_once('=') else {
            return Err(SettingsError::Parse {
                line: line_no,
                message: "expected <key>=<value>".to_string(),
            });
        };
        let key = key_raw.trim();
        let value = value_raw.trim();
        let applied = match key {
            "quality" => QualityKey::parse(value).map(|q| s.quality = q).is_some(),
            "wave" => WaveKind::parse(value).map(|w| s.wave = w).is_some(),
            "sensitivity" => value
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| s.sensitivity = v)
                .is_some(),
            "reduced_motion" => parse_bool(value).map(|b| s.reduced_motion = b).is_some(),
            "high_contrast" => parse_bool(value).map(|b| s.high_contrast = b).is_some(),
            _ => true,
        };
        if !applied {
            log::warn!("settings line {line_no}: ignoring invalid {key}='{value}'");
        }
    }
    Ok(s.sanitized())
}

pub fn render_settings(s: &Settings) -> String {
    format!(
        "# particle_wave settings v1\nquality={}\nwave={}\nsensitivity={}\nreduced_motion={}\nhigh_contrast={}\n",
        s.quality.as_str(),
        s.wave.as_str(),
        s.sensitivity,
        s.reduced_motion,
        s.high_contrast,
    )
}

pub fn settings_storage_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(PathBuf::from(xdg).join("particle_wave").join("settings.txt"));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("particle_wave")
            .join("settings.txt"),
    )
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
