use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::field::WaveKind;
use crate::settings::PresetKey;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "particle-wave",
    version,
    about = "Interactive particle wave field for the terminal, driven by mouse or hand gestures"
)]
pub struct Config {
    /// Quality tier; `auto` probes the device and retunes from the measured frame rate.
    #[arg(long, value_enum)]
    pub quality: Option<QualityKey>,

    #[arg(long, value_enum)]
    pub wave: Option<WaveKind>,

    /// Interaction radius/strength multiplier, clamped to 0.6..=1.6.
    #[arg(long)]
    pub sensitivity: Option<f32>,

    #[arg(long, action = clap::ArgAction::Set)]
    pub reduced_motion: Option<bool>,

    #[arg(long, action = clap::ArgAction::Set)]
    pub high_contrast: Option<bool>,

    /// Apply a named preset before the explicit flags above.
    #[arg(long, value_enum)]
    pub preset: Option<PresetKey>,

    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    /// Replay gestures from a script file instead of the keyboard hand.
    #[arg(long)]
    pub gesture_script: Option<PathBuf>,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub loop_script: bool,

    /// Settings file (defaults to $XDG_CONFIG_HOME/particle_wave/settings.txt).
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Neither load nor save the settings file.
    #[arg(long, default_value_t = false)]
    pub no_persist: bool,

    /// Write logs to this file; the terminal UI never logs to stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
    #[value(alias = "hires", alias = "dots")]
    Braille,
}

impl RendererMode {
    /// Pixels per terminal cell (columns, rows).
    pub fn cell_pixels(self) -> (usize, usize) {
        match self {
            Self::HalfBlock => (1, 2),
            Self::Braille => (2, 4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn filter(self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// User-facing quality selection. `Auto` resolves to a [`QualityTier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QualityKey {
    Auto,
    High,
    Balanced,
    #[value(alias = "perf", alias = "fast")]
    Performance,
}

pub const AUTO_PIXEL_RATIO_CAP: f32 = 1.8;

impl QualityKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "high" => Some(Self::High),
            "balanced" => Some(Self::Balanced),
            "performance" => Some(Self::Performance),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::High => "high",
            Self::Balanced => "balanced",
            Self::Performance => "performance",
        }
    }

    pub fn fixed_tier(self) -> Option<QualityTier> {
        match self {
            Self::Auto => None,
            Self::High => Some(QualityTier::High),
            Self::Balanced => Some(QualityTier::Balanced),
            Self::Performance => Some(QualityTier::Performance),
        }
    }
}

/// Concrete quality tiers, ordered coarsest to finest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QualityTier {
    Performance,
    Balanced,
    High,
}

impl QualityTier {
    pub const ALL: [Self; 3] = [Self::Performance, Self::Balanced, Self::High];

    pub fn particle_count(self) -> usize {
        match self {
            Self::Performance => 16_000,
            Self::Balanced => 28_000,
            Self::High => 42_000,
        }
    }

    pub fn pixel_ratio_cap(self) -> f32 {
        match self {
            Self::Performance => 1.3,
            Self::Balanced => 1.6,
            Self::High => 2.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Performance => "Performance",
            Self::Balanced => "Balanced",
            Self::High => "High",
        }
    }

    pub fn key(self) -> QualityKey {
        match self {
            Self::Performance => QualityKey::Performance,
            Self::Balanced => QualityKey::Balanced,
            Self::High => QualityKey::High,
        }
    }

    /// Next coarser tier, `None` at the coarsest.
    pub fn coarser(self) -> Option<Self> {
        match self {
            Self::Performance => None,
            Self::Balanced => Some(Self::Performance),
            Self::High => Some(Self::Balanced),
        }
    }

    /// Next finer tier, `None` at the finest.
    pub fn finer(self) -> Option<Self> {
        match self {
            Self::Performance => Some(Self::Balanced),
            Self::Balanced => Some(Self::High),
            Self::High => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuality {
    pub key: QualityKey,
    pub tier: QualityTier,
    pub label: String,
    pub pixel_ratio_cap: f32,
}

impl ResolvedQuality {
    pub fn particle_count(&self) -> usize {
        self.tier.particle_count()
    }

    pub fn supersample(&self) -> usize {
        supersample_factor(self.pixel_ratio_cap)
    }
}

/// Raster supersampling for a pixel-ratio cap, rounded to a whole factor in `1..=2`.
pub fn supersample_factor(pixel_ratio_cap: f32) -> usize {
    if !pixel_ratio_cap.is_finite() {
        return 1;
    }
    pixel_ratio_cap.round().clamp(1.0, 2.0) as usize
}

/// Resolves a quality selection against the current auto tier.
pub fn resolve_quality(key: QualityKey, auto_tier: QualityTier) -> ResolvedQuality {
    match key.fixed_tier() {
        Some(tier) => ResolvedQuality {
            key,
            tier,
            label: tier.label().to_string(),
            pixel_ratio_cap: tier.pixel_ratio_cap(),
        },
        None => ResolvedQuality {
            key,
            tier: auto_tier,
            label: format!("Auto ({})", auto_tier.label()),
            pixel_ratio_cap: AUTO_PIXEL_RATIO_CAP,
        },
    }
}
