use std::path::PathBuf;

use clap::Parser;
use particle_wave::app::startup_settings;
use particle_wave::capability::{report_for, resolve_auto_tier, DeviceProfile};
use particle_wave::config::{
    resolve_quality, supersample_factor, Config, LogLevel, QualityKey, QualityTier, RendererMode,
};
use particle_wave::field::WaveKind;
use particle_wave::settings::{
    parse_settings, render_settings, PresetKey, Settings, SettingsError, SettingsStore,
};

fn temp_settings_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("particle_wave_test_{}_{name}", std::process::id()))
        .join("settings.txt")
}

fn parse_cli(args: &[&str]) -> Config {
    Config::try_parse_from(std::iter::once("particle_wave").chain(args.iter().copied()))
        .expect("arguments should parse")
}

// ── Command line ────────────────────────────────────────────────────────────

#[test]
fn cli_defaults_are_stable() {
    let cfg = parse_cli(&[]);
    assert_eq!(cfg.quality, None);
    assert_eq!(cfg.renderer, RendererMode::HalfBlock);
    assert_eq!(cfg.fps, 60);
    assert!(cfg.sync_updates);
    assert!(cfg.loop_script);
    assert!(!cfg.no_persist);
    assert_eq!(cfg.log_level, LogLevel::Info);
}

#[test]
fn cli_accepts_aliases_and_bools() {
    let cfg = parse_cli(&[
        "--quality",
        "perf",
        "--wave",
        "storm",
        "--renderer",
        "hires",
        "--reduced-motion",
        "true",
        "--preset",
        "impact",
        "--log-level",
        "debug",
    ]);
    assert_eq!(cfg.quality, Some(QualityKey::Performance));
    assert_eq!(cfg.wave, Some(WaveKind::Storm));
    assert_eq!(cfg.renderer, RendererMode::Braille);
    assert_eq!(cfg.renderer.cell_pixels(), (2, 4));
    assert_eq!(cfg.reduced_motion, Some(true));
    assert_eq!(cfg.preset, Some(PresetKey::Impact));
    assert_eq!(cfg.log_level.filter(), log::LevelFilter::Debug);
}

#[test]
fn cli_rejects_unknown_quality() {
    let err = Config::try_parse_from(["particle_wave", "--quality", "ultra"]);
    assert!(err.is_err());
}

#[test]
fn explicit_flags_override_preset_which_overrides_stored() {
    let path = temp_settings_path("precedence");
    let store = SettingsStore::new(Some(path.clone()));
    let stored = Settings {
        quality: QualityKey::High,
        wave: WaveKind::Ripple,
        sensitivity: 1.4,
        reduced_motion: false,
        high_contrast: true,
    };
    store.save(&stored).unwrap();

    let plain = startup_settings(&parse_cli(&[]), &store);
    assert_eq!(plain, stored);

    let cfg = parse_cli(&["--preset", "calm", "--sensitivity", "9"]);
    let s = startup_settings(&cfg, &store);
    assert_eq!(s.quality, QualityKey::Auto);
    assert_eq!(s.wave, WaveKind::Cosmos);
    assert!(s.reduced_motion);
    assert!(s.high_contrast);
    assert_eq!(s.sensitivity, 1.6);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn pixel_ratio_cap_sets_raster_supersampling() {
    assert_eq!(supersample_factor(QualityTier::Performance.pixel_ratio_cap()), 1);
    assert_eq!(supersample_factor(QualityTier::Balanced.pixel_ratio_cap()), 2);
    assert_eq!(supersample_factor(QualityTier::High.pixel_ratio_cap()), 2);
    assert_eq!(supersample_factor(f32::NAN), 1);
    assert_eq!(supersample_factor(0.2), 1);
    assert_eq!(supersample_factor(9.0), 2);

    let auto = resolve_quality(QualityKey::Auto, QualityTier::Performance);
    assert_eq!(auto.pixel_ratio_cap, 1.8);
    assert_eq!(auto.supersample(), 2);
    let perf = resolve_quality(QualityKey::Performance, QualityTier::High);
    assert_eq!(perf.supersample(), 1);
}

// ── Settings file ───────────────────────────────────────────────────────────

#[test]
fn settings_round_trip_through_store() {
    let path = temp_settings_path("round_trip");
    let store = SettingsStore::new(Some(path.clone()));
    let s = Settings {
        quality: QualityKey::Balanced,
        wave: WaveKind::Storm,
        sensitivity: 0.8,
        reduced_motion: true,
        high_contrast: false,
    };
    store.save(&s).unwrap();
    assert!(!path.with_extension("tmp").exists());
    assert_eq!(store.load().unwrap(), s);
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn missing_file_and_disabled_store_give_defaults() {
    let store = SettingsStore::new(Some(temp_settings_path("missing")));
    assert_eq!(store.load().unwrap(), Settings::default());
    let disabled = SettingsStore::disabled();
    assert_eq!(disabled.path(), None);
    assert_eq!(disabled.load().unwrap(), Settings::default());
    assert!(disabled.save(&Settings::default()).is_ok());
}

#[test]
fn malformed_line_is_a_parse_error() {
    let err = parse_settings("quality=high\nthis is not a setting\n").unwrap_err();
    assert_eq!(
        err,
        SettingsError::Parse {
            line: 2,
            message: "expected <key>=<value>".to_string()
        }
    );
}

#[test]
fn invalid_values_keep_defaults() {
    let s = parse_settings(
        "# old file\nquality=ultra\nwave=tsunami\nsensitivity=abc\nreduced_motion=maybe\nhigh_contrast=yes\nunknown=1\n",
    )
    .unwrap();
    let d = Settings::default();
    assert_eq!(s.quality, d.quality);
    assert_eq!(s.wave, d.wave);
    assert_eq!(s.sensitivity, d.sensitivity);
    assert_eq!(s.reduced_motion, d.reduced_motion);
    assert!(s.high_contrast);
}

#[test]
fn stored_sensitivity_is_sanitised() {
    let s = parse_settings("sensitivity=0.1").unwrap();
    assert_eq!(s.sensitivity, 0.6);
    let text = render_settings(&s);
    assert!(text.contains("sensitivity=0.6"));
    assert!(text.contains("quality=auto"));
}

// ── Capability probe ────────────────────────────────────────────────────────

#[test]
fn auto_tier_follows_device_class() {
    let mid = DeviceProfile {
        threads: 8,
        memory_gb: 8.0,
        mobile: false,
    };
    assert_eq!(resolve_auto_tier(&mid), QualityTier::Balanced);
    let phone = DeviceProfile {
        threads: 12,
        memory_gb: 12.0,
        mobile: true,
    };
    assert_eq!(resolve_auto_tier(&phone), QualityTier::Performance);
    let big = DeviceProfile {
        threads: 10,
        memory_gb: 8.0,
        mobile: false,
    };
    assert_eq!(resolve_auto_tier(&big), QualityTier::High);
    assert_eq!(resolve_auto_tier(&DeviceProfile::default()), QualityTier::Performance);
}

#[test]
fn report_status_label_is_readable() {
    let report = report_for(DeviceProfile {
        threads: 16,
        memory_gb: 32.0,
        mobile: false,
    });
    assert_eq!(report.auto_tier, QualityTier::High);
    assert_eq!(report.status_label(), "threads=16 mem=32.0GB -> High");
    assert!(!report.notes().is_empty());
}
