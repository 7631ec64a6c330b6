use std::time::{Duration, Instant};

use anyhow::Result;
use particle_wave::adaptive::AdaptiveQuality;
use particle_wave::config::{supersample_factor, QualityTier};
use particle_wave::field::{FieldUpdate, Interaction, ParticleField, WaveKind};
use particle_wave::fps::FrameRateMonitor;
use particle_wave::modes::{blend_factor, BlendedMode, Mode, ModeKey};
use particle_wave::render::{Raster, Rasterizer, SceneView};
use particle_wave::session::{pointer_to_world, Cursor, Rotation};

struct Args {
    frames: usize,
    w: usize,
    h: usize,
    wave: Option<WaveKind>,
    start_tier: QualityTier,
    profile: Vec<(f32, usize)>,
    seed: u64,
    ci_smoke: bool,
    quick: bool,
    max_ms: f64,
}

fn parse_args() -> Args {
    let mut args = Args {
        frames: 180,
        w: 160,
        h: 88,
        wave: None,
        start_tier: QualityTier::High,
        profile: default_profile(),
        seed: 7,
        ci_smoke: false,
        quick: false,
        max_ms: 40.0,
    };

    let argv = std::env::args().skip(1).collect::<Vec<_>>();
    let mut i = 0usize;
    while i < argv.len() {
        let k = argv[i].as_str();
        let v = argv.get(i + 1).map(|s| s.as_str());
        match (k, v) {
            ("--frames", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.frames = n.max(1);
                }
                i += 2;
            }
            ("--w", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.w = n.max(1);
                }
                i += 2;
            }
            ("--h", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.h = n.max(1);
                }
                i += 2;
            }
            ("--wave", Some(x)) => {
                args.wave = WaveKind::parse(x);
                i += 2;
            }
            ("--start", Some(x)) => {
                args.start_tier = match x {
                    "performance" => QualityTier::Performance,
                    "balanced" => QualityTier::Balanced,
                    _ => QualityTier::High,
                };
                i += 2;
            }
            ("--fps-profile", Some(x)) => {
                match parse_profile(x) {
                    Some(p) => args.profile = p,
                    None => log::warn!("ignoring malformed --fps-profile '{x}'"),
                }
                i += 2;
            }
            ("--seed", Some(x)) => {
                if let Ok(n) = x.parse::<u64>() {
                    args.seed = n;
                }
                i += 2;
            }
            ("--ci-smoke", Some(x)) if !x.starts_with("--") => {
                args.ci_smoke = parse_bool(x).unwrap_or(true);
                i += 2;
            }
            ("--ci-smoke", _) => {
                args.ci_smoke = true;
                i += 1;
            }
            ("--quick", Some(x)) if !x.starts_with("--") => {
                args.quick = parse_bool(x).unwrap_or(true);
                i += 2;
            }
            ("--quick", _) => {
                args.quick = true;
                i += 1;
            }
            ("--max-ms", Some(x)) => {
                if let Ok(v) = x.parse::<f64>() {
                    args.max_ms = v.max(0.1);
                }
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    if args.quick {
        args.frames = args.frames.min(60);
    }

    args
}

/// Slow stretch, long fast stretch, then a dip that recovers before the low streak fires.
fn default_profile() -> Vec<(f32, usize)> {
    vec![(20.0, 300), (60.0, 1200), (24.0, 150), (60.0, 200)]
}

/// `fps x frames` segments, comma separated: `20x300,60x1200`.
fn parse_profile(s: &str) -> Option<Vec<(f32, usize)>> {
    s.split(',')
        .map(|seg| {
            let (fps, frames) = seg.trim().split_once('x')?;
            let fps = fps.trim().parse::<f32>().ok().filter(|v| v.is_finite() && *v > 0.0)?;
            let frames = frames.trim().parse::<usize>().ok()?;
            Some((fps, frames))
        })
        .collect()
}

fn parse_bool(s: &str) -> Option<bool> {
    let v = s.trim().to_ascii_lowercase();
    match v.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Scripted pointer path: a slow circle, switching modes every second.
fn scripted_input(frame: usize) -> (ModeKey, f32, f32) {
    let t = frame as f32 / 60.0;
    let modes = [
        ModeKey::Pointer,
        ModeKey::Fist,
        ModeKey::Victory,
        ModeKey::HangLoose,
        ModeKey::Open,
        ModeKey::Idle,
    ];
    let mode = modes[(frame / 60) % modes.len()];
    (mode, 0.5 + (t * 0.9).cos() * 0.3, 0.5 + (t * 0.9).sin() * 0.3)
}

struct TierResult {
    tier: QualityTier,
    wave: WaveKind,
    update_ms: f64,
    raster_ms: f64,
    lit_frames: usize,
    finite: bool,
}

fn bench_tier(args: &Args, tier: QualityTier, wave: WaveKind) -> Result<TierResult> {
    let mut rng = fastrand::Rng::with_seed(args.seed);
    let mut field = ParticleField::allocate_with_rng(tier.particle_count(), &mut rng)?;
    let mut raster = Raster::new(args.w, args.h);
    let mut rasterizer = Rasterizer::new();
    let profile = wave.profile();
    let mut blended = BlendedMode::idle();
    let mut cursor = Cursor::rest();
    let mut rotation = Rotation::default();
    let supersample = supersample_factor(tier.pixel_ratio_cap());
    let dt = 1.0 / 60.0;
    let mut time = 0.0f32;

    let mut update_time = Duration::ZERO;
    let mut raster_time = Duration::ZERO;
    let mut lit_frames = 0usize;
    let mut finite = true;

    for f in 0..args.frames {
        let (mode_key, px, py) = scripted_input(f);
        let target = Mode::get(mode_key);
        blended.advance(target, blend_factor(false));
        if !target.freeze {
            time += dt * blended.time_speed.max(0.0);
        }
        let active = mode_key != ModeKey::Idle;
        if active {
            let (wx, wz) = pointer_to_world(px, py);
            cursor.x += (wx - cursor.x) * 0.13;
            cursor.z += (wz - cursor.z) * 0.13;
        }
        cursor.visible = active;
        rotation.y += blended.rotation_speed + cursor.x * 0.000014;
        rotation.x += (-cursor.z * 0.00002 - rotation.x) * 0.06;

        let interaction = Interaction {
            active,
            cursor_x: cursor.x,
            cursor_z: cursor.z,
            sensitivity: 1.0,
        };
        let start = Instant::now();
        field.update(&FieldUpdate {
            time,
            mode_key,
            mode: &blended,
            wave: &profile,
            interaction: &interaction,
            reduced_motion: false,
        })?;
        update_time += start.elapsed();
        finite &= field.heights().all(f32::is_finite);

        let start = Instant::now();
        rasterizer.rasterize_supersampled(
            &SceneView {
                buffers: field.buffers(),
                rotation,
                cursor,
                cursor_color: blended.color,
                point_size: blended.point_size,
                high_contrast: false,
            },
            &mut raster,
            supersample,
        );
        raster_time += start.elapsed();
        if raster.data().chunks_exact(3).any(|p| p != [5, 13, 21]) {
            lit_frames += 1;
        }
    }

    let per_frame = |d: Duration| d.as_secs_f64() * 1000.0 / args.frames as f64;
    Ok(TierResult {
        tier,
        wave,
        update_ms: per_frame(update_time),
        raster_ms: per_frame(raster_time),
        lit_frames,
        finite,
    })
}

#[derive(Debug, PartialEq)]
struct Transition {
    frame: usize,
    from: QualityTier,
    to: QualityTier,
}

/// Feeds a synthetic frame-rate timeline through the monitor and the adaptive controller.
fn replay_adaptive(start: QualityTier, profile: &[(f32, usize)]) -> (QualityTier, Vec<Transition>) {
    let mut monitor = FrameRateMonitor::default();
    let mut adaptive = AdaptiveQuality::default();
    let mut tier = start;
    let mut transitions = Vec::new();
    let mut frame = 0usize;
    for &(fps, frames) in profile {
        for _ in 0..frames {
            frame += 1;
            let Some(smoothed) = monitor.update(1.0 / fps) else {
                continue;
            };
            if let Some(next) = adaptive.update(smoothed, tier) {
                transitions.push(Transition {
                    frame,
                    from: tier,
                    to: next,
                });
                tier = next;
            }
        }
    }
    (tier, transitions)
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();
    let args = parse_args();

    let waves = match args.wave {
        Some(w) => vec![w],
        None => WaveKind::ALL.to_vec(),
    };
    println!(
        "Field benchmark: frames={} raster={}x{} waves={} quick={}",
        args.frames,
        args.w,
        args.h,
        waves.len(),
        args.quick
    );

    let mut failures = Vec::<String>::new();
    for tier in QualityTier::ALL {
        for &wave in &waves {
            let r = bench_tier(&args, tier, wave)?;
            let total = r.update_ms + r.raster_ms;
            println!(
                "  {:<11} {:<7} {:>6} pts  update {:>7.3} ms  raster {:>7.3} ms  total {:>7.3} ms/frame  lit={:>3}/{}",
                r.tier.label(),
                r.wave.as_str(),
                r.tier.particle_count(),
                r.update_ms,
                r.raster_ms,
                total,
                r.lit_frames,
                args.frames
            );
            if !r.finite {
                failures.push(format!("{} {}: non-finite heights", r.tier.label(), r.wave.as_str()));
            }
            if r.lit_frames == 0 {
                failures.push(format!("{} {}: blank raster", r.tier.label(), r.wave.as_str()));
            }
            if args.ci_smoke && total > args.max_ms {
                failures.push(format!(
                    "{} {}: {:.3} ms/frame > {:.3}",
                    r.tier.label(),
                    r.wave.as_str(),
                    total,
                    args.max_ms
                ));
            }
        }
    }

    let (final_tier, transitions) = replay_adaptive(args.start_tier, &args.profile);
    println!(
        "Adaptive replay: start={} segments={}",
        args.start_tier.label(),
        args.profile.len()
    );
    for t in &transitions {
        println!("  frame {:>5}: {} -> {}", t.frame, t.from.label(), t.to.label());
    }
    println!("  final tier: {}", final_tier.label());

    if args.ci_smoke {
        // The default timeline must degrade once during the slow stretch and recover during the fast one.
        let (_, expected) = replay_adaptive(QualityTier::High, &default_profile());
        let degrade = expected
            .iter()
            .any(|t| t.from == QualityTier::High && t.to == QualityTier::Balanced);
        let recover = expected
            .iter()
            .any(|t| t.from == QualityTier::Balanced && t.to == QualityTier::High);
        if !degrade || !recover {
            failures.push(format!("adaptive replay transitions: {expected:?}"));
        }

        if !failures.is_empty() {
            eprintln!("CI smoke: FAIL");
            for f in &failures {
                eprintln!("  {f}");
            }
            anyhow::bail!("ci smoke failed");
        }
        println!("CI smoke: PASS (max_ms={:.3})", args.max_ms);
    } else {
        for f in &failures {
            log::warn!("{f}");
        }
    }

    Ok(())
}
