use particle_wave::config::QualityTier;
use particle_wave::field::{
    compute_wave_height, interaction_offset, FieldError, FieldUpdate, Interaction, ParticleField,
    WaveKind, GRID_EXTENT,
};
use particle_wave::modes::{BlendedMode, Mode, ModeKey};

fn seeded_field(count: usize, seed: u64) -> ParticleField {
    let mut rng = fastrand::Rng::with_seed(seed);
    ParticleField::allocate_with_rng(count, &mut rng).expect("allocation should succeed")
}

fn step(
    field: &mut ParticleField,
    time: f32,
    key: ModeKey,
    wave: WaveKind,
    interaction: Interaction,
) -> Result<(), FieldError> {
    let mode = BlendedMode::from_mode(Mode::get(key));
    let profile = wave.profile();
    field.update(&FieldUpdate {
        time,
        mode_key: key,
        mode: &mode,
        wave: &profile,
        interaction: &interaction,
        reduced_motion: false,
    })
}

#[test]
fn allocation_sizes_match_count() {
    for tier in QualityTier::ALL {
        let n = tier.particle_count();
        let field = seeded_field(n, 1);
        let b = field.buffers();
        assert_eq!(field.len(), n);
        assert_eq!(b.count, n);
        assert_eq!(b.positions.len(), n * 3);
        assert_eq!(b.colors.len(), n * 3);
        assert_eq!(field.base_x().len(), n);
        assert_eq!(field.noise().len(), n);
    }
}

#[test]
fn baseline_is_inside_grid_and_radius_is_consistent() {
    let field = seeded_field(2000, 3);
    let half = GRID_EXTENT * 0.5;
    for i in 0..field.len() {
        let (x, z) = (field.base_x()[i], field.base_z()[i]);
        assert!((-half..=half).contains(&x));
        assert!((-half..=half).contains(&z));
        let r = (x * x + z * z).sqrt();
        assert!((field.base_radius()[i] - r).abs() < 1e-3);
        assert!((0.0..1.0).contains(&field.noise()[i]));
    }
    let p = field.buffers().positions;
    assert_eq!(p[0], field.base_x()[0]);
    assert_eq!(p[1], 0.0);
    assert_eq!(p[2], field.base_z()[0]);
}

#[test]
fn cosmos_at_time_zero_matches_closed_form() {
    let mut field = seeded_field(500, 11);
    step(&mut field, 0.0, ModeKey::Idle, WaveKind::Cosmos, Interaction::inactive(1.0)).unwrap();
    let heights: Vec<f32> = field.heights().collect();
    for i in 0..field.len() {
        let x = field.base_x()[i];
        let z = field.base_z()[i];
        let r = field.base_radius()[i];
        let expected = (x * 0.047).sin() * (z * 0.043).cos() * 2.2 + (r * 0.1).sin() * 1.55;
        assert!((heights[i] - expected).abs() < 1e-4, "particle {i}");
        // x and z never move.
        let p = &field.buffers().positions[i * 3..i * 3 + 3];
        assert_eq!((p[0], p[2]), (x, z));
    }
}

#[test]
fn same_seed_and_inputs_give_identical_buffers() {
    let mut a = seeded_field(1000, 42);
    let mut b = seeded_field(1000, 42);
    for wave in WaveKind::ALL {
        let interaction = Interaction {
            active: true,
            cursor_x: 10.0,
            cursor_z: -5.0,
            sensitivity: 1.2,
        };
        step(&mut a, 3.7, ModeKey::Fist, wave, interaction).unwrap();
        step(&mut b, 3.7, ModeKey::Fist, wave, interaction).unwrap();
        assert_eq!(a.buffers().positions, b.buffers().positions);
        assert_eq!(a.buffers().colors, b.buffers().colors);
    }
}

#[test]
fn influence_is_zero_outside_radius() {
    let mode = BlendedMode::from_mode(Mode::get(ModeKey::Pointer));
    let radius = mode.influence_radius * 1.0;
    assert_eq!(interaction_offset(ModeKey::Pointer, &mode, 0.3, radius * radius, 1.0), 0.0);
    assert_eq!(interaction_offset(ModeKey::Fist, &mode, 0.9, radius * radius * 4.0, 1.0), 0.0);
}

#[test]
fn non_fist_modes_sink_inside_radius() {
    for key in [ModeKey::Idle, ModeKey::Pointer, ModeKey::Victory, ModeKey::Open] {
        let mode = BlendedMode::from_mode(Mode::get(key));
        let off = interaction_offset(key, &mode, 0.5, 1.0, 1.0);
        assert!(off < 0.0, "{key:?} should sink, got {off}");
    }
    // Centre of the disc: full strength scaled by sensitivity.
    let mode = BlendedMode::from_mode(Mode::get(ModeKey::Pointer));
    let off = interaction_offset(ModeKey::Pointer, &mode, 0.5, 0.0, 1.5);
    assert!((off + 14.0 * 1.5).abs() < 1e-4);
}

#[test]
fn fist_burst_sign_follows_noise() {
    let mode = BlendedMode::from_mode(Mode::get(ModeKey::Fist));
    let up = interaction_offset(ModeKey::Fist, &mode, 0.8, 4.0, 1.0);
    let down = interaction_offset(ModeKey::Fist, &mode, 0.2, 4.0, 1.0);
    assert!(up > 0.0);
    assert!(down < 0.0);
    assert!((up + down).abs() < 1e-4);
    assert_eq!(interaction_offset(ModeKey::Fist, &mode, 0.5, 4.0, 1.0), 0.0);
}

#[test]
fn active_cursor_only_moves_particles_near_it() {
    let mut plain = seeded_field(3000, 5);
    let mut touched = seeded_field(3000, 5);
    step(&mut plain, 1.0, ModeKey::Pointer, WaveKind::Ripple, Interaction::inactive(1.0)).unwrap();
    let interaction = Interaction {
        active: true,
        cursor_x: 0.0,
        cursor_z: 0.0,
        sensitivity: 1.0,
    };
    step(&mut touched, 1.0, ModeKey::Pointer, WaveKind::Ripple, interaction).unwrap();

    let radius = Mode::get(ModeKey::Pointer).influence_radius;
    let base: Vec<f32> = plain.heights().collect();
    for (i, h) in touched.heights().enumerate() {
        let r = touched.base_radius()[i];
        if r >= radius {
            assert_eq!(h, base[i]);
        } else {
            assert!(h <= base[i]);
        }
    }
}

#[test]
fn colours_stay_in_unit_range() {
    let mut field = seeded_field(1000, 8);
    let interaction = Interaction {
        active: true,
        cursor_x: 20.0,
        cursor_z: 20.0,
        sensitivity: 1.6,
    };
    step(&mut field, 12.5, ModeKey::Fist, WaveKind::Storm, interaction).unwrap();
    assert!(field.buffers().colors.iter().all(|c| (0.0..=1.0).contains(c)));
}

#[test]
fn invalid_updates_are_rejected() {
    let mut field = seeded_field(10, 2);
    let bad_sensitivity = Interaction::inactive(0.0);
    assert!(matches!(
        step(&mut field, 0.0, ModeKey::Idle, WaveKind::Cosmos, bad_sensitivity),
        Err(FieldError::Precondition(_))
    ));
    let bad_cursor = Interaction {
        active: true,
        cursor_x: f32::NAN,
        cursor_z: 0.0,
        sensitivity: 1.0,
    };
    assert!(matches!(
        step(&mut field, 0.0, ModeKey::Idle, WaveKind::Cosmos, bad_cursor),
        Err(FieldError::Precondition(_))
    ));
}

#[test]
fn resize_rebuilds_every_buffer() {
    let mut field = seeded_field(100, 9);
    assert!(field.set_particle_count(250).unwrap());
    assert_eq!(field.len(), 250);
    assert_eq!(field.base_radius().len(), 250);
    assert_eq!(field.buffers().colors.len(), 750);
}

#[test]
fn unknown_wave_falls_back_to_cosmos() {
    assert_eq!(WaveKind::parse_or_default("tsunami"), WaveKind::Cosmos);
    assert_eq!(WaveKind::parse_or_default("Storm"), WaveKind::Storm);
    let a = compute_wave_height(3.0, 4.0, 5.0, 0.5, WaveKind::parse_or_default("?"), 0.2, false);
    let b = compute_wave_height(3.0, 4.0, 5.0, 0.5, WaveKind::Cosmos, 0.2, false);
    assert_eq!(a, b);
}
