use particle_wave::config::RendererMode;
use particle_wave::field::{FieldBuffers, FieldUpdate, Interaction, ParticleField, WaveKind};
use particle_wave::modes::{BlendedMode, Mode, ModeKey, Rgb};
use particle_wave::render::{
    make_renderer, BrailleRenderer, Frame, HalfBlockRenderer, Raster, Rasterizer, Renderer,
    SceneView, BACKGROUND,
};
use particle_wave::session::{Cursor, Rotation};

/// Left half dark, right half bright.
fn split_raster(w: usize, h: usize) -> Raster {
    let mut rgb = Vec::with_capacity(w * h * 3);
    for _ in 0..h {
        for x in 0..w {
            let v = if x < w / 2 { 10 } else { 240 };
            rgb.extend_from_slice(&[v, v / 2, 255 - v]);
        }
    }
    Raster::from_rgb(w, h, rgb).expect("buffer matches dimensions")
}

fn make_frame<'a>(cols: u16, visual_rows: u16, raster: &'a Raster, sync: bool) -> Frame<'a> {
    Frame {
        term_cols: cols,
        term_rows: visual_rows + 2,
        visual_rows,
        raster,
        hud: "Idle | Performance | 60 fps\nkeys: ? help",
        hud_rows: 2,
        hud_accent: Some((120, 200, 255)),
        overlay: None,
        sync_updates: sync,
    }
}

fn render_to_string(renderer: &mut dyn Renderer, frame: &Frame<'_>) -> String {
    let mut out = Vec::new();
    renderer.render(frame, &mut out).expect("render should not fail");
    String::from_utf8(out).expect("renderer emits utf-8")
}

fn empty_scene(high_contrast: bool) -> SceneView<'static> {
    SceneView {
        buffers: FieldBuffers {
            positions: &[],
            colors: &[],
            count: 0,
        },
        rotation: Rotation::default(),
        cursor: Cursor::rest(),
        cursor_color: Rgb::new(1.0, 1.0, 1.0),
        point_size: 1.0,
        high_contrast,
    }
}

// ── Terminal renderers ──────────────────────────────────────────────────────

#[test]
fn half_block_paints_every_cell_with_sync_markers() {
    let raster = split_raster(8, 6);
    let frame = make_frame(8, 3, &raster, true);
    let s = render_to_string(&mut HalfBlockRenderer::new(), &frame);
    assert!(s.starts_with("\x1b[?2026h"));
    assert!(s.ends_with("\x1b[?2026l"));
    assert_eq!(s.matches('\u{2580}').count(), 24);
    assert!(s.contains("\x1b[38;2;240;120;15m"));
    assert!(s.contains("\x1b[?7l"));
}

#[test]
fn sync_markers_are_optional() {
    let raster = split_raster(8, 6);
    let frame = make_frame(8, 3, &raster, false);
    let s = render_to_string(&mut HalfBlockRenderer::new(), &frame);
    assert!(!s.contains("\x1b[?2026h"));
    assert!(!s.contains("\x1b[?2026l"));
}

#[test]
fn mismatched_raster_renders_nothing() {
    let raster = split_raster(8, 5);
    let frame = make_frame(8, 3, &raster, true);
    assert!(render_to_string(&mut HalfBlockRenderer::new(), &frame).is_empty());
    assert!(render_to_string(&mut BrailleRenderer::new(), &frame).is_empty());
}

#[test]
fn braille_encodes_edges_as_dots() {
    // Each 2x4 cell straddling the split gets one lit column.
    let raster = split_raster(6, 8);
    let frame = make_frame(3, 2, &raster, true);
    let s = render_to_string(&mut BrailleRenderer::new(), &frame);
    let dots = s
        .chars()
        .filter(|c| ('\u{2801}'..='\u{28ff}').contains(c))
        .count();
    assert!(dots >= 2, "expected braille dots in {s:?}");
}

#[test]
fn hud_lines_are_written_below_the_field() {
    let raster = split_raster(8, 6);
    let frame = make_frame(8, 3, &raster, true);
    let s = render_to_string(&mut HalfBlockRenderer::new(), &frame);
    // Lines are cut to the terminal width.
    assert!(s.contains("\x1b[4;1H"));
    assert!(s.contains("Idle | P"));
    assert!(!s.contains("Idle | Performance"));
    assert!(s.contains("\x1b[1m\x1b[38;2;120;200;255m"));
    assert!(s.contains("\x1b[5;1H"));
    assert!(s.contains("keys: ? "));
}

#[test]
fn overlay_popup_is_drawn_over_the_frame() {
    let raster = split_raster(40, 20);
    let mut frame = make_frame(40, 10, &raster, true);
    frame.overlay = Some("Help\nspace: pause");
    let s = render_to_string(&mut HalfBlockRenderer::new(), &frame);
    assert!(s.contains("space: pause"));
    assert!(s.contains("+---"));
}

#[test]
fn renderer_factory_names() {
    assert_eq!(make_renderer(RendererMode::HalfBlock).name(), "half-block");
    assert_eq!(make_renderer(RendererMode::Braille).name(), "braille");
}

// ── Rasterizer ──────────────────────────────────────────────────────────────

#[test]
fn empty_scene_is_background() {
    let mut raster = Raster::new(16, 12);
    let mut r = Rasterizer::new();
    r.rasterize(&empty_scene(false), &mut raster);
    assert!((0..12).all(|y| (0..16).all(|x| raster.pixel(x, y) == BACKGROUND)));

    r.rasterize(&empty_scene(true), &mut raster);
    assert_eq!(raster.pixel(3, 3), (0, 0, 0));
}

#[test]
fn lit_field_differs_from_background() {
    let mut rng = fastrand::Rng::with_seed(7);
    let mut field = ParticleField::allocate_with_rng(4000, &mut rng).unwrap();
    let mode = BlendedMode::from_mode(Mode::get(ModeKey::Idle));
    let wave = WaveKind::Cosmos.profile();
    field
        .update(&FieldUpdate {
            time: 1.0,
            mode_key: ModeKey::Idle,
            mode: &mode,
            wave: &wave,
            interaction: &Interaction::inactive(1.0),
            reduced_motion: false,
        })
        .unwrap();

    let mut raster = Raster::new(80, 48);
    let scene = SceneView {
        buffers: field.buffers(),
        ..empty_scene(false)
    };
    Rasterizer::new().rasterize(&scene, &mut raster);
    let lit = (0..48)
        .flat_map(|y| (0..80).map(move |x| (x, y)))
        .filter(|&(x, y)| raster.pixel(x, y) != BACKGROUND)
        .count();
    assert!(lit > 100, "only {lit} lit pixels");
}

#[test]
fn supersampled_pass_keeps_output_size() {
    let mut raster = Raster::new(16, 12);
    let mut r = Rasterizer::new();
    r.rasterize_supersampled(&empty_scene(false), &mut raster, 2);
    assert_eq!((raster.width(), raster.height()), (16, 12));
    assert!((0..12).all(|y| (0..16).all(|x| raster.pixel(x, y) == BACKGROUND)));

    let mut rng = fastrand::Rng::with_seed(11);
    let mut field = ParticleField::allocate_with_rng(4000, &mut rng).unwrap();
    let mode = BlendedMode::from_mode(Mode::get(ModeKey::Idle));
    let wave = WaveKind::Cosmos.profile();
    field
        .update(&FieldUpdate {
            time: 1.0,
            mode_key: ModeKey::Idle,
            mode: &mode,
            wave: &wave,
            interaction: &Interaction::inactive(1.0),
            reduced_motion: false,
        })
        .unwrap();
    let scene = SceneView {
        buffers: field.buffers(),
        ..empty_scene(false)
    };
    let mut plain = Raster::new(80, 48);
    r.rasterize(&scene, &mut plain);
    let mut fine = Raster::new(80, 48);
    r.rasterize_supersampled(&scene, &mut fine, 2);
    let lit = (0..48)
        .flat_map(|y| (0..80).map(move |x| (x, y)))
        .filter(|&(x, y)| fine.pixel(x, y) != BACKGROUND)
        .count();
    assert!(lit > 100, "only {lit} lit pixels");

    // Factor one is the plain pass.
    let mut same = Raster::new(80, 48);
    r.rasterize_supersampled(&scene, &mut same, 1);
    assert_eq!(same.data(), plain.data());
}

#[test]
fn visible_cursor_is_drawn() {
    let mut raster = Raster::new(80, 48);
    let scene = SceneView {
        cursor: Cursor {
            visible: true,
            ..Cursor::rest()
        },
        cursor_color: Rgb::new(1.0, 0.2, 0.2),
        ..empty_scene(false)
    };
    Rasterizer::new().rasterize(&scene, &mut raster);
    let changed = (0..48)
        .flat_map(|y| (0..80).map(move |x| (x, y)))
        .any(|(x, y)| raster.pixel(x, y) != BACKGROUND);
    assert!(changed);
}

#[test]
fn raster_rejects_wrong_buffer_length() {
    assert!(Raster::from_rgb(4, 4, vec![0; 47]).is_none());
    let mut r = Raster::new(2, 2);
    r.resize(5, 3);
    assert_eq!((r.width(), r.height(), r.data().len()), (5, 3, 45));
}
