use crate::capability;
use crate::config::{Config, QualityKey};
use crate::feed::{GestureScript, KeyboardHand, ScriptFeed};
use crate::fusion::GestureLabel;
use crate::render::{make_renderer, Frame, Raster, Rasterizer, SceneView};
use crate::session::Session;
use crate::settings::{settings_storage_path, Settings, SettingsStore};
use crate::terminal::TerminalGuard;
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use std::io::BufWriter;
use std::time::{Duration, Instant};

const SENSITIVITY_STEP: f32 = 0.1;
const TOAST_DURATION: Duration = Duration::from_millis(2200);
const MAX_HUD_ROWS: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    TogglePause,
    ToggleCamera,
    CyclePreset,
    Quality(QualityKey),
    CycleWave,
    Sensitivity(f32),
    ToggleReducedMotion,
    ToggleHighContrast,
    ResetView,
    ToggleHud,
    ToggleHelp,
    Hand(GestureLabel),
}

/// Maps a key press to an action. Hand keys only count while the keyboard drives the camera.
pub fn key_action(code: KeyCode, mods: KeyModifiers, hand_keys: bool) -> Option<Action> {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return Some(Action::Quit);
    }

    let action = match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Action::Quit,
        KeyCode::Char(' ') => Action::TogglePause,
        KeyCode::Char('g') | KeyCode::Char('G') => Action::ToggleCamera,
        KeyCode::Char('p') | KeyCode::Char('P') => Action::CyclePreset,
        KeyCode::Char('1') => Action::Quality(QualityKey::Auto),
        KeyCode::Char('2') => Action::Quality(QualityKey::High),
        KeyCode::Char('3') => Action::Quality(QualityKey::Balanced),
        KeyCode::Char('4') => Action::Quality(QualityKey::Performance),
        KeyCode::Char('w') | KeyCode::Char('W') => Action::CycleWave,
        KeyCode::Char('+') | KeyCode::Char('=') => Action::Sensitivity(SENSITIVITY_STEP),
        KeyCode::Char('-') | KeyCode::Char('_') => Action::Sensitivity(-SENSITIVITY_STEP),
        KeyCode::Char('m') | KeyCode::Char('M') => Action::ToggleReducedMotion,
        KeyCode::Char('c') | KeyCode::Char('C') => Action::ToggleHighContrast,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::ResetView,
        KeyCode::Char('i') | KeyCode::Char('I') => Action::ToggleHud,
        KeyCode::Char('?') | KeyCode::F(1) | KeyCode::Tab => Action::ToggleHelp,
        KeyCode::Char(c) if hand_keys => match c.to_ascii_lowercase() {
            'k' => Action::Hand(GestureLabel::Pointer),
            'f' => Action::Hand(GestureLabel::Fist),
            'v' => Action::Hand(GestureLabel::Victory),
            'l' => Action::Hand(GestureLabel::HangLoose),
            'o' => Action::Hand(GestureLabel::Open),
            'n' => Action::Hand(GestureLabel::None),
            _ => return None,
        },
        _ => return None,
    };
    Some(action)
}

enum GestureSource {
    Keyboard(KeyboardHand),
    Script(ScriptFeed),
}

impl GestureSource {
    fn label(&self) -> &'static str {
        match self {
            Self::Keyboard(_) => "keyboard hand",
            Self::Script(_) => "script",
        }
    }
}

struct Toast {
    text: String,
    until: Instant,
}

struct Ui {
    show_hud: bool,
    show_help: bool,
    toast: Option<Toast>,
    display_fps: f32,
}

/// Layers stored settings under the command line; a broken settings file falls back to defaults.
pub fn startup_settings(cfg: &Config, store: &SettingsStore) -> Settings {
    let stored = match store.load() {
        Ok(s) => s,
        Err(err) => {
            log::warn!("ignoring settings file: {err}");
            Settings::default()
        }
    };
    stored.with_cli(cfg)
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let store = if cfg.no_persist {
        SettingsStore::disabled()
    } else {
        SettingsStore::new(cfg.settings.clone().or_else(settings_storage_path))
    };
    let settings = startup_settings(&cfg, &store);

    let report = capability::probe();
    for note in report.notes() {
        log::info!("capability: {note}");
    }

    let mut session = Session::new(settings, &report.profile).context("start simulation")?;

    let mut gestures = match cfg.gesture_script.as_deref() {
        Some(path) => {
            let script = GestureScript::load(path)
                .with_context(|| format!("load gesture script {}", path.display()))?;
            session.set_camera_active(true);
            GestureSource::Script(ScriptFeed::start(
                script,
                session.gesture_mailbox(),
                cfg.loop_script,
            ))
        }
        None => GestureSource::Keyboard(KeyboardHand::new(session.gesture_mailbox())),
    };
    log::info!("gesture source: {}", gestures.label());

    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());
    let mut renderer = make_renderer(cfg.renderer);
    let (px_w_mul, px_h_mul) = cfg.renderer.cell_pixels();

    let mut last_size = crossterm::terminal::size().context("get terminal size")?;
    if last_size.1 < 2 || last_size.0 < 4 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {}x{})",
            last_size.0,
            last_size.1
        ));
    }

    let mut ui = Ui {
        show_hud: true,
        show_help: false,
        toast: None,
        display_fps: 0.0,
    };
    let mut hud_rows = hud_rows_for_size(last_size, ui.show_hud);
    let mut raster = Raster::new(0, 0);
    let mut rasterizer = Rasterizer::new();
    let mut last_frame = Instant::now();

    let result = loop {
        let now = Instant::now();

        let hand_keys = session.camera_active() && matches!(gestures, GestureSource::Keyboard(_));
        let mut quit = false;
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    if let Some(action) = key_action(k.code, k.modifiers, hand_keys) {
                        quit |= apply_action(action, &mut session, &mut gestures, &mut ui)?;
                    }
                }
                Event::Mouse(m) => {
                    let visual_rows = last_size.1.saturating_sub(hud_rows).max(1);
                    handle_mouse(m, last_size.0, visual_rows, &mut session, &mut gestures);
                }
                Event::FocusLost => session.clear_pointer(),
                Event::Resize(c, r) => last_size = (c, r),
                _ => {}
            }
        }
        if quit {
            break Ok(());
        }

        // Resize events can be missed in some terminals.
        let sz = crossterm::terminal::size()?;
        if sz != last_size {
            last_size = sz;
        }

        let dt = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        let report = match session.frame(dt) {
            Ok(r) => r,
            Err(err) => break Err(anyhow::Error::new(err).context("simulate frame")),
        };
        if let Some(fps) = report.display_fps {
            ui.display_fps = fps;
        }
        let notices = session.drain_notices();
        for notice in &notices {
            log::debug!("notice: {notice}");
        }
        if let Some(notice) = notices.last() {
            ui.toast = Some(Toast {
                text: notice.to_string(),
                until: now + TOAST_DURATION,
            });
        }
        if ui.toast.as_ref().is_some_and(|t| now >= t.until) {
            ui.toast = None;
        }

        let (term_cols, term_rows) = last_size;
        let hud = if ui.show_hud {
            build_hud(term_cols as usize, &session, &ui, gestures.label(), renderer.name())
        } else {
            String::new()
        };
        hud_rows = hud_rows_for_text(term_rows, ui.show_hud, &hud);
        let visual_rows = term_rows.saturating_sub(hud_rows).max(1);
        let w = (term_cols as usize).saturating_mul(px_w_mul);
        let h = (visual_rows as usize).saturating_mul(px_h_mul);
        if raster.width() != w || raster.height() != h {
            raster.resize(w, h);
        }

        let Some(buffers) = session.buffers() else {
            break Ok(());
        };
        let blended = session.blended();
        rasterizer.rasterize_supersampled(
            &SceneView {
                buffers,
                rotation: session.rotation(),
                cursor: session.cursor(),
                cursor_color: blended.color,
                point_size: session.point_size(),
                high_contrast: session.settings().high_contrast,
            },
            &mut raster,
            session.quality().supersample(),
        );

        let frame = Frame {
            term_cols,
            term_rows,
            visual_rows,
            raster: &raster,
            hud: &hud,
            hud_rows,
            hud_accent: Some(blended.color.to_u8()),
            overlay: ui.show_help.then(help_popup_text),
            sync_updates: cfg.sync_updates,
        };
        renderer.render(&frame, &mut out)?;

        // Frame pacing.
        let target = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);
        let elapsed = now.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    };

    if let Err(err) = store.save(session.settings()) {
        log::warn!("could not save settings: {err}");
    }
    session.stop();
    result
}

fn apply_action(
    action: Action,
    session: &mut Session,
    gestures: &mut GestureSource,
    ui: &mut Ui,
) -> anyhow::Result<bool> {
    match action {
        Action::Quit => return Ok(true),
        Action::TogglePause => {
            session.toggle_pause();
        }
        Action::ToggleCamera => {
            let on = !session.camera_active();
            session.set_camera_active(on);
            if !on {
                if let GestureSource::Keyboard(hand) = gestures {
                    hand.hide();
                }
            }
        }
        Action::CyclePreset => {
            session.cycle_preset().context("apply preset")?;
        }
        Action::Quality(key) => session.set_quality(key).context("apply quality")?,
        Action::CycleWave => {
            let next = session.settings().wave.next();
            session.set_wave(next);
            show_toast(ui, format!("Wave: {}", next.profile().label));
        }
        Action::Sensitivity(delta) => {
            let next = session.settings().sensitivity + delta;
            session.set_sensitivity(next);
            show_toast(ui, format!("Sensitivity: {:.1}", session.settings().sensitivity));
        }
        Action::ToggleReducedMotion => {
            let on = !session.settings().reduced_motion;
            session.set_reduced_motion(on);
            show_toast(ui, format!("Reduced motion: {}", on_off(on)));
        }
        Action::ToggleHighContrast => {
            let on = !session.settings().high_contrast;
            session.set_high_contrast(on);
            show_toast(ui, format!("High contrast: {}", on_off(on)));
        }
        Action::ResetView => session.reset_view(),
        Action::ToggleHud => ui.show_hud = !ui.show_hud,
        Action::ToggleHelp => ui.show_help = !ui.show_help,
        Action::Hand(label) => {
            if let GestureSource::Keyboard(hand) = gestures {
                hand.show(label);
            }
        }
    }
    Ok(false)
}

fn handle_mouse(
    m: MouseEvent,
    cols: u16,
    visual_rows: u16,
    session: &mut Session,
    gestures: &mut GestureSource,
) {
    if !matches!(
        m.kind,
        MouseEventKind::Moved | MouseEventKind::Drag(_) | MouseEventKind::Down(_)
    ) {
        return;
    }
    if m.row >= visual_rows || cols == 0 {
        session.clear_pointer();
        return;
    }
    let x = (m.column as f32 + 0.5) / cols as f32;
    let y = (m.row as f32 + 0.5) / visual_rows as f32;
    session.set_pointer(x, y);
    if let GestureSource::Keyboard(hand) = gestures {
        hand.move_to(x, y);
    }
}

fn show_toast(ui: &mut Ui, text: String) {
    ui.toast = Some(Toast {
        text,
        until: Instant::now() + TOAST_DURATION,
    });
}

fn on_off(v: bool) -> &'static str {
    if v { "on" } else { "off" }
}

fn hud_rows_for_size(size: (u16, u16), show_hud: bool) -> u16 {
    if !show_hud || size.1 <= 1 {
        return 0;
    }
    (size.1 - 1).min(MAX_HUD_ROWS)
}

fn hud_rows_for_text(term_rows: u16, show_hud: bool, hud: &str) -> u16 {
    if !show_hud {
        return 0;
    }
    let wanted = hud.lines().count() as u16;
    wanted.min(term_rows.saturating_sub(1)).min(MAX_HUD_ROWS)
}

fn build_hud(
    cols: usize,
    session: &Session,
    ui: &Ui,
    gesture_source: &str,
    renderer_name: &str,
) -> String {
    let settings = session.settings();
    let quality = session.quality();
    let mode = session.mode().mode();
    let preset = session.preset().map_or("Custom", |p| p.label());

    let mut lines = vec![
        format!(
            "{} | {} | Quality: {} ({} pts) | Wave: {} | FPS: {:>4.1}{}",
            mode.status_label,
            session.status().label(),
            quality.label,
            quality.particle_count(),
            settings.wave.profile().label,
            ui.display_fps,
            if session.is_paused() { " | PAUSED" } else { "" },
        ),
        format!(
            "Preset: {} | Sensitivity: {:.1} | Reduced motion: {} | Contrast: {} | Camera: {} ({}) | Renderer: {}",
            preset,
            settings.sensitivity,
            on_off(settings.reduced_motion),
            if settings.high_contrast { "high" } else { "normal" },
            on_off(session.camera_active()),
            gesture_source,
            renderer_name,
        ),
    ];
    match &ui.toast {
        Some(t) => lines.push(t.text.clone()),
        None => lines.push(
            "Keys: space pause | g camera | p preset | 1-4 quality | w wave | +/- sensitivity | m motion | c contrast | r reset | ? help | q quit"
                .to_string(),
        ),
    }

    wrap_hud_lines(cols, &lines).join("\n")
}

fn wrap_hud_lines(cols: usize, lines: &[String]) -> Vec<String> {
    let width = cols.max(1);
    let mut out = Vec::new();
    for line in lines {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            out.push(String::new());
            continue;
        }
        out.extend(chars.chunks(width).map(|c| c.iter().collect::<String>()));
    }
    out
}

fn help_popup_text() -> &'static str {
    "Particle Wave Hotkeys\n\
mouse  move over the field to interact\n\
space  pause/resume\n\
g  camera on/off\n\
p  cycle preset: calm/explorer/impact\n\
1/2/3/4  quality: auto/high/balanced/performance\n\
w  cycle wave: cosmos/ripple/storm\n\
+ / -  sensitivity up/down\n\
m  toggle reduced motion\n\
c  toggle high contrast\n\
r  reset view\n\
Camera on, keyboard hand:\n\
  k pointer  f fist  v victory  l hang-loose  o open  n hand lost\n\
i  show/hide HUD\n\
? or F1 or tab  toggle this help\n\
q or esc  quit"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hand_keys_need_keyboard_camera() {
        let none = KeyModifiers::NONE;
        assert_eq!(key_action(KeyCode::Char('f'), none, false), None);
        assert_eq!(
            key_action(KeyCode::Char('f'), none, true),
            Some(Action::Hand(GestureLabel::Fist))
        );
        assert_eq!(
            key_action(KeyCode::Char('n'), none, true),
            Some(Action::Hand(GestureLabel::None))
        );
    }

    #[test]
    fn ctrl_c_quits() {
        assert_eq!(
            key_action(KeyCode::Char('c'), KeyModifiers::CONTROL, false),
            Some(Action::Quit)
        );
        assert_eq!(
            key_action(KeyCode::Char('c'), KeyModifiers::NONE, false),
            Some(Action::ToggleHighContrast)
        );
    }

    #[test]
    fn number_keys_pick_quality() {
        let none = KeyModifiers::NONE;
        assert_eq!(
            key_action(KeyCode::Char('4'), none, false),
            Some(Action::Quality(QualityKey::Performance))
        );
        assert_eq!(
            key_action(KeyCode::Char('1'), none, false),
            Some(Action::Quality(QualityKey::Auto))
        );
    }

    #[test]
    fn hud_wrap_respects_width() {
        let lines = wrap_hud_lines(4, &["abcdefghij".to_string(), String::new()]);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", ""]);
    }

    #[test]
    fn hud_rows_are_capped() {
        assert_eq!(hud_rows_for_text(40, true, "a\nb\nc\nd\ne\nf"), MAX_HUD_ROWS);
        assert_eq!(hud_rows_for_text(40, false, "a"), 0);
        assert_eq!(hud_rows_for_size((80, 1), true), 0);
    }
}
