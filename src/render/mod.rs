mod braille;
mod halfblock;
mod raster;

pub use braille::BrailleRenderer;
pub use halfblock::HalfBlockRenderer;
pub use raster::{Raster, Rasterizer, SceneView, BACKGROUND, CAMERA_EYE, CAMERA_FOV_DEG};

use std::io::Write;

use crate::config::RendererMode;

/// One terminal frame: the field raster on top, HUD rows below, an optional popup over both.
pub struct Frame<'a> {
    pub term_cols: u16,
    pub term_rows: u16,
    pub visual_rows: u16,
    pub raster: &'a Raster,
    pub hud: &'a str,
    pub hud_rows: u16,
    /// Colour of the first HUD line; follows the blended mode colour.
    pub hud_accent: Option<(u8, u8, u8)>,
    pub overlay: Option<&'a str>,
    pub sync_updates: bool,
}

pub trait Renderer {
    fn name(&self) -> &'static str;
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

pub fn make_renderer(mode: RendererMode) -> Box<dyn Renderer> {
    match mode {
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
        RendererMode::Braille => Box::new(BrailleRenderer::new()),
    }
}

/// Tracks the last SGR colours so unchanged cells emit no escape codes.
#[derive(Default)]
pub(crate) struct ColorState {
    fg: Option<(u8, u8, u8)>,
    bg: Option<(u8, u8, u8)>,
}

impl ColorState {
    pub(crate) fn reset(&mut self) {
        self.fg = None;
        self.bg = None;
    }

    pub(crate) fn set(
        &mut self,
        out: &mut dyn Write,
        fg: (u8, u8, u8),
        bg: (u8, u8, u8),
    ) -> std::io::Result<()> {
        if self.fg != Some(fg) {
            write!(out, "\x1b[38;2;{};{};{}m", fg.0, fg.1, fg.2)?;
            self.fg = Some(fg);
        }
        if self.bg != Some(bg) {
            write!(out, "\x1b[48;2;{};{};{}m", bg.0, bg.1, bg.2)?;
            self.bg = Some(bg);
        }
        Ok(())
    }
}

/// Checks raster dimensions against the cell grid; `false` means skip the frame.
pub(crate) fn raster_fits(frame: &Frame<'_>, cell_w: usize, cell_h: usize) -> bool {
    let cols = frame.term_cols as usize;
    let rows = frame.visual_rows as usize;
    cols > 0
        && rows > 0
        && frame.raster.width() == cols * cell_w
        && frame.raster.height() == rows * cell_h
}

pub(crate) fn begin_frame(frame: &Frame<'_>, out: &mut dyn Write) -> std::io::Result<()> {
    if frame.sync_updates {
        out.write_all(b"\x1b[?2026h")?;
    }
    // Home, reset, autowrap off while painting full-width rows.
    out.write_all(b"\x1b[H\x1b[0m\x1b[?7l")
}

pub(crate) fn finish_frame(frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
    let cols = frame.term_cols as usize;
    let first_hud_row = frame.visual_rows as usize + 1;
    let mut lines = frame.hud.lines();
    for i in 0..frame.hud_rows as usize {
        let accent = if i == 0 { frame.hud_accent } else { None };
        write_hud_line(out, first_hud_row + i, cols, lines.next(), accent)?;
    }

    if let Some(text) = frame.overlay {
        draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
    }

    out.write_all(b"\x1b[0m\x1b[?7h")?;
    if frame.sync_updates {
        out.write_all(b"\x1b[?2026l")?;
    }
    out.flush()?;
    Ok(())
}

/// Clears terminal row `row` (1-based) and writes `line` cut to `cols` characters.
pub fn write_hud_line(
    out: &mut dyn Write,
    row: usize,
    cols: usize,
    line: Option<&str>,
    accent: Option<(u8, u8, u8)>,
) -> std::io::Result<()> {
    write!(out, "\x1b[{row};1H\x1b[0m\x1b[2K")?;
    let Some(line) = line else {
        return Ok(());
    };
    if let Some((r, g, b)) = accent {
        write!(out, "\x1b[1m\x1b[38;2;{r};{g};{b}m")?;
    }
    for ch in line.chars().take(cols) {
        write!(out, "{ch}")?;
    }
    if accent.is_some() {
        out.write_all(b"\x1b[0m")?;
    }
    Ok(())
}

pub fn draw_overlay_popup(
    out: &mut dyn Write,
    term_cols: u16,
    term_rows: u16,
    text: &str,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }

    let cols = term_cols as usize;
    let rows = term_rows as usize;
    if cols < 8 || rows < 4 {
        return Ok(());
    }

    let max_inner_w = cols.saturating_sub(6).max(1);
    let lines = wrap_lines(text, max_inner_w);
    if lines.is_empty() {
        return Ok(());
    }

    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let box_w = (widest.clamp(1, max_inner_w) + 4).min(cols.saturating_sub(2)).max(4);
    let inner_w = box_w.saturating_sub(4);
    let body_h = lines.len().min(rows.saturating_sub(3).max(1));
    let box_h = (body_h + 2).min(rows.saturating_sub(1)).max(3);

    let start_col = cols.saturating_sub(box_w) / 2 + 1;
    let start_row = rows.saturating_sub(box_h) / 2 + 1;

    let edge = format!("+{}+", "-".repeat(box_w.saturating_sub(2)));
    let blank = " ".repeat(inner_w);

    // Dim the field behind the popup; EL2 avoids edge-wrap artifacts.
    out.write_all(b"\x1b[0m\x1b[38;2;220;228;242m\x1b[48;2;2;4;10m")?;
    for row in 1..=rows {
        write!(out, "\x1b[{row};1H\x1b[2K")?;
    }

    out.write_all(b"\x1b[0m\x1b[38;2;236;242;255m\x1b[48;2;10;14;24m")?;
    write!(out, "\x1b[{start_row};{start_col}H{edge}")?;
    for (i, line) in lines.iter().take(body_h).enumerate() {
        let row = start_row + 1 + i;
        write!(out, "\x1b[{row};{start_col}H| {blank} |")?;
        let col = start_col + 2;
        if i == 0 {
            write!(
                out,
                "\x1b[{row};{col}H\x1b[1m\x1b[38;2;160;236;255m{line}\x1b[22m\x1b[38;2;236;242;255m"
            )?;
        } else {
            write!(out, "\x1b[{row};{col}H{line}")?;
        }
    }
    write!(out, "\x1b[{};{start_col}H{edge}", start_row + box_h - 1)?;
    out.write_all(b"\x1b[0m")?;
    Ok(())
}

fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let chars: Vec<char> = raw.chars().collect();
        for chunk in chars.chunks(width.max(1)) {
            lines.push(chunk.iter().collect());
        }
    }
    lines
}
