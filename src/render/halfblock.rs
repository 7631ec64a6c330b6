use std::io::Write;

use crate::render::{begin_frame, finish_frame, raster_fits, ColorState, Frame, Renderer};

const UPPER_HALF: char = '\u{2580}';

/// Two raster rows per terminal row: the upper pixel as foreground, the lower as background.
#[derive(Default)]
pub struct HalfBlockRenderer {
    colors: ColorState,
}

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "half-block"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        if !raster_fits(frame, 1, 2) {
            return Ok(());
        }
        let raster = frame.raster;

        begin_frame(frame, out)?;
        self.colors.reset();
        for row in 0..frame.visual_rows as usize {
            for x in 0..frame.term_cols as usize {
                let top = raster.pixel(x, row * 2);
                let bottom = raster.pixel(x, row * 2 + 1);
                self.colors.set(out, top, bottom)?;
                write!(out, "{UPPER_HALF}")?;
            }
            out.write_all(b"\r\n")?;
        }
        finish_frame(frame, out)
    }
}
