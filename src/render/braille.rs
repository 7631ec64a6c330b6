use std::io::Write;

use crate::render::{begin_frame, finish_frame, raster_fits, ColorState, Frame, Renderer};

// Braille dot bit for pixel (dx, dy) at index dy * 2 + dx.
const DOT_BITS: [u8; 8] = [0x01, 0x08, 0x02, 0x10, 0x04, 0x20, 0x40, 0x80];
// Cells whose brightest pixel is this close to the darkest render as a flat block.
const FLAT_CELL_SPREAD: u16 = 6;

/// 2x4 raster pixels per cell; lit dots take the mean colour of the bright pixels.
#[derive(Default)]
pub struct BrailleRenderer {
    colors: ColorState,
}

impl BrailleRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for BrailleRenderer {
    fn name(&self) -> &'static str {
        "braille"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        if !raster_fits(frame, 2, 4) {
            return Ok(());
        }
        let raster = frame.raster;

        begin_frame(frame, out)?;
        self.colors.reset();
        for row in 0..frame.visual_rows as usize {
            for col in 0..frame.term_cols as usize {
                let mut px = [(0u8, 0u8, 0u8); 8];
                for (i, p) in px.iter_mut().enumerate() {
                    *p = raster.pixel(col * 2 + i % 2, row * 4 + i / 2);
                }
                let (fg, bg, ch) = encode_cell(&px);
                self.colors.set(out, fg, bg)?;
                write!(out, "{ch}")?;
            }
            out.write_all(b"\r\n")?;
        }
        finish_frame(frame, out)
    }
}

/// Splits a cell at its mid luma into lit dots (foreground) and the rest (background).
pub(crate) fn encode_cell(px: &[(u8, u8, u8); 8]) -> ((u8, u8, u8), (u8, u8, u8), char) {
    let lum = px.map(|(r, g, b)| luma(r, g, b));
    let lo = lum.iter().copied().min().unwrap_or(0);
    let hi = lum.iter().copied().max().unwrap_or(0);

    if hi - lo <= FLAT_CELL_SPREAD {
        let c = mean(px.iter().copied());
        return (c, c, ' ');
    }

    let thr = (lo + hi) / 2;
    let mut bits = 0u8;
    for (i, &l) in lum.iter().enumerate() {
        if l > thr {
            bits |= DOT_BITS[i];
        }
    }
    let fg = mean((0..8).filter(|&i| lum[i] > thr).map(|i| px[i]));
    let bg = mean((0..8).filter(|&i| lum[i] <= thr).map(|i| px[i]));
    let ch = char::from_u32(0x2800 + bits as u32).unwrap_or(' ');
    (fg, bg, ch)
}

fn mean(it: impl Iterator<Item = (u8, u8, u8)>) -> (u8, u8, u8) {
    let (mut r, mut g, mut b, mut n) = (0u32, 0u32, 0u32, 0u32);
    for (pr, pg, pb) in it {
        r += pr as u32;
        g += pg as u32;
        b += pb as u32;
        n += 1;
    }
    if n == 0 {
        return (0, 0, 0);
    }
    ((r / n) as u8, (g / n) as u8, (b / n) as u8)
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u16 {
    // Rec.709 weights in 8.8 fixed point.
    ((r as u32 * 54 + g as u32 * 183 + b as u32 * 19) >> 8) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_cell_is_a_blank_with_matching_colours() {
        let (fg, bg, ch) = encode_cell(&[(5, 13, 21); 8]);
        assert_eq!(ch, ' ');
        assert_eq!(fg, bg);
    }

    #[test]
    fn single_bright_pixel_lights_one_dot() {
        let mut px = [(0, 0, 0); 8];
        px[0] = (255, 255, 255);
        let (fg, bg, ch) = encode_cell(&px);
        assert_eq!(ch, '\u{2801}');
        assert_eq!(fg, (255, 255, 255));
        assert_eq!(bg, (0, 0, 0));
    }
}
