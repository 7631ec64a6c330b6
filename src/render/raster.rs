//! Software point rasteriser: projects the particle buffers through a fixed
//! perspective camera and splats them additively into an RGB raster.

use glam::{Mat4, Vec3};

use crate::field::FieldBuffers;
use crate::modes::Rgb;
use crate::session::{Cursor, Rotation};

pub const CAMERA_EYE: Vec3 = Vec3::new(0.0, 48.0, 118.0);
pub const CAMERA_FOV_DEG: f32 = 62.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 1200.0;

pub const BACKGROUND: (u8, u8, u8) = (5, 13, 21);
const FOG_DENSITY: f32 = 0.0014;
const POINT_OPACITY: f32 = 0.92;
// Splat weight per particle when one particle covers one pixel.
const DENSITY_GAIN: f32 = 6.0;
const EXPOSURE: f32 = 1.05;
// World-space size of one `point_size` unit.
const POINT_WORLD_SCALE: f32 = 0.35;

const RING_INNER: f32 = 1.5;
const RING_OUTER: f32 = 2.5;
const RING_SAMPLES: usize = 48;
const RING_OPACITY: f32 = 0.85;
const CORE_OPACITY: f32 = 0.34;

/// Packed 8-bit RGB image, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    rgb: Vec<u8>,
}

impl Raster {
    pub fn new(width: usize, height: usize) -> Self {
        let mut r = Self {
            width: 0,
            height: 0,
            rgb: Vec::new(),
        };
        r.resize(width, height);
        r
    }

    /// Wraps packed RGB bytes; `None` unless `rgb.len() == width * height * 3`.
    pub fn from_rgb(width: usize, height: usize, rgb: Vec<u8>) -> Option<Self> {
        (rgb.len() == width.checked_mul(height)?.checked_mul(3)?).then_some(Self {
            width,
            height,
            rgb,
        })
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.rgb.clear();
        self.rgb.resize(width.saturating_mul(height).saturating_mul(3), 0);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.rgb
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> (u8, u8, u8) {
        let i = (y * self.width + x) * 3;
        (self.rgb[i], self.rgb[i + 1], self.rgb[i + 2])
    }

    #[inline]
    fn set(&mut self, x: usize, y: usize, c: (u8, u8, u8)) {
        let i = (y * self.width + x) * 3;
        self.rgb[i] = c.0;
        self.rgb[i + 1] = c.1;
        self.rgb[i + 2] = c.2;
    }
}

/// Everything the rasteriser needs from one simulated frame.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    pub buffers: FieldBuffers<'a>,
    pub rotation: Rotation,
    pub cursor: Cursor,
    pub cursor_color: Rgb,
    pub point_size: f32,
    pub high_contrast: bool,
}

struct Camera {
    view_proj: Mat4,
    focal: f32,
    half_w: f32,
    half_h: f32,
}

impl Camera {
    fn looking_at_origin(width: usize, height: usize) -> Self {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let proj = Mat4::perspective_rh(CAMERA_FOV_DEG.to_radians(), aspect, NEAR, FAR);
        let view = Mat4::look_at_rh(CAMERA_EYE, Vec3::ZERO, Vec3::Y);
        Self {
            view_proj: proj * view,
            focal: proj.y_axis.y,
            half_w: width as f32 * 0.5,
            half_h: height as f32 * 0.5,
        }
    }

    /// World point to (pixel x, pixel y, depth), `None` outside the clip range.
    fn project(&self, p: Vec3) -> Option<(f32, f32, f32)> {
        let clip = self.view_proj * p.extend(1.0);
        // Right-handed perspective: w is the distance along the view axis.
        let depth = clip.w;
        if !(NEAR..FAR).contains(&depth) {
            return None;
        }
        Some((
            (clip.x / depth + 1.0) * self.half_w,
            (1.0 - clip.y / depth) * self.half_h,
            depth,
        ))
    }

    fn pixels_per_unit(&self, depth: f32) -> f32 {
        self.focal * self.half_h / depth
    }
}

/// Reusable accumulation state; keeps its buffer between frames.
pub struct Rasterizer {
    accum: Vec<[f32; 3]>,
    scratch: Raster,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self {
            accum: Vec::new(),
            scratch: Raster::default(),
        }
    }

    /// Renders at `factor` times the output resolution and box-filters down.
    pub fn rasterize_supersampled(&mut self, scene: &SceneView<'_>, out: &mut Raster, factor: usize) {
        if factor <= 1 {
            self.rasterize(scene, out);
            return;
        }
        let mut hi = std::mem::take(&mut self.scratch);
        let (w, h) = (out.width() * factor, out.height() * factor);
        if hi.width() != w || hi.height() != h {
            hi.resize(w, h);
        }
        self.rasterize(scene, &mut hi);
        downsample(&hi, factor, out);
        self.scratch = hi;
    }

    pub fn rasterize(&mut self, scene: &SceneView<'_>, out: &mut Raster) {
        let (w, h) = (out.width(), out.height());
        if w == 0 || h == 0 {
            return;
        }
        self.accum.clear();
        self.accum.resize(w * h, [0.0; 3]);

        let cam = Camera::looking_at_origin(w, h);
        // Y then X, matching an XYZ Euler rotation applied to the field.
        let model = Mat4::from_rotation_x(scene.rotation.x) * Mat4::from_rotation_y(scene.rotation.y);

        let count = scene.buffers.count.max(1) as f32;
        let weight = (DENSITY_GAIN * (w * h) as f32 / count).min(1.0) * POINT_OPACITY;

        let positions = scene.buffers.positions.chunks_exact(3);
        let colors = scene.buffers.colors.chunks_exact(3);
        for (p, c) in positions.zip(colors) {
            let world = model.transform_point3(Vec3::new(p[0], p[1], p[2]));
            let Some((px, py, depth)) = cam.project(world) else {
                continue;
            };
            let fd = FOG_DENSITY * depth;
            let k = weight * (-(fd * fd)).exp();
            let radius = scene.point_size * POINT_WORLD_SCALE * cam.pixels_per_unit(depth);
            self.splat(w, h, px, py, radius, [c[0] * k, c[1] * k, c[2] * k]);
        }

        let contrast = if scene.high_contrast { 1.35 } else { 1.0 };
        let bg = if scene.high_contrast {
            (0, 0, 0)
        } else {
            BACKGROUND
        };
        for y in 0..h {
            for x in 0..w {
                let a = self.accum[y * w + x];
                out.set(
                    x,
                    y,
                    (
                        tone(a[0] * contrast, bg.0),
                        tone(a[1] * contrast, bg.1),
                        tone(a[2] * contrast, bg.2),
                    ),
                );
            }
        }

        if scene.cursor.visible {
            draw_cursor(&cam, out, scene.cursor, scene.cursor_color);
        }
    }

    fn splat(&mut self, w: usize, h: usize, px: f32, py: f32, radius: f32, c: [f32; 3]) {
        let x0 = px.floor();
        let y0 = py.floor();
        if x0 < -1.0 || y0 < -1.0 || x0 > w as f32 || y0 > h as f32 {
            return;
        }
        let (xi, yi) = (x0 as i64, y0 as i64);
        self.add(w, h, xi, yi, c, 1.0);
        if radius > 0.75 {
            for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                self.add(w, h, xi + dx, yi + dy, c, 0.5);
            }
        }
    }

    #[inline]
    fn add(&mut self, w: usize, h: usize, x: i64, y: i64, c: [f32; 3], k: f32) {
        if x < 0 || y < 0 || x as usize >= w || y as usize >= h {
            return;
        }
        let a = &mut self.accum[y as usize * w + x as usize];
        a[0] += c[0] * k;
        a[1] += c[1] * k;
        a[2] += c[2] * k;
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

fn tone(v: f32, bg: u8) -> u8 {
    let v = v * EXPOSURE;
    let mapped = v / (1.0 + v);
    let out = bg as f32 + mapped * (255.0 - bg as f32);
    out.clamp(0.0, 255.0).round() as u8
}

fn draw_cursor(cam: &Camera, out: &mut Raster, cursor: Cursor, color: Rgb) {
    let (r, g, b) = color.to_u8();
    let (w, h) = (out.width(), out.height());
    let centre = Vec3::new(cursor.x, cursor.y, cursor.z);
    let mut blend_at = |p: Vec3, alpha: f32| {
        let Some((px, py, _)) = cam.project(p) else {
            return;
        };
        if px < 0.0 || py < 0.0 || px >= w as f32 || py >= h as f32 {
            return;
        }
        let (x, y) = (px as usize, py as usize);
        let (br, bg, bb) = out.pixel(x, y);
        out.set(x, y, (mix(br, r, alpha), mix(bg, g, alpha), mix(bb, b, alpha)));
    };

    let mid = (RING_INNER + RING_OUTER) * 0.5;
    for i in 0..RING_SAMPLES {
        let a = i as f32 / RING_SAMPLES as f32 * std::f32::consts::TAU;
        blend_at(centre + Vec3::new(a.cos(), 0.0, a.sin()) * mid, RING_OPACITY);
    }
    blend_at(centre, CORE_OPACITY);
}

/// Box-filters `src` into `dst`, which must be `factor` times smaller on each axis.
fn downsample(src: &Raster, factor: usize, dst: &mut Raster) {
    let (w, h) = (dst.width(), dst.height());
    if src.width() != w * factor || src.height() != h * factor {
        return;
    }
    let n = (factor * factor) as u32;
    for y in 0..h {
        for x in 0..w {
            let mut sum = [0u32; 3];
            for sy in 0..factor {
                for sx in 0..factor {
                    let (r, g, b) = src.pixel(x * factor + sx, y * factor + sy);
                    sum[0] += r as u32;
                    sum[1] += g as u32;
                    sum[2] += b as u32;
                }
            }
            dst.set(
                x,
                y,
                (
                    ((sum[0] + n / 2) / n) as u8,
                    ((sum[1] + n / 2) / n) as u8,
                    ((sum[2] + n / 2) / n) as u8,
                ),
            );
        }
    }
}

fn mix(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8
}
