//! Per-texel kernel functions.
//!
//! Every output texel of every stage is a pure function of a bounded input
//! neighbourhood. These functions are that definition: the reference backend
//! dispatches them over the 2-D texel grid, and the WGSL programs in
//! `shaders` mirror them expression for expression.
//!
//! All reads clamp to the texture edge, so border texels and 1x1 textures
//! never read out of bounds.

use crate::params::EdgePolarity;
use crate::texture::{PixelFormat, TextureDesc};

/// Rec.709 luma weights applied to RGBA input.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2125, 0.7154, 0.0721];

/// Largest Sobel magnitude reachable with luminance in [0, 1] (sqrt(20)).
pub const MAX_SOBEL_MAGNITUDE: f32 = 4.472_136;

/// Class value of a strong edge in a class map.
pub const STRONG_EDGE: f32 = 1.0;
/// Class value of a weak edge in a class map.
pub const WEAK_EDGE: f32 = 0.5;

const STRONG_CUTOFF: f32 = 0.75;
const WEAK_CUTOFF: f32 = 0.25;

/// Side of the luminance window gathered around each texel.
const WINDOW: i32 = 5;
const CENTER: i32 = 2;

/// Axis of a separable blur pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurDirection {
    Horizontal,
    Vertical,
}

impl BlurDirection {
    /// Unit texel offset along the pass.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::Horizontal => (1, 0),
            Self::Vertical => (0, 1),
        }
    }
}

/// Resolved per-frame settings of the gradient program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientConfig {
    /// Distance between gradient taps, in pixels.
    pub step_x: f32,
    pub step_y: f32,
    pub threshold: f32,
    /// When set, the program emits a strong/weak class map instead of
    /// final output.
    pub low_threshold: Option<f32>,
    pub polarity: EdgePolarity,
    pub output: PixelFormat,
}

impl GradientConfig {
    pub fn emits_classes(&self) -> bool {
        self.low_threshold.is_some()
    }

    /// Format written by the program.
    pub fn output_format(&self) -> PixelFormat {
        if self.emits_classes() {
            PixelFormat::Luminance
        } else {
            self.output
        }
    }
}

/// Settings of one weak-edge propagation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeakEdgeConfig {
    /// Last pass: drop remaining weak texels and write final output.
    pub resolve: bool,
    pub polarity: EdgePolarity,
    pub output: PixelFormat,
}

/// Read-only clamped view over interleaved f32 texels.
#[derive(Clone, Copy)]
pub struct TexelView<'a> {
    data: &'a [f32],
    width: u32,
    height: u32,
    channels: u32,
}

impl<'a> TexelView<'a> {
    pub fn new(data: &'a [f32], desc: TextureDesc) -> Self {
        Self {
            data,
            width: desc.width,
            height: desc.height,
            channels: desc.channels(),
        }
    }

    /// Channel `ch` at (x, y), clamped to the edge.
    #[inline]
    pub fn fetch(&self, x: i32, y: i32, ch: u32) -> f32 {
        let cx = x.clamp(0, self.width as i32 - 1) as usize;
        let cy = y.clamp(0, self.height as i32 - 1) as usize;
        self.data[(cy * self.width as usize + cx) * self.channels as usize + ch as usize]
    }

    #[inline]
    pub fn luminance_at(&self, x: i32, y: i32) -> f32 {
        if self.channels < 3 {
            return self.fetch(x, y, 0);
        }
        self.fetch(x, y, 0) * LUMA_WEIGHTS[0]
            + self.fetch(x, y, 1) * LUMA_WEIGHTS[1]
            + self.fetch(x, y, 2) * LUMA_WEIGHTS[2]
    }

    /// Bilinear luminance at a fractional pixel position, clamp-to-edge.
    pub fn sample_luminance(&self, px: f32, py: f32) -> f32 {
        let sx = px.clamp(0.0, (self.width - 1) as f32);
        let sy = py.clamp(0.0, (self.height - 1) as f32);
        let x0 = sx.floor();
        let y0 = sy.floor();
        let fx = sx - x0;
        let fy = sy - y0;
        let ix = x0 as i32;
        let iy = y0 as i32;

        let a = self.luminance_at(ix, iy);
        let b = self.luminance_at(ix + 1, iy);
        let c = self.luminance_at(ix, iy + 1);
        let d = self.luminance_at(ix + 1, iy + 1);

        let top = a + fx * (b - a);
        let bot = c + fx * (d - c);
        top + fy * (bot - top)
    }
}

/// One blur tap sum for channel `ch` at (x, y). `weights` has `2r + 1`
/// entries, ordered from `-r` to `r`.
pub fn blur_texel(view: &TexelView<'_>, x: u32, y: u32, ch: u32, weights: &[f32], direction: BlurDirection) -> f32 {
    let r = (weights.len() / 2) as i32;
    let (dx, dy) = direction.offset();
    let mut acc = 0.0f32;
    for k in -r..=r {
        let sx = x as i32 + k * dx;
        let sy = y as i32 + k * dy;
        acc += view.fetch(sx, sy, ch) * weights[(k + r) as usize];
    }
    acc
}

/// Sobel magnitude normalized to [0, 1]. A non-finite magnitude is background.
#[inline]
pub fn normalized_magnitude(gx: f32, gy: f32) -> f32 {
    let m = (gx * gx + gy * gy).sqrt() / MAX_SOBEL_MAGNITUDE;
    if !m.is_finite() {
        return 0.0;
    }
    m.min(1.0)
}

/// Neighbour offset along the gradient, quantized to 0, 45, 90 or 135 degrees.
///
/// Image y grows downwards, so a 45 degree gradient points to (+1, +1).
pub fn quantize_direction(gx: f32, gy: f32) -> (i32, i32) {
    if gx == 0.0 && gy == 0.0 {
        return (1, 0);
    }
    let mut angle = gy.atan2(gx).to_degrees();
    if angle < 0.0 {
        angle += 180.0;
    }
    if angle < 22.5 || angle >= 157.5 {
        (1, 0)
    } else if angle < 67.5 {
        (1, 1)
    } else if angle < 112.5 {
        (0, 1)
    } else {
        (-1, 1)
    }
}

/// Luminance samples on a 5x5 grid spaced `step` pixels apart.
///
/// Holds everything needed to recompute the Sobel gradient of the centre and
/// of its 8 neighbours, so NMS never reads a separate magnitude buffer.
pub struct LumaWindow {
    values: [f32; (WINDOW * WINDOW) as usize],
}

impl LumaWindow {
    pub fn gather(view: &TexelView<'_>, x: u32, y: u32, step_x: f32, step_y: f32) -> Self {
        let mut values = [0.0f32; (WINDOW * WINDOW) as usize];
        for j in 0..WINDOW {
            for i in 0..WINDOW {
                let px = x as f32 + (i - CENTER) as f32 * step_x;
                let py = y as f32 + (j - CENTER) as f32 * step_y;
                values[(j * WINDOW + i) as usize] = view.sample_luminance(px, py);
            }
        }
        Self { values }
    }

    #[inline]
    fn at(&self, i: i32, j: i32) -> f32 {
        self.values[(j * WINDOW + i) as usize]
    }

    /// Sobel (gx, gy) at window cell (i, j); valid for 1 <= i, j <= 3.
    pub fn gradient_at(&self, i: i32, j: i32) -> (f32, f32) {
        let tl = self.at(i - 1, j - 1);
        let t = self.at(i, j - 1);
        let tr = self.at(i + 1, j - 1);
        let l = self.at(i - 1, j);
        let r = self.at(i + 1, j);
        let bl = self.at(i - 1, j + 1);
        let b = self.at(i, j + 1);
        let br = self.at(i + 1, j + 1);

        let gx = (tr + 2.0 * r + br) - (tl + 2.0 * l + bl);
        let gy = (bl + 2.0 * b + br) - (tl + 2.0 * t + tr);
        (gx, gy)
    }

    pub fn magnitude_at(&self, i: i32, j: i32) -> f32 {
        let (gx, gy) = self.gradient_at(i, j);
        normalized_magnitude(gx, gy)
    }

    /// Centre magnitude after non-maximum suppression.
    pub fn suppressed_magnitude(&self) -> f32 {
        let (gx, gy) = self.gradient_at(CENTER, CENTER);
        let center = normalized_magnitude(gx, gy);
        let (ox, oy) = quantize_direction(gx, gy);
        let ahead = self.magnitude_at(CENTER + ox, CENTER + oy);
        let behind = self.magnitude_at(CENTER - ox, CENTER - oy);
        if center < ahead || center < behind {
            0.0
        } else {
            center
        }
    }
}

/// Strong, weak or background class of a suppressed magnitude.
pub fn classify(magnitude: f32, threshold: f32, low_threshold: Option<f32>) -> f32 {
    if magnitude >= threshold {
        STRONG_EDGE
    } else if low_threshold.is_some_and(|low| magnitude >= low) {
        WEAK_EDGE
    } else {
        0.0
    }
}

/// Writes an edge value (0 or 1) with polarity into a texel.
#[inline]
pub fn write_edge(out: &mut [f32], edge: f32, polarity: EdgePolarity) {
    let v = match polarity {
        EdgePolarity::Light => edge,
        EdgePolarity::Dark => 1.0 - edge,
    };
    let c = out.len();
    for o in out.iter_mut().take(c.min(3)) {
        *o = v;
    }
    if c >= 4 {
        out[3] = 1.0;
    }
}

/// Gradient program for the texel at (x, y).
pub fn gradient_texel(view: &TexelView<'_>, x: u32, y: u32, cfg: &GradientConfig, out: &mut [f32]) {
    let window = LumaWindow::gather(view, x, y, cfg.step_x, cfg.step_y);
    let magnitude = window.suppressed_magnitude();
    let class = classify(magnitude, cfg.threshold, cfg.low_threshold);
    if cfg.emits_classes() {
        out[0] = class;
    } else {
        write_edge(out, class, cfg.polarity);
    }
}

#[inline]
fn is_weak(class: f32) -> bool {
    (WEAK_CUTOFF..STRONG_CUTOFF).contains(&class)
}

/// One hysteresis pass for the texel at (x, y) of a class map.
pub fn weak_edge_texel(view: &TexelView<'_>, x: u32, y: u32, cfg: &WeakEdgeConfig, out: &mut [f32]) {
    let (x, y) = (x as i32, y as i32);
    let class = view.fetch(x, y, 0);
    let mut value = class;
    if is_weak(class) {
        'search: for dy in -1..=1 {
            for dx in -1..=1 {
                if (dx, dy) != (0, 0) && view.fetch(x + dx, y + dy, 0) >= STRONG_CUTOFF {
                    value = STRONG_EDGE;
                    break 'search;
                }
            }
        }
    }

    if cfg.resolve {
        let edge = if value >= STRONG_CUTOFF { 1.0 } else { 0.0 };
        write_edge(out, edge, cfg.polarity);
    } else {
        out[0] = value;
    }
}
