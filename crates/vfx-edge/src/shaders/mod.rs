//! WGSL compute programs used by the wgpu backend.
//!
//! Each program mirrors its counterpart in `kernels`. All of them bind the
//! source texture at 0, the destination at 1 and their parameters at 2, and
//! run one invocation per texel in 16x16 workgroups.

/// Workgroup edge length, shared with the dispatch code.
pub const WORKGROUP_SIZE: u32 = 16;

/// Helpers prepended to every program.
const COMMON: &str = r#"
const LUMA = vec3<f32>(0.2125, 0.7154, 0.0721);
const MAX_SOBEL_MAGNITUDE: f32 = 4.472136;
const STRONG_CUTOFF: f32 = 0.75;
const WEAK_CUTOFF: f32 = 0.25;

// Writes an edge value with polarity: equal RGB, opaque alpha.
fn write_edge(base: u32, c_out: u32, edge: f32, polarity: u32) {
    var v = edge;
    if polarity == 1u { v = 1.0 - edge; }
    for (var ch = 0u; ch < min(c_out, 3u); ch = ch + 1u) {
        dst[base + ch] = v;
    }
    if c_out >= 4u { dst[base + 3u] = 1.0; }
}
"#;

/// One separable Gaussian pass along `params.dir`.
const BLUR: &str = r#"
struct BlurParams {
    dims: vec4<u32>,  // w, h, c, radius
    dir: vec4<i32>,   // dx, dy, 0, 0
}

@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> dst: array<f32>;
@group(0) @binding(2) var<uniform> params: BlurParams;
@group(0) @binding(3) var<storage, read> weights: array<f32>;

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let w = params.dims.x;
    let h = params.dims.y;
    let c = params.dims.z;
    let r = i32(params.dims.w);
    if id.x >= w || id.y >= h { return; }

    let base = (id.y * w + id.x) * c;
    for (var ch = 0u; ch < c; ch = ch + 1u) {
        var acc = 0.0;
        for (var k = -r; k <= r; k = k + 1) {
            let sx = clamp(i32(id.x) + k * params.dir.x, 0, i32(w) - 1);
            let sy = clamp(i32(id.y) + k * params.dir.y, 0, i32(h) - 1);
            acc = acc + src[(u32(sy) * w + u32(sx)) * c + ch] * weights[u32(k + r)];
        }
        dst[base + ch] = acc;
    }
}
"#;

/// Sobel gradient, non-maximum suppression and classification.
const GRADIENT_EDGE: &str = r#"
struct GradientParams {
    src_dims: vec4<u32>,  // w, h, c_in, 0
    dst_dims: vec4<u32>,  // c_out, emit_classes, polarity, 0
    sampling: vec4<f32>,  // step_x, step_y, threshold, low_threshold
}

@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> dst: array<f32>;
@group(0) @binding(2) var<uniform> params: GradientParams;

fn luminance_at(x: i32, y: i32) -> f32 {
    let w = i32(params.src_dims.x);
    let h = i32(params.src_dims.y);
    let c = params.src_dims.z;
    let cx = u32(clamp(x, 0, w - 1));
    let cy = u32(clamp(y, 0, h - 1));
    let base = (cy * u32(w) + cx) * c;
    if c < 3u { return src[base]; }
    return dot(vec3<f32>(src[base], src[base + 1u], src[base + 2u]), LUMA);
}

fn sample_luminance(px: f32, py: f32) -> f32 {
    let sx = clamp(px, 0.0, f32(params.src_dims.x - 1u));
    let sy = clamp(py, 0.0, f32(params.src_dims.y - 1u));
    let x0 = floor(sx);
    let y0 = floor(sy);
    let fx = sx - x0;
    let fy = sy - y0;
    let ix = i32(x0);
    let iy = i32(y0);

    let a = luminance_at(ix, iy);
    let b = luminance_at(ix + 1, iy);
    let c = luminance_at(ix, iy + 1);
    let d = luminance_at(ix + 1, iy + 1);

    let top = a + fx * (b - a);
    let bot = c + fx * (d - c);
    return top + fy * (bot - top);
}

var<private> win: array<f32, 25>;

fn at(i: i32, j: i32) -> f32 {
    return win[j * 5 + i];
}

fn gradient_at(i: i32, j: i32) -> vec2<f32> {
    let tl = at(i - 1, j - 1);
    let t = at(i, j - 1);
    let tr = at(i + 1, j - 1);
    let l = at(i - 1, j);
    let r = at(i + 1, j);
    let bl = at(i - 1, j + 1);
    let b = at(i, j + 1);
    let br = at(i + 1, j + 1);

    let gx = (tr + 2.0 * r + br) - (tl + 2.0 * l + bl);
    let gy = (bl + 2.0 * b + br) - (tl + 2.0 * t + tr);
    return vec2<f32>(gx, gy);
}

fn normalized_magnitude(g: vec2<f32>) -> f32 {
    let m = sqrt(dot(g, g)) / MAX_SOBEL_MAGNITUDE;
    // All exponent bits set: NaN or infinity.
    if ((bitcast<u32>(m) & 0x7f800000u) == 0x7f800000u) {
        return 0.0;
    }
    return min(m, 1.0);
}

fn quantize_direction(g: vec2<f32>) -> vec2<i32> {
    if g.x == 0.0 && g.y == 0.0 { return vec2<i32>(1, 0); }
    var angle = degrees(atan2(g.y, g.x));
    if angle < 0.0 { angle = angle + 180.0; }
    if angle < 22.5 || angle >= 157.5 { return vec2<i32>(1, 0); }
    if angle < 67.5 { return vec2<i32>(1, 1); }
    if angle < 112.5 { return vec2<i32>(0, 1); }
    return vec2<i32>(-1, 1);
}

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let w = params.src_dims.x;
    let h = params.src_dims.y;
    if id.x >= w || id.y >= h { return; }

    let spacing = params.sampling.xy;
    for (var j = 0; j < 5; j = j + 1) {
        for (var i = 0; i < 5; i = i + 1) {
            let px = f32(id.x) + f32(i - 2) * spacing.x;
            let py = f32(id.y) + f32(j - 2) * spacing.y;
            win[j * 5 + i] = sample_luminance(px, py);
        }
    }

    let g = gradient_at(2, 2);
    let center = normalized_magnitude(g);
    let o = quantize_direction(g);
    let ahead = normalized_magnitude(gradient_at(2 + o.x, 2 + o.y));
    let behind = normalized_magnitude(gradient_at(2 - o.x, 2 - o.y));
    var magnitude = center;
    if center < ahead || center < behind { magnitude = 0.0; }

    let emit_classes = params.dst_dims.y == 1u;
    var cls = 0.0;
    if magnitude >= params.sampling.z {
        cls = 1.0;
    } else if emit_classes && magnitude >= params.sampling.w {
        cls = 0.5;
    }

    let c_out = params.dst_dims.x;
    let base = (id.y * w + id.x) * c_out;
    if emit_classes {
        dst[base] = cls;
    } else {
        write_edge(base, c_out, cls, params.dst_dims.z);
    }
}
"#;

/// One bounded hysteresis pass over a class map.
const WEAK_EDGE: &str = r#"
struct WeakParams {
    dims: vec4<u32>,   // w, h, c_out, resolve
    style: vec4<u32>,  // polarity, 0, 0, 0
}

@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> dst: array<f32>;
@group(0) @binding(2) var<uniform> params: WeakParams;

fn class_at(x: i32, y: i32) -> f32 {
    let w = i32(params.dims.x);
    let h = i32(params.dims.y);
    let cx = clamp(x, 0, w - 1);
    let cy = clamp(y, 0, h - 1);
    return src[cy * w + cx];
}

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let w = params.dims.x;
    let h = params.dims.y;
    if id.x >= w || id.y >= h { return; }

    let x = i32(id.x);
    let y = i32(id.y);
    let cls = class_at(x, y);
    var value = cls;
    if cls >= WEAK_CUTOFF && cls < STRONG_CUTOFF {
        for (var dy = -1; dy <= 1; dy = dy + 1) {
            for (var dx = -1; dx <= 1; dx = dx + 1) {
                if (dx != 0 || dy != 0) && class_at(x + dx, y + dy) >= STRONG_CUTOFF {
                    value = 1.0;
                }
            }
        }
    }

    let c_out = params.dims.z;
    let base = (id.y * w + id.x) * c_out;
    if params.dims.w == 1u {
        var edge = 0.0;
        if value >= STRONG_CUTOFF { edge = 1.0; }
        write_edge(base, c_out, edge, params.style.x);
    } else {
        dst[base] = value;
    }
}
"#;

fn program(body: &str) -> String {
    format!("{COMMON}\n{body}")
}

pub fn blur() -> String {
    program(BLUR)
}

pub fn gradient_edge() -> String {
    program(GRADIENT_EDGE)
}

pub fn weak_edge() -> String {
    program(WEAK_EDGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_programs_share_helpers() {
        for src in [blur(), gradient_edge(), weak_edge()] {
            assert!(src.contains("fn write_edge"));
            assert!(src.contains("fn main"));
            assert!(src.contains("@workgroup_size(16, 16)"));
        }
    }

    #[test]
    fn test_constants_match_kernels() {
        use crate::kernels::MAX_SOBEL_MAGNITUDE;
        assert!(gradient_edge().contains(&format!("{MAX_SOBEL_MAGNITUDE}")));
    }
}
