//! CLI command implementations

pub mod backends;
pub mod detect;

use anyhow::{Context, Result, bail};
use std::path::Path;
use vfx_edge::{HostImage, PixelFormat};

/// Load image from path as RGBA f32 in [0, 1].
pub fn load_image(path: &Path) -> Result<HostImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to load: {}", path.display()))?
        .to_rgba32f();
    let (width, height) = img.dimensions();
    HostImage::from_f32(img.into_raw(), width, height, PixelFormat::Rgba)
        .with_context(|| format!("Invalid image: {}", path.display()))
}

/// Save an edge map as 8-bit grayscale or RGBA.
pub fn save_image(path: &Path, image: &HostImage) -> Result<()> {
    let bytes: Vec<u8> = image.data().iter().map(|&v| to_u8(v)).collect();
    let (w, h) = (image.width(), image.height());

    let result = match image.format() {
        PixelFormat::Luminance => match image::GrayImage::from_raw(w, h, bytes) {
            Some(buf) => buf.save(path),
            None => bail!("Edge map buffer does not match {}x{}", w, h),
        },
        PixelFormat::Rgba => match image::RgbaImage::from_raw(w, h, bytes) {
            Some(buf) => buf.save(path),
            None => bail!("Edge map buffer does not match {}x{}", w, h),
        },
    };
    result.with_context(|| format!("Failed to save: {}", path.display()))
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Format file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
