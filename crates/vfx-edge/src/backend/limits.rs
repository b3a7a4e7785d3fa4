//! Device resource limits.

use crate::texture::TextureDesc;
use crate::{EdgeError, EdgeResult};

/// GPU resource limits.
#[derive(Debug, Clone)]
pub struct GpuLimits {
    /// Maximum texture dimension (width or height).
    pub max_texture_dim: u32,
    /// Maximum single buffer size in bytes.
    pub max_buffer_bytes: u64,
    /// Available device memory in bytes.
    pub available_memory: u64,
}

impl Default for GpuLimits {
    fn default() -> Self {
        Self {
            max_texture_dim: 16384,
            max_buffer_bytes: 256 * 1024 * 1024, // 256 MB
            available_memory: 2 * 1024 * 1024 * 1024, // 2 GB
        }
    }
}

impl GpuLimits {
    /// Check if a texture fits in available memory.
    pub fn fits_memory(&self, desc: &TextureDesc) -> bool {
        desc.size_bytes() <= self.available_memory / 2 // Leave headroom
    }

    /// Fails with `ResourceExhausted` if `desc` cannot be allocated.
    pub fn check_texture(&self, desc: &TextureDesc) -> EdgeResult<()> {
        if desc.width > self.max_texture_dim || desc.height > self.max_texture_dim {
            return Err(EdgeError::ResourceExhausted(format!(
                "{}x{} exceeds max texture dimension {}",
                desc.width, desc.height, self.max_texture_dim
            )));
        }
        if desc.size_bytes() > self.max_buffer_bytes {
            return Err(EdgeError::ResourceExhausted(format!(
                "{} bytes exceeds max buffer size {}",
                desc.size_bytes(),
                self.max_buffer_bytes
            )));
        }
        if !self.fits_memory(desc) {
            return Err(EdgeError::ResourceExhausted(format!(
                "{} bytes does not fit in {} bytes of device memory",
                desc.size_bytes(),
                self.available_memory
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::PixelFormat;

    #[test]
    fn test_small_texture_fits() {
        let limits = GpuLimits::default();
        assert!(limits.check_texture(&TextureDesc::new(1920, 1080, PixelFormat::Rgba)).is_ok());
    }

    #[test]
    fn test_oversized_dimension() {
        let limits = GpuLimits::default();
        let desc = TextureDesc::new(limits.max_texture_dim + 1, 1, PixelFormat::Luminance);
        assert!(matches!(limits.check_texture(&desc), Err(EdgeError::ResourceExhausted(_))));
    }

    #[test]
    fn test_memory_budget() {
        let limits = GpuLimits {
            max_texture_dim: 16384,
            max_buffer_bytes: u64::MAX,
            available_memory: 1024,
        };
        // 16x16 RGBA f32 = 4096 bytes > 512 byte budget
        let desc = TextureDesc::new(16, 16, PixelFormat::Rgba);
        assert!(matches!(limits.check_texture(&desc), Err(EdgeError::ResourceExhausted(_))));
    }
}
