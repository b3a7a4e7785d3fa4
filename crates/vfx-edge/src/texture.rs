//! Texture descriptions and host-side pixel buffers.

use serde::{Deserialize, Serialize};

use crate::{EdgeError, EdgeResult};

/// Texel layout of a texture. All texels are stored as f32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Single channel.
    #[default]
    Luminance,
    /// Four channels, RGBA order.
    Rgba,
}

impl PixelFormat {
    /// Number of f32 channels per texel.
    pub fn channels(self) -> u32 {
        match self {
            Self::Luminance => 1,
            Self::Rgba => 4,
        }
    }
}

/// Size and layout of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl TextureDesc {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self { width, height, format }
    }

    /// Same dimensions, different format.
    pub fn with_format(self, format: PixelFormat) -> Self {
        Self { format, ..self }
    }

    pub fn channels(&self) -> u32 {
        self.format.channels()
    }

    /// Number of f32 values in the texture.
    pub fn len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * (self.channels() as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size_bytes(&self) -> u64 {
        self.len() as u64 * 4
    }

    /// Rejects textures that no stage can read.
    pub fn validate(&self) -> EdgeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EdgeError::UpstreamFailure(format!(
                "texture has empty dimensions {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Image stored in host memory, the unit of upload and download.
#[derive(Clone, PartialEq)]
pub struct HostImage {
    pub(crate) data: Vec<f32>,
    desc: TextureDesc,
}

impl HostImage {
    /// Create from f32 data laid out row-major, channels interleaved.
    pub fn from_f32(data: Vec<f32>, width: u32, height: u32, format: PixelFormat) -> EdgeResult<Self> {
        let desc = TextureDesc::new(width, height, format);
        if data.len() != desc.len() {
            return Err(EdgeError::BufferSizeMismatch {
                expected: desc.len(),
                actual: data.len(),
            });
        }
        Ok(Self { data, desc })
    }

    /// Create an image filled with zeros.
    pub fn new(desc: TextureDesc) -> Self {
        Self {
            data: vec![0.0; desc.len()],
            desc,
        }
    }

    /// Create an image by evaluating `f` for every texel channel.
    pub fn from_fn<F>(width: u32, height: u32, format: PixelFormat, f: F) -> Self
    where
        F: Fn(u32, u32, u32) -> f32,
    {
        let desc = TextureDesc::new(width, height, format);
        let c = desc.channels();
        let mut data = Vec::with_capacity(desc.len());
        for y in 0..height {
            for x in 0..width {
                for ch in 0..c {
                    data.push(f(x, y, ch));
                }
            }
        }
        Self { data, desc }
    }

    pub fn desc(&self) -> TextureDesc {
        self.desc
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }

    pub fn format(&self) -> PixelFormat {
        self.desc.format
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Channels of the texel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> &[f32] {
        let c = self.desc.channels() as usize;
        let base = ((y as usize) * (self.desc.width as usize) + x as usize) * c;
        &self.data[base..base + c]
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len() * 4
    }
}

impl std::fmt::Debug for HostImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostImage")
            .field("width", &self.desc.width)
            .field("height", &self.desc.height)
            .field("format", &self.desc.format)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}
