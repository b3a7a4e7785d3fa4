//! Stage primitives abstraction shared by all execution targets.

use crate::blur::BlurKernel;
use crate::kernels::{BlurDirection, GradientConfig, WeakEdgeConfig};
use crate::texture::{HostImage, PixelFormat, TextureDesc};
use crate::EdgeResult;
use super::GpuLimits;

/// Handle to a texture owned by a backend.
pub trait TextureHandle: Send + Sync {
    /// Size and layout.
    fn desc(&self) -> TextureDesc;

    /// Width.
    fn width(&self) -> u32 { self.desc().width }

    /// Height.
    fn height(&self) -> u32 { self.desc().height }

    /// Texel layout.
    fn format(&self) -> PixelFormat { self.desc().format }

    /// Size in bytes of device memory used.
    fn size_bytes(&self) -> u64 { self.desc().size_bytes() }
}

/// Programs every stage is built from.
///
/// `exec_*` calls read `src`, fully write `dst` and return only once `dst`
/// is ready to be read by the next program.
pub trait StagePrimitives: Send + Sync {
    /// Backend-specific texture type.
    type Texture: TextureHandle;

    /// Upload host pixels.
    fn upload(&self, image: &HostImage) -> EdgeResult<Self::Texture>;

    /// Download texture contents.
    fn download(&self, texture: &Self::Texture) -> EdgeResult<HostImage>;

    /// Allocate an uninitialized texture.
    fn allocate(&self, desc: TextureDesc) -> EdgeResult<Self::Texture>;

    /// Allocate a texture holding a copy of `src`.
    fn copy(&self, src: &Self::Texture) -> EdgeResult<Self::Texture>;

    /// One separable blur pass.
    fn exec_blur(&self, src: &Self::Texture, dst: &mut Self::Texture,
                 kernel: &BlurKernel, direction: BlurDirection) -> EdgeResult<()>;

    /// Gradient, non-maximum suppression and classification.
    fn exec_gradient(&self, src: &Self::Texture, dst: &mut Self::Texture,
                     config: &GradientConfig) -> EdgeResult<()>;

    /// One weak-edge propagation pass over a class map.
    fn exec_weak_edges(&self, src: &Self::Texture, dst: &mut Self::Texture,
                       config: &WeakEdgeConfig) -> EdgeResult<()>;

    /// Device limits.
    fn limits(&self) -> &GpuLimits;

    /// Backend name.
    fn name(&self) -> &'static str;
}
