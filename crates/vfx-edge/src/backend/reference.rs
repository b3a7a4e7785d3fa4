//! Reference backend: the per-texel kernels dispatched with rayon.

use rayon::prelude::*;
use tracing::trace;

use super::GpuLimits;
use super::primitives::{StagePrimitives, TextureHandle};
use crate::blur::BlurKernel;
use crate::kernels::{self, BlurDirection, GradientConfig, TexelView, WeakEdgeConfig};
use crate::texture::{HostImage, TextureDesc};
use crate::{EdgeError, EdgeResult};

/// Texture held in host memory.
#[derive(Debug, Clone)]
pub struct ReferenceTexture {
    image: HostImage,
}

impl ReferenceTexture {
    fn view(&self) -> TexelView<'_> {
        TexelView::new(self.image.data(), self.image.desc())
    }
}

impl TextureHandle for ReferenceTexture {
    fn desc(&self) -> TextureDesc {
        self.image.desc()
    }
}

/// CPU execution of the stage programs.
pub struct ReferencePrimitives {
    limits: GpuLimits,
}

impl ReferencePrimitives {
    pub fn new() -> Self {
        // System RAM (fallback to 4GB if detection fails)
        let available = sys_info::mem_info()
            .map(|m| m.avail * 1024)
            .unwrap_or(4 * 1024 * 1024 * 1024);

        Self {
            limits: GpuLimits {
                max_texture_dim: u32::MAX,
                max_buffer_bytes: u64::MAX,
                available_memory: available,
            },
        }
    }

    /// Use explicit limits, e.g. to emulate a small device.
    pub fn with_limits(limits: GpuLimits) -> Self {
        Self { limits }
    }
}

impl Default for ReferencePrimitives {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `kernel(x, y, texel)` for every texel of `dst`, rows in parallel.
fn dispatch_2d<F>(dst: &mut HostImage, kernel: F)
where
    F: Fn(u32, u32, &mut [f32]) + Sync,
{
    let desc = dst.desc();
    let c = desc.channels() as usize;
    let row_len = desc.width as usize * c;

    dst.data_mut()
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, texel) in row.chunks_mut(c).enumerate() {
                kernel(x as u32, y as u32, texel);
            }
        });
}

fn check_same_size(src: &TextureDesc, dst: &TextureDesc) -> EdgeResult<()> {
    if (src.width, src.height) != (dst.width, dst.height) {
        return Err(EdgeError::OperationFailed(format!(
            "size mismatch: {}x{} -> {}x{}",
            src.width, src.height, dst.width, dst.height
        )));
    }
    Ok(())
}

impl StagePrimitives for ReferencePrimitives {
    type Texture = ReferenceTexture;

    fn upload(&self, image: &HostImage) -> EdgeResult<Self::Texture> {
        let desc = image.desc();
        desc.validate()?;
        self.limits.check_texture(&desc)?;
        Ok(ReferenceTexture { image: image.clone() })
    }

    fn download(&self, texture: &Self::Texture) -> EdgeResult<HostImage> {
        Ok(texture.image.clone())
    }

    fn allocate(&self, desc: TextureDesc) -> EdgeResult<Self::Texture> {
        desc.validate()?;
        self.limits.check_texture(&desc)?;
        Ok(ReferenceTexture { image: HostImage::new(desc) })
    }

    fn copy(&self, src: &Self::Texture) -> EdgeResult<Self::Texture> {
        self.limits.check_texture(&src.desc())?;
        Ok(src.clone())
    }

    fn exec_blur(&self, src: &Self::Texture, dst: &mut Self::Texture,
                 kernel: &BlurKernel, direction: BlurDirection) -> EdgeResult<()> {
        check_same_size(&src.desc(), &dst.desc())?;
        trace!(?direction, radius = kernel.radius(), "reference blur");

        let view = src.view();
        let weights = kernel.weights();
        dispatch_2d(&mut dst.image, |x, y, texel| {
            for (ch, out) in texel.iter_mut().enumerate() {
                *out = kernels::blur_texel(&view, x, y, ch as u32, weights, direction);
            }
        });
        Ok(())
    }

    fn exec_gradient(&self, src: &Self::Texture, dst: &mut Self::Texture,
                     config: &GradientConfig) -> EdgeResult<()> {
        check_same_size(&src.desc(), &dst.desc())?;
        trace!(?config, "reference gradient");

        let view = src.view();
        dispatch_2d(&mut dst.image, |x, y, texel| {
            kernels::gradient_texel(&view, x, y, config, texel);
        });
        Ok(())
    }

    fn exec_weak_edges(&self, src: &Self::Texture, dst: &mut Self::Texture,
                       config: &WeakEdgeConfig) -> EdgeResult<()> {
        check_same_size(&src.desc(), &dst.desc())?;
        trace!(resolve = config.resolve, "reference weak edges");

        let view = src.view();
        dispatch_2d(&mut dst.image, |x, y, texel| {
            kernels::weak_edge_texel(&view, x, y, config, texel);
        });
        Ok(())
    }

    fn limits(&self) -> &GpuLimits { &self.limits }
    fn name(&self) -> &'static str { "reference" }
}
