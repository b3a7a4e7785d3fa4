//! wgpu backend implementation.
//!
//! Textures are f32 storage buffers; each stage program is a WGSL compute
//! shader dispatched once per texel.

use bytemuck::{Pod, Zeroable};
use tracing::trace;
use wgpu::util::DeviceExt;

use super::context::GpuContext;
use super::primitives::{StagePrimitives, TextureHandle};
use super::GpuLimits;
use crate::blur::BlurKernel;
use crate::kernels::{BlurDirection, GradientConfig, WeakEdgeConfig};
use crate::params::EdgePolarity;
use crate::shaders::{self, WORKGROUP_SIZE};
use crate::texture::{HostImage, TextureDesc};
use crate::{EdgeError, EdgeResult};

// =============================================================================
// Uniform Buffers
// =============================================================================

/// Blur pass uniform.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct BlurUniform {
    dims: [u32; 4], // w, h, c, radius
    dir: [i32; 4],  // dx, dy, 0, 0
}

/// Gradient program uniform.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct GradientUniform {
    src_dims: [u32; 4], // w, h, c_in, 0
    dst_dims: [u32; 4], // c_out, emit_classes, polarity, 0
    sampling: [f32; 4], // step_x, step_y, threshold, low_threshold
}

/// Weak-edge pass uniform.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct WeakUniform {
    dims: [u32; 4],  // w, h, c_out, resolve
    style: [u32; 4], // polarity, 0, 0, 0
}

fn polarity_code(polarity: EdgePolarity) -> u32 {
    match polarity {
        EdgePolarity::Light => 0,
        EdgePolarity::Dark => 1,
    }
}

// =============================================================================
// WgpuTexture Handle
// =============================================================================

/// GPU storage buffer holding one texture.
pub struct WgpuTexture {
    buffer: wgpu::Buffer,
    desc: TextureDesc,
}

impl TextureHandle for WgpuTexture {
    fn desc(&self) -> TextureDesc {
        self.desc
    }
}

impl std::fmt::Debug for WgpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuTexture").field("desc", &self.desc).finish()
    }
}

// =============================================================================
// Pipelines
// =============================================================================

struct Pipelines {
    blur: wgpu::ComputePipeline,
    gradient: wgpu::ComputePipeline,
    weak: wgpu::ComputePipeline,
}

// =============================================================================
// WgpuPrimitives
// =============================================================================

/// wgpu implementation of the stage programs.
pub struct WgpuPrimitives {
    ctx: GpuContext,
    pipelines: Pipelines,
}

impl WgpuPrimitives {
    /// Check if wgpu is available.
    pub fn is_available() -> bool {
        GpuContext::probe()
    }

    /// Create device and compile all programs.
    pub fn new() -> EdgeResult<Self> {
        Self::with_context(GpuContext::new()?)
    }

    pub fn with_context(ctx: GpuContext) -> EdgeResult<Self> {
        let pipelines = Pipelines {
            blur: ctx.create_pipeline(&shaders::blur(), "blur_pipeline"),
            gradient: ctx.create_pipeline(&shaders::gradient_edge(), "gradient_edge_pipeline"),
            weak: ctx.create_pipeline(&shaders::weak_edge(), "weak_edge_pipeline"),
        };
        Ok(Self { ctx, pipelines })
    }

    fn uniform<T: Pod>(&self, label: &str, value: &T) -> wgpu::Buffer {
        self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(value),
            usage: wgpu::BufferUsages::UNIFORM,
        })
    }

    /// Create a storage buffer, reporting device allocation failure as
    /// `ResourceExhausted`.
    fn create_storage(&self, desc: TextureDesc, contents: Option<&[f32]>) -> EdgeResult<wgpu::Buffer> {
        desc.validate()?;
        self.ctx.limits().check_texture(&desc)?;

        let usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST;
        let device = &self.ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = match contents {
            Some(data) => device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("texture_buffer"),
                contents: bytemuck::cast_slice(data),
                usage,
            }),
            None => device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("texture_buffer"),
                size: desc.size_bytes(),
                usage,
                mapped_at_creation: false,
            }),
        };
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(EdgeError::ResourceExhausted(format!(
                "{}x{} {:?} texture: {err}",
                desc.width, desc.height, desc.format
            )));
        }
        Ok(buffer)
    }

    /// Execute one 2-D compute dispatch over `desc` and wait.
    fn dispatch(&self, pipeline: &wgpu::ComputePipeline, entries: &[wgpu::BindGroupEntry<'_>], desc: TextureDesc) {
        let layout = pipeline.get_bind_group_layout(0);
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stage_bind_group"),
            layout: &layout,
            entries,
        });

        let mut encoder = self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("compute_encoder"),
        });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("compute_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                desc.width.div_ceil(WORKGROUP_SIZE),
                desc.height.div_ceil(WORKGROUP_SIZE),
                1,
            );
        }

        self.ctx.submit_and_wait(encoder);
    }
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

impl StagePrimitives for WgpuPrimitives {
    type Texture = WgpuTexture;

    fn upload(&self, image: &HostImage) -> EdgeResult<Self::Texture> {
        let desc = image.desc();
        let buffer = self.create_storage(desc, Some(image.data()))?;
        Ok(WgpuTexture { buffer, desc })
    }

    fn download(&self, texture: &Self::Texture) -> EdgeResult<HostImage> {
        let size = texture.size_bytes();

        // Create staging buffer
        let staging = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging_buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.ctx.device.create_command_encoder(&Default::default());
        encoder.copy_buffer_to_buffer(&texture.buffer, 0, &staging, 0, size);
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        // Map and read
        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| { let _ = tx.send(r); });
        self.ctx.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| EdgeError::OperationFailed("Map channel closed".into()))?
            .map_err(|e| EdgeError::OperationFailed(format!("Map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let result: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        let desc = texture.desc;
        HostImage::from_f32(result, desc.width, desc.height, desc.format)
    }

    fn allocate(&self, desc: TextureDesc) -> EdgeResult<Self::Texture> {
        let buffer = self.create_storage(desc, None)?;
        Ok(WgpuTexture { buffer, desc })
    }

    fn copy(&self, src: &Self::Texture) -> EdgeResult<Self::Texture> {
        let dst = self.allocate(src.desc)?;
        let mut encoder = self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("copy_encoder"),
        });
        encoder.copy_buffer_to_buffer(&src.buffer, 0, &dst.buffer, 0, src.size_bytes());
        self.ctx.submit_and_wait(encoder);
        Ok(dst)
    }

    fn exec_blur(&self, src: &Self::Texture, dst: &mut Self::Texture,
                 kernel: &BlurKernel, direction: BlurDirection) -> EdgeResult<()> {
        check_same_size(&src.desc, &dst.desc)?;
        let desc = src.desc;
        trace!(?direction, radius = kernel.radius(), "wgpu blur");

        let (dx, dy) = direction.offset();
        let params = self.uniform("blur_uniform", &BlurUniform {
            dims: [desc.width, desc.height, desc.channels(), kernel.radius()],
            dir: [dx, dy, 0, 0],
        });
        let weights = self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blur_weights"),
            contents: bytemuck::cast_slice(kernel.weights()),
            usage: wgpu::BufferUsages::STORAGE,
        });

        self.dispatch(&self.pipelines.blur, &[
            wgpu::BindGroupEntry { binding: 0, resource: src.buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: dst.buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 2, resource: params.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 3, resource: weights.as_entire_binding() },
        ], desc);
        Ok(())
    }

    fn exec_gradient(&self, src: &Self::Texture, dst: &mut Self::Texture,
                     config: &GradientConfig) -> EdgeResult<()> {
        check_same_size(&src.desc, &dst.desc)?;
        let desc = src.desc;
        trace!(?config, "wgpu gradient");

        let params = self.uniform("gradient_uniform", &GradientUniform {
            src_dims: [desc.width, desc.height, desc.channels(), 0],
            dst_dims: [
                dst.desc.channels(),
                u32::from(config.emits_classes()),
                polarity_code(config.polarity),
                0,
            ],
            sampling: [
                config.step_x,
                config.step_y,
                config.threshold,
                config.low_threshold.unwrap_or(config.threshold),
            ],
        });

        self.dispatch(&self.pipelines.gradient, &[
            wgpu::BindGroupEntry { binding: 0, resource: src.buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: dst.buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 2, resource: params.as_entire_binding() },
        ], desc);
        Ok(())
    }

    fn exec_weak_edges(&self, src: &Self::Texture, dst: &mut Self::Texture,
                       config: &WeakEdgeConfig) -> EdgeResult<()> {
        check_same_size(&src.desc, &dst.desc)?;
        let desc = dst.desc;
        trace!(resolve = config.resolve, "wgpu weak edges");

        let params = self.uniform("weak_uniform", &WeakUniform {
            dims: [desc.width, desc.height, desc.channels(), u32::from(config.resolve)],
            style: [polarity_code(config.polarity), 0, 0, 0],
        });

        self.dispatch(&self.pipelines.weak, &[
            wgpu::BindGroupEntry { binding: 0, resource: src.buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: dst.buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 2, resource: params.as_entire_binding() },
        ], desc);
        Ok(())
    }

    fn limits(&self) -> &GpuLimits { self.ctx.limits() }
    fn name(&self) -> &'static str { "wgpu" }
}
