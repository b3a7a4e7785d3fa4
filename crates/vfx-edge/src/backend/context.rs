//! GPU context and device management

use std::sync::Arc;
use tracing::{debug, info};
use wgpu::{Adapter, Device, DeviceDescriptor, Features, Instance, Queue};

use super::GpuLimits;
use crate::{EdgeError, EdgeResult};

/// Environment variable overriding the detected device memory, in MiB.
pub const GPU_MEMORY_ENV: &str = "VFX_EDGE_GPU_MEMORY_MB";

/// GPU context holding device and queue
pub struct GpuContext {
    pub(crate) device: Arc<Device>,
    pub(crate) queue: Arc<Queue>,
    adapter_info: wgpu::AdapterInfo,
    limits: GpuLimits,
}

impl GpuContext {
    /// Create new GPU context with default settings
    pub fn new() -> EdgeResult<Self> {
        Self::with_power_preference(wgpu::PowerPreference::HighPerformance)
    }

    /// Create context with power preference
    pub fn with_power_preference(power: wgpu::PowerPreference) -> EdgeResult<Self> {
        pollster::block_on(Self::new_async(power))
    }

    /// Check if any adapter can be found.
    pub fn probe() -> bool {
        pollster::block_on(async {
            request_adapter(&new_instance(), wgpu::PowerPreference::HighPerformance)
                .await
                .is_some()
        })
    }

    async fn new_async(power: wgpu::PowerPreference) -> EdgeResult<Self> {
        let instance = new_instance();
        let adapter = request_adapter(&instance, power)
            .await
            .ok_or(EdgeError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        let adapter_limits = adapter.limits();

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("vfx-edge"),
                    required_features: Features::empty(),
                    required_limits: adapter_limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| EdgeError::DeviceCreation(e.to_string()))?;

        let limits = GpuLimits {
            max_texture_dim: adapter_limits.max_texture_dimension_2d,
            max_buffer_bytes: adapter_limits
                .max_buffer_size
                .min(adapter_limits.max_storage_buffer_binding_size as u64),
            available_memory: estimate_vram(&adapter_info, adapter_limits.max_buffer_size),
        };

        info!(
            device = %adapter_info.name,
            backend = ?adapter_info.backend,
            memory_mb = limits.available_memory >> 20,
            "GPU context created"
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
            limits,
        })
    }

    /// Get device name
    pub fn device_name(&self) -> &str {
        &self.adapter_info.name
    }

    /// Get backend type (Vulkan, DX12, Metal, etc.)
    pub fn backend(&self) -> wgpu::Backend {
        self.adapter_info.backend
    }

    pub fn limits(&self) -> &GpuLimits {
        &self.limits
    }

    /// Compile a WGSL compute program with entry point `main`.
    pub(crate) fn create_pipeline(&self, source: &str, label: &str) -> wgpu::ComputePipeline {
        debug!(label, "Compiling compute pipeline");
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: None, // Auto layout
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        })
    }

    /// Submit work and wait for completion
    pub(crate) fn submit_and_wait(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
        self.device.poll(wgpu::Maintain::Wait);
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("device", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .finish()
    }
}

fn new_instance() -> Instance {
    Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

async fn request_adapter(instance: &Instance, power: wgpu::PowerPreference) -> Option<Adapter> {
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: power,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
}

fn estimate_vram(info: &wgpu::AdapterInfo, max_buffer_bytes: u64) -> u64 {
    if let Some(bytes) = memory_override() {
        return bytes;
    }

    let from_buffer = max_buffer_bytes.saturating_mul(2);

    let estimated = match info.device_type {
        wgpu::DeviceType::DiscreteGpu => from_buffer.clamp(2u64 << 30, 24u64 << 30),
        wgpu::DeviceType::IntegratedGpu => from_buffer.clamp(512u64 << 20, 4u64 << 30),
        wgpu::DeviceType::VirtualGpu => from_buffer.clamp(1u64 << 30, 8u64 << 30),
        _ => from_buffer.clamp(256u64 << 20, 2u64 << 30),
    };

    // 80% safe margin
    estimated.saturating_mul(80) / 100
}

fn memory_override() -> Option<u64> {
    std::env::var(GPU_MEMORY_ENV)
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|mb| mb.saturating_mul(1024 * 1024))
}
