//! Execution backends for the edge pipeline.
//!
//! `Wgpu` runs the stages as WGSL compute shaders. `Reference` runs the same
//! per-texel kernels on the CPU with rayon; it exists to validate the shaders
//! and for deterministic tests. There is no automatic fallback between them.

mod detect;
mod limits;
mod primitives;
mod reference;

#[cfg(feature = "wgpu")]
mod context;
#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use detect::{BackendInfo, describe_backends, detect_backends};
pub use limits::GpuLimits;
pub use primitives::{StagePrimitives, TextureHandle};
pub use reference::{ReferencePrimitives, ReferenceTexture};

#[cfg(feature = "wgpu")]
pub use context::GpuContext;
#[cfg(feature = "wgpu")]
pub use wgpu_backend::{WgpuPrimitives, WgpuTexture};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::EdgePipeline;
use crate::stage::FilterStage;
use crate::texture::HostImage;
use crate::{EdgeError, EdgeResult};

/// Available execution backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// wgpu compute shaders (Vulkan/Metal/DX12).
    #[default]
    Wgpu,
    /// CPU reference kernels using rayon.
    Reference,
}

impl Backend {
    /// Check if this backend is available on current system.
    pub fn is_available(&self) -> bool {
        match self {
            #[cfg(feature = "wgpu")]
            Self::Wgpu => WgpuPrimitives::is_available(),
            #[cfg(not(feature = "wgpu"))]
            Self::Wgpu => false,
            Self::Reference => true,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Wgpu => "wgpu",
            Self::Reference => "reference",
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = EdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wgpu" | "gpu" => Ok(Self::Wgpu),
            "reference" | "ref" | "cpu" => Ok(Self::Reference),
            other => Err(EdgeError::BackendNotAvailable(other.to_string())),
        }
    }
}

/// Object-safe frame processor over one backend.
pub trait ProcessingBackend: Send {
    /// Backend name.
    fn name(&self) -> &'static str;

    /// Device limits.
    fn limits(&self) -> &GpuLimits;

    fn pipeline(&self) -> &EdgePipeline;

    fn pipeline_mut(&mut self) -> &mut EdgePipeline;

    /// Upload, run the pipeline, download.
    fn process_frame(&mut self, image: &HostImage) -> EdgeResult<HostImage>;

    /// Frames completed so far.
    fn frames_processed(&self) -> u64;
}

/// Owns a backend's primitives and the pipeline run on them.
pub struct PipelineRunner<P: StagePrimitives> {
    primitives: P,
    pipeline: EdgePipeline,
    frames: u64,
}

impl<P: StagePrimitives> PipelineRunner<P> {
    pub fn new(primitives: P, pipeline: EdgePipeline) -> Self {
        Self { primitives, pipeline, frames: 0 }
    }
}

impl<P: StagePrimitives> ProcessingBackend for PipelineRunner<P> {
    fn name(&self) -> &'static str {
        self.primitives.name()
    }

    fn limits(&self) -> &GpuLimits {
        self.primitives.limits()
    }

    fn pipeline(&self) -> &EdgePipeline {
        &self.pipeline
    }

    fn pipeline_mut(&mut self) -> &mut EdgePipeline {
        &mut self.pipeline
    }

    fn process_frame(&mut self, image: &HostImage) -> EdgeResult<HostImage> {
        debug!(
            frame = self.frames,
            width = image.width(),
            height = image.height(),
            backend = self.primitives.name(),
            "Processing frame"
        );
        let input = self.primitives.upload(image)?;
        let output = self.pipeline.process(&self.primitives, &input)?;
        drop(input);
        let result = self.primitives.download(&output)?;
        self.frames += 1;
        Ok(result)
    }

    fn frames_processed(&self) -> u64 {
        self.frames
    }
}

/// Create a frame processor on the requested backend.
pub fn create_backend(backend: Backend, pipeline: EdgePipeline) -> EdgeResult<Box<dyn ProcessingBackend>> {
    match backend {
        Backend::Reference => Ok(Box::new(PipelineRunner::new(ReferencePrimitives::new(), pipeline))),
        Backend::Wgpu => {
            #[cfg(feature = "wgpu")]
            {
                Ok(Box::new(PipelineRunner::new(WgpuPrimitives::new()?, pipeline)))
            }
            #[cfg(not(feature = "wgpu"))]
            {
                let _ = pipeline;
                Err(EdgeError::BackendNotAvailable(
                    "wgpu feature not enabled".to_string()
                ))
            }
        }
    }
}
