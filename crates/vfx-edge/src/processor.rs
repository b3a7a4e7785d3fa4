//! Frame-level entry point.
//!
//! ```ignore
//! use vfx_edge::{Backend, EdgeDetector};
//!
//! let mut detector = EdgeDetector::new(Backend::Reference)?;
//! detector.set_threshold(0.3)?;
//! let edges = detector.detect(&frame)?;
//! ```

use tracing::info;

use crate::backend::{Backend, GpuLimits, ProcessingBackend, create_backend};
use crate::config::EdgeConfig;
use crate::params::EdgeParams;
use crate::pipeline::EdgePipeline;
use crate::texture::HostImage;
use crate::EdgeResult;

/// Runs the edge pipeline on one backend, one frame at a time.
pub struct EdgeDetector {
    backend: Box<dyn ProcessingBackend>,
}

impl EdgeDetector {
    /// Create with specified backend and default parameters.
    pub fn new(backend: Backend) -> EdgeResult<Self> {
        Self::with_params(backend, EdgeParams::default())
    }

    /// Create with specified backend and parameters.
    pub fn with_params(backend: Backend, params: EdgeParams) -> EdgeResult<Self> {
        let pipeline = EdgePipeline::with_params(params)?;
        let backend = create_backend(backend, pipeline)?;
        info!(backend = backend.name(), "Edge detector ready");
        Ok(Self { backend })
    }

    /// Create from a loaded configuration.
    pub fn from_config(config: &EdgeConfig) -> EdgeResult<Self> {
        Self::with_params(config.backend, config.params.clone())
    }

    /// Create on the CPU reference backend.
    pub fn reference() -> EdgeResult<Self> {
        Self::new(Backend::Reference)
    }

    /// Detect edges in one frame. The output has the input's dimensions and
    /// the configured output format.
    pub fn detect(&mut self, image: &HostImage) -> EdgeResult<HostImage> {
        self.backend.process_frame(image)
    }

    /// Replace all parameters; the previous set stays active on error.
    pub fn set_parameters(&mut self, params: EdgeParams) -> EdgeResult<()> {
        self.backend.pipeline_mut().set_parameters(params)
    }

    pub fn set_blur_size(&mut self, blur_size: f32) -> EdgeResult<()> {
        self.backend.pipeline_mut().set_blur_size(blur_size)
    }

    pub fn set_threshold(&mut self, threshold: f32) -> EdgeResult<()> {
        self.backend.pipeline_mut().set_threshold(threshold)
    }

    pub fn params(&self) -> &EdgeParams {
        self.backend.pipeline().params()
    }

    pub fn pipeline(&self) -> &EdgePipeline {
        self.backend.pipeline()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn limits(&self) -> &GpuLimits {
        self.backend.limits()
    }

    /// Frames completed since creation.
    pub fn frames_processed(&self) -> u64 {
        self.backend.frames_processed()
    }
}

impl std::fmt::Debug for EdgeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeDetector")
            .field("backend", &self.backend.name())
            .field("params", self.params())
            .field("frames", &self.frames_processed())
            .finish()
    }
}
