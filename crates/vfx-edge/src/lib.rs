//! GPU edge detection for VFX and video pipelines.
//!
//! Computes a Canny-style edge map in two fixed stages: a separable Gaussian
//! blur that conditions the frame, followed by a combined gradient stage that
//! estimates Sobel gradients, thins them with direction-aware non-maximum
//! suppression and classifies every texel against a threshold. An optional
//! bounded hysteresis stage can follow the gradient stage.
//!
//! # Architecture
//!
//! ```text
//! EdgeDetector
//!     └── EdgePipeline (FilterStage)
//!             ├── GaussianBlurStage   (horizontal + vertical pass)
//!             ├── GradientEdgeStage   (Sobel + NMS + threshold)
//!             └── WeakEdgeStage       (optional, bounded hysteresis)
//!                     └── StagePrimitives
//!                             ├── WgpuPrimitives      (WGSL compute shaders)
//!                             └── ReferencePrimitives (same kernels, rayon)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vfx_edge::{Backend, EdgeDetector, EdgeParams, HostImage, PixelFormat};
//!
//! let mut detector = EdgeDetector::new(Backend::Wgpu)?;
//! detector.set_parameters(EdgeParams { threshold: 0.3, ..Default::default() })?;
//! let frame = HostImage::from_f32(pixels, 1920, 1080, PixelFormat::Rgba)?;
//! let edges = detector.detect(&frame)?;
//! ```

pub mod backend;
pub mod blur;
pub mod config;
pub mod gradient;
pub mod hysteresis;
pub mod kernels;
pub mod params;
pub mod pipeline;
pub mod processor;
pub mod stage;
pub mod texture;
#[cfg(feature = "wgpu")]
mod shaders;

pub use backend::{
    Backend, BackendInfo, GpuLimits, ReferencePrimitives, StagePrimitives, TextureHandle,
    describe_backends, detect_backends,
};
#[cfg(feature = "wgpu")]
pub use backend::WgpuPrimitives;
pub use blur::{BlurKernel, GaussianBlurStage};
pub use config::EdgeConfig;
pub use gradient::GradientEdgeStage;
pub use hysteresis::WeakEdgeStage;
pub use params::{EdgeParams, EdgePolarity, Hysteresis, MAX_HYSTERESIS_PASSES};
pub use pipeline::EdgePipeline;
pub use processor::EdgeDetector;
pub use stage::FilterStage;
pub use texture::{HostImage, PixelFormat, TextureDesc};

use thiserror::Error;

/// Edge detection errors
#[derive(Error, Debug)]
pub enum EdgeError {
    /// Out-of-range blur size or threshold, or a non-positive image factor.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An intermediate or output texture could not be allocated.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The input texture is missing, empty or malformed.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Failed to create device: {0}")]
    DeviceCreation(String),

    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("GPU operation failed: {0}")]
    OperationFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type EdgeResult<T> = Result<T, EdgeError>;
