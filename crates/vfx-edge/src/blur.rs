//! Separable Gaussian blur stage.

use tracing::{debug, trace};

use crate::backend::{StagePrimitives, TextureHandle};
use crate::kernels::BlurDirection;
use crate::params::validate_blur_size;
use crate::stage::FilterStage;
use crate::texture::TextureDesc;
use crate::EdgeResult;

/// Largest kernel radius in pixels. Wider sigmas are truncated here.
pub const MAX_BLUR_RADIUS: u32 = 32;

/// Normalized 1-D Gaussian weights.
#[derive(Debug, Clone, PartialEq)]
pub struct BlurKernel {
    weights: Vec<f32>,
    radius: u32,
}

impl BlurKernel {
    /// Kernel for a blur size, taken as sigma in pixels.
    ///
    /// Radius is `ceil(3 * sigma)` capped at [`MAX_BLUR_RADIUS`]; a blur size
    /// of 0, or one too small to form a finite kernel, gives the identity.
    pub fn gaussian(blur_size: f32) -> Self {
        let sigma = blur_size.max(0.0);
        if sigma == 0.0 {
            return Self::identity();
        }

        let radius = ((sigma * 3.0).ceil() as u32).clamp(1, MAX_BLUR_RADIUS);
        let r = radius as i32;
        let two_sigma2 = 2.0 * f64::from(sigma) * f64::from(sigma);

        let taps: Vec<f64> = (-r..=r)
            .map(|x| (-f64::from(x * x) / two_sigma2).exp())
            .collect();
        let sum: f64 = taps.iter().sum();
        if !sum.is_finite() || sum <= 0.0 {
            return Self::identity();
        }

        let weights: Vec<f32> = taps.iter().map(|w| (w / sum) as f32).collect();
        if weights.iter().any(|w| !w.is_finite()) {
            return Self::identity();
        }
        Self { weights, radius }
    }

    /// Single-tap kernel that leaves the image unchanged.
    pub fn identity() -> Self {
        Self { weights: vec![1.0], radius: 0 }
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn is_identity(&self) -> bool {
        self.radius == 0
    }
}

/// Gaussian blur applied as a horizontal then a vertical pass.
///
/// Taps are one texel apart; the image factors only affect gradient sampling.
#[derive(Debug, Clone)]
pub struct GaussianBlurStage {
    blur_size: f32,
    kernel: BlurKernel,
}

impl GaussianBlurStage {
    pub fn new(blur_size: f32) -> EdgeResult<Self> {
        validate_blur_size(blur_size)?;
        Ok(Self {
            blur_size,
            kernel: BlurKernel::gaussian(blur_size),
        })
    }

    pub fn blur_size(&self) -> f32 {
        self.blur_size
    }

    pub fn kernel(&self) -> &BlurKernel {
        &self.kernel
    }

    /// Changes the blur size; a rejected value leaves the stage untouched.
    pub fn set_blur_size(&mut self, blur_size: f32) -> EdgeResult<()> {
        validate_blur_size(blur_size)?;
        self.blur_size = blur_size;
        self.kernel = BlurKernel::gaussian(blur_size);
        Ok(())
    }
}

impl Default for GaussianBlurStage {
    fn default() -> Self {
        Self {
            blur_size: 1.0,
            kernel: BlurKernel::gaussian(1.0),
        }
    }
}

impl FilterStage for GaussianBlurStage {
    fn name(&self) -> &'static str {
        "gaussian_blur"
    }

    fn output_desc(&self, input: TextureDesc) -> TextureDesc {
        input
    }

    fn process<P: StagePrimitives>(&self, primitives: &P, input: &P::Texture) -> EdgeResult<P::Texture> {
        let desc = input.desc();
        desc.validate()?;
        trace!(width = desc.width, height = desc.height, blur_size = self.blur_size, "gaussian_blur::process");

        if self.kernel.is_identity() {
            debug!("blur size 0, copying input");
            return primitives.copy(input);
        }

        debug!(radius = self.kernel.radius, "Applying separable blur");

        // The horizontal result lives only until the vertical pass has read it.
        let mut temp = primitives.allocate(desc)?;
        primitives.exec_blur(input, &mut temp, &self.kernel, BlurDirection::Horizontal)?;

        let mut out = primitives.allocate(desc)?;
        primitives.exec_blur(&temp, &mut out, &self.kernel, BlurDirection::Vertical)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kernel_normalized() {
        for size in [0.3, 1.0, 2.5, 7.0] {
            let k = BlurKernel::gaussian(size);
            let sum: f32 = k.weights().iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-5);
            assert_eq!(k.weights().len(), (k.radius() * 2 + 1) as usize);
        }
    }

    #[test]
    fn test_kernel_radius() {
        assert_eq!(BlurKernel::gaussian(1.0).radius(), 3);
        assert_eq!(BlurKernel::gaussian(0.5).radius(), 2);
        assert_eq!(BlurKernel::gaussian(100.0).radius(), MAX_BLUR_RADIUS);
    }

    #[test]
    fn test_zero_is_identity() {
        let k = BlurKernel::gaussian(0.0);
        assert!(k.is_identity());
        assert_eq!(k.weights(), &[1.0]);
    }

    #[test]
    fn test_tiny_blur_stays_finite() {
        for size in [1e-30f32, 1e-38, f32::MIN_POSITIVE, 1e-45] {
            let k = BlurKernel::gaussian(size);
            assert!(k.weights().iter().all(|w| w.is_finite()), "blur {size}: {:?}", k.weights());
            let sum: f32 = k.weights().iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
            assert_eq!(k.weights()[k.radius() as usize], 1.0);
        }
    }

    #[test]
    fn test_kernel_symmetric_and_peaked() {
        let k = BlurKernel::gaussian(1.5);
        let w = k.weights();
        let r = k.radius() as usize;
        for i in 0..r {
            assert_relative_eq!(w[i], w[w.len() - 1 - i]);
            assert!(w[i] < w[i + 1]);
        }
    }

    #[test]
    fn test_rejects_negative_blur() {
        assert!(GaussianBlurStage::new(-0.5).is_err());
        let mut stage = GaussianBlurStage::new(2.0).unwrap();
        assert!(stage.set_blur_size(-1.0).is_err());
        assert_eq!(stage.blur_size(), 2.0);
    }
}
