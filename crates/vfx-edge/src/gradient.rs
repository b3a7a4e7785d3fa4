//! Gradient, non-maximum suppression and threshold stage.
//!
//! Per texel, in a single pass over a fixed 5x5 neighbourhood:
//!
//! 1. Sobel gradients at the centre and its 8 neighbours, sampled at
//!    `texture_dim / factor` pixel steps with clamp-to-edge reads.
//! 2. Magnitude normalized by the largest reachable Sobel response, direction
//!    quantized to 0, 45, 90 or 135 degrees.
//! 3. The centre survives only if it is >= both neighbours along the
//!    quantized direction. Neighbour magnitudes are recomputed on the spot
//!    rather than read from a previous pass.
//! 4. Survivors >= threshold become edges.

use tracing::{debug, trace};

use crate::backend::{StagePrimitives, TextureHandle};
use crate::kernels::GradientConfig;
use crate::params::{EdgePolarity, validate_factor, validate_threshold};
use crate::stage::FilterStage;
use crate::texture::{PixelFormat, TextureDesc};
use crate::{EdgeError, EdgeResult};

#[derive(Debug, Clone)]
pub struct GradientEdgeStage {
    image_width_factor: Option<f32>,
    image_height_factor: Option<f32>,
    threshold: f32,
    low_threshold: Option<f32>,
    polarity: EdgePolarity,
    output: PixelFormat,
}

impl Default for GradientEdgeStage {
    fn default() -> Self {
        Self {
            image_width_factor: None,
            image_height_factor: None,
            threshold: 0.5,
            low_threshold: None,
            polarity: EdgePolarity::Light,
            output: PixelFormat::Luminance,
        }
    }
}

impl GradientEdgeStage {
    pub fn new(threshold: f32) -> EdgeResult<Self> {
        validate_threshold("threshold", threshold)?;
        Ok(Self {
            threshold,
            ..Default::default()
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) -> EdgeResult<()> {
        validate_threshold("threshold", threshold)?;
        if self.low_threshold.is_some_and(|low| low > threshold) {
            return Err(EdgeError::InvalidParameter(format!(
                "threshold {threshold} is below the weak-edge threshold"
            )));
        }
        self.threshold = threshold;
        Ok(())
    }

    /// Binds explicit sampling factors; `None` tracks the input size.
    pub fn set_image_factors(&mut self, width: Option<f32>, height: Option<f32>) -> EdgeResult<()> {
        if let Some(w) = width {
            validate_factor("image_width_factor", w)?;
        }
        if let Some(h) = height {
            validate_factor("image_height_factor", h)?;
        }
        self.image_width_factor = width;
        self.image_height_factor = height;
        Ok(())
    }

    pub fn image_factors(&self) -> (Option<f32>, Option<f32>) {
        (self.image_width_factor, self.image_height_factor)
    }

    /// Enables the strong/weak class map consumed by the weak-edge stage.
    pub fn set_low_threshold(&mut self, low_threshold: Option<f32>) -> EdgeResult<()> {
        if let Some(low) = low_threshold {
            validate_threshold("low_threshold", low)?;
            if low > self.threshold {
                return Err(EdgeError::InvalidParameter(format!(
                    "low_threshold {low} exceeds threshold {}",
                    self.threshold
                )));
            }
        }
        self.low_threshold = low_threshold;
        Ok(())
    }

    pub fn set_output(&mut self, polarity: EdgePolarity, output: PixelFormat) {
        self.polarity = polarity;
        self.output = output;
    }

    /// Program settings for an input of the given size.
    pub fn config_for(&self, desc: TextureDesc) -> GradientConfig {
        let fw = self.image_width_factor.unwrap_or(desc.width as f32);
        let fh = self.image_height_factor.unwrap_or(desc.height as f32);
        GradientConfig {
            step_x: desc.width as f32 / fw,
            step_y: desc.height as f32 / fh,
            threshold: self.threshold,
            low_threshold: self.low_threshold,
            polarity: self.polarity,
            output: self.output,
        }
    }
}

impl FilterStage for GradientEdgeStage {
    fn name(&self) -> &'static str {
        "gradient_edge"
    }

    fn output_desc(&self, input: TextureDesc) -> TextureDesc {
        input.with_format(self.config_for(input).output_format())
    }

    fn process<P: StagePrimitives>(&self, primitives: &P, input: &P::Texture) -> EdgeResult<P::Texture> {
        let desc = input.desc();
        desc.validate()?;
        let config = self.config_for(desc);
        trace!(
            width = desc.width,
            height = desc.height,
            step_x = config.step_x,
            step_y = config.step_y,
            threshold = config.threshold,
            "gradient_edge::process"
        );
        debug!(classes = config.emits_classes(), "Computing gradient edges");

        let mut out = primitives.allocate(desc.with_format(config.output_format()))?;
        primitives.exec_gradient(input, &mut out, &config)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factors_track_input_by_default() {
        let stage = GradientEdgeStage::default();
        let cfg = stage.config_for(TextureDesc::new(640, 360, PixelFormat::Rgba));
        assert_eq!((cfg.step_x, cfg.step_y), (1.0, 1.0));
    }

    #[test]
    fn test_explicit_factors_scale_step() {
        let mut stage = GradientEdgeStage::default();
        stage.set_image_factors(Some(320.0), Some(90.0)).unwrap();
        let cfg = stage.config_for(TextureDesc::new(640, 360, PixelFormat::Rgba));
        assert_eq!((cfg.step_x, cfg.step_y), (2.0, 4.0));
    }

    #[test]
    fn test_invalid_threshold_keeps_previous() {
        let mut stage = GradientEdgeStage::new(0.3).unwrap();
        assert!(stage.set_threshold(1.5).is_err());
        assert_eq!(stage.threshold(), 0.3);
    }

    #[test]
    fn test_class_map_output_is_luminance() {
        let mut stage = GradientEdgeStage::default();
        stage.set_output(EdgePolarity::Dark, PixelFormat::Rgba);
        let input = TextureDesc::new(8, 8, PixelFormat::Rgba);
        assert_eq!(stage.output_desc(input).format, PixelFormat::Rgba);
        stage.set_low_threshold(Some(0.2)).unwrap();
        assert_eq!(stage.output_desc(input).format, PixelFormat::Luminance);
    }
}
