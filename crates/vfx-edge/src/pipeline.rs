//! The edge pipeline: blur -> gradient -> (optional) weak-edge stages.

use tracing::{debug, trace, warn};

use crate::backend::{StagePrimitives, TextureHandle};
use crate::blur::GaussianBlurStage;
use crate::gradient::GradientEdgeStage;
use crate::hysteresis::WeakEdgeStage;
use crate::params::{EdgeParams, Hysteresis};
use crate::stage::FilterStage;
use crate::texture::TextureDesc;
use crate::EdgeResult;

/// Fixed-topology Canny-style pipeline.
///
/// Parameters are validated as a whole before any stage sees them, so a
/// rejected configuration never reaches a frame and the previous one stays
/// active. Since processing borrows the pipeline and reconfiguration needs
/// it mutably, a frame always runs with the parameters it started with.
#[derive(Debug, Clone)]
pub struct EdgePipeline {
    params: EdgeParams,
    blur: GaussianBlurStage,
    gradient: GradientEdgeStage,
    weak: Option<WeakEdgeStage>,
}

impl Default for EdgePipeline {
    fn default() -> Self {
        Self {
            params: EdgeParams::default(),
            blur: GaussianBlurStage::default(),
            gradient: GradientEdgeStage::default(),
            weak: None,
        }
    }
}

impl EdgePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: EdgeParams) -> EdgeResult<Self> {
        let mut pipeline = Self::default();
        pipeline.set_parameters(params)?;
        Ok(pipeline)
    }

    pub fn params(&self) -> &EdgeParams {
        &self.params
    }

    pub fn blur_stage(&self) -> &GaussianBlurStage {
        &self.blur
    }

    pub fn gradient_stage(&self) -> &GradientEdgeStage {
        &self.gradient
    }

    pub fn weak_stage(&self) -> Option<&WeakEdgeStage> {
        self.weak.as_ref()
    }

    /// Validates and applies a full parameter set.
    ///
    /// Stages are rebuilt off to the side and swapped in together; on error
    /// nothing changes.
    pub fn set_parameters(&mut self, params: EdgeParams) -> EdgeResult<()> {
        if let Err(e) = params.validate() {
            warn!(error = %e, "Rejected edge parameters");
            return Err(e);
        }

        let blur = GaussianBlurStage::new(params.blur_size)?;

        let mut gradient = GradientEdgeStage::new(params.threshold)?;
        gradient.set_image_factors(params.image_width_factor, params.image_height_factor)?;
        gradient.set_output(params.polarity, params.output_format);
        gradient.set_low_threshold(params.hysteresis.map(|h| h.low_threshold))?;

        let weak = params
            .hysteresis
            .map(|h| WeakEdgeStage::new(h.passes, params.polarity, params.output_format))
            .transpose()?;

        debug!(
            blur_size = params.blur_size,
            threshold = params.threshold,
            hysteresis = params.hysteresis.is_some(),
            "Edge parameters updated"
        );
        self.blur = blur;
        self.gradient = gradient;
        self.weak = weak;
        self.params = params;
        Ok(())
    }

    pub fn set_blur_size(&mut self, blur_size: f32) -> EdgeResult<()> {
        self.update(|p| p.blur_size = blur_size)
    }

    pub fn set_threshold(&mut self, threshold: f32) -> EdgeResult<()> {
        self.update(|p| p.threshold = threshold)
    }

    pub fn set_image_width_factor(&mut self, factor: f32) -> EdgeResult<()> {
        self.update(|p| p.image_width_factor = Some(factor))
    }

    pub fn set_image_height_factor(&mut self, factor: f32) -> EdgeResult<()> {
        self.update(|p| p.image_height_factor = Some(factor))
    }

    /// Rebinds both factors to the size of each processed texture.
    pub fn track_texture_size(&mut self) -> EdgeResult<()> {
        self.update(|p| {
            p.image_width_factor = None;
            p.image_height_factor = None;
        })
    }

    pub fn set_hysteresis(&mut self, hysteresis: Option<Hysteresis>) -> EdgeResult<()> {
        self.update(|p| p.hysteresis = hysteresis)
    }

    fn update<F: FnOnce(&mut EdgeParams)>(&mut self, f: F) -> EdgeResult<()> {
        let mut params = self.params.clone();
        f(&mut params);
        self.set_parameters(params)
    }
}

impl FilterStage for EdgePipeline {
    fn name(&self) -> &'static str {
        "canny_edge"
    }

    fn output_desc(&self, input: TextureDesc) -> TextureDesc {
        let blurred = self.blur.output_desc(input);
        let edges = self.gradient.output_desc(blurred);
        match &self.weak {
            Some(weak) => weak.output_desc(edges),
            None => edges,
        }
    }

    fn process<P: StagePrimitives>(&self, primitives: &P, input: &P::Texture) -> EdgeResult<P::Texture> {
        let desc = input.desc();
        desc.validate()?;
        trace!(width = desc.width, height = desc.height, backend = primitives.name(), "canny_edge::process");

        let blurred = self.blur.process(primitives, input)?;
        let edges = self.gradient.process(primitives, &blurred)?;
        drop(blurred);

        match &self.weak {
            Some(weak) => weak.process(primitives, &edges),
            None => Ok(edges),
        }
    }
}
