//! Bounded hysteresis stage.
//!
//! Full Canny hysteresis traces weak edges to any distance, which needs
//! unbounded iteration. This stage runs a fixed number of 3x3 passes over the
//! class map instead: a weak edge is kept when a chain of weak edges links it
//! to a strong edge within `passes` pixels.

use tracing::{debug, trace};

use crate::backend::{StagePrimitives, TextureHandle};
use crate::kernels::WeakEdgeConfig;
use crate::params::{EdgePolarity, MAX_HYSTERESIS_PASSES};
use crate::stage::FilterStage;
use crate::texture::{PixelFormat, TextureDesc};
use crate::{EdgeError, EdgeResult};

#[derive(Debug, Clone)]
pub struct WeakEdgeStage {
    passes: u32,
    polarity: EdgePolarity,
    output: PixelFormat,
}

impl WeakEdgeStage {
    pub fn new(passes: u32, polarity: EdgePolarity, output: PixelFormat) -> EdgeResult<Self> {
        if passes == 0 || passes > MAX_HYSTERESIS_PASSES {
            return Err(EdgeError::InvalidParameter(format!(
                "hysteresis passes must be in 1..={MAX_HYSTERESIS_PASSES}, got {passes}"
            )));
        }
        Ok(Self { passes, polarity, output })
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }
}

impl FilterStage for WeakEdgeStage {
    fn name(&self) -> &'static str {
        "weak_edge"
    }

    fn output_desc(&self, input: TextureDesc) -> TextureDesc {
        input.with_format(self.output)
    }

    fn process<P: StagePrimitives>(&self, primitives: &P, input: &P::Texture) -> EdgeResult<P::Texture> {
        let desc = input.desc();
        desc.validate()?;
        if desc.format != PixelFormat::Luminance {
            return Err(EdgeError::UpstreamFailure(format!(
                "weak edge stage expects a luminance class map, got {:?}",
                desc.format
            )));
        }
        debug!(passes = self.passes, "Propagating weak edges");

        let class_desc = desc;
        let mut current: Option<P::Texture> = None;
        for pass in 1..=self.passes {
            let resolve = pass == self.passes;
            let cfg = WeakEdgeConfig {
                resolve,
                polarity: self.polarity,
                output: self.output,
            };
            trace!(pass, resolve, "weak_edge pass");

            let out_desc = if resolve { self.output_desc(desc) } else { class_desc };
            let mut next = primitives.allocate(out_desc)?;
            let src = current.as_ref().unwrap_or(input);
            primitives.exec_weak_edges(src, &mut next, &cfg)?;
            // Previous ping-pong texture is released here.
            current = Some(next);
        }

        current.ok_or_else(|| EdgeError::OperationFailed("weak edge stage ran no passes".into()))
    }
}
