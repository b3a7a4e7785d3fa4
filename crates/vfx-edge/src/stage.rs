//! Filter stage abstraction.

use crate::backend::StagePrimitives;
use crate::texture::TextureDesc;
use crate::EdgeResult;

/// A parametrized GPU program consuming one texture and producing another.
///
/// Stages hold only their bound parameters; they keep no state between
/// frames. Dispatch is static, so a pipeline's wiring is fixed at compile
/// time.
pub trait FilterStage {
    /// Stage name used in logs.
    fn name(&self) -> &'static str;

    /// Output layout for a given input layout.
    fn output_desc(&self, input: TextureDesc) -> TextureDesc;

    /// Run the stage. Returns only once the output is fully written.
    fn process<P: StagePrimitives>(&self, primitives: &P, input: &P::Texture) -> EdgeResult<P::Texture>;
}
