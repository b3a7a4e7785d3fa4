//! Pipeline parameters and their validation.
//!
//! The image factors are optional: `None` binds them to the dimensions of the
//! texture being processed, which keeps gradient sampling at one-pixel steps
//! regardless of resolution. An explicit factor fixes the step at
//! `texture_dim / factor` pixels.

use serde::{Deserialize, Serialize};

use crate::texture::PixelFormat;
use crate::{EdgeError, EdgeResult};

/// Upper bound on local hysteresis passes.
pub const MAX_HYSTERESIS_PASSES: u32 = 4;

/// How edges are drawn in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgePolarity {
    /// Edges 1.0 on a 0.0 background.
    #[default]
    Light,
    /// Edges 0.0 on a 1.0 background.
    Dark,
}

/// Bounded two-threshold classification.
///
/// Pixels between `low_threshold` and the pipeline threshold are weak edges.
/// Each pass promotes weak edges touching a strong edge, so a weak run is
/// recovered up to `passes` pixels away from its strong anchor. Weak pixels
/// left after the last pass become background.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hysteresis {
    pub low_threshold: f32,
    pub passes: u32,
}

impl Hysteresis {
    pub fn new(low_threshold: f32, passes: u32) -> Self {
        Self { low_threshold, passes }
    }
}

/// Parameters of an [`EdgePipeline`](crate::EdgePipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EdgeParams {
    /// Horizontal sampling factor; `None` tracks the texture width.
    pub image_width_factor: Option<f32>,
    /// Vertical sampling factor; `None` tracks the texture height.
    pub image_height_factor: Option<f32>,
    /// Gaussian sigma in pixels. 0 disables the blur.
    pub blur_size: f32,
    /// Edge threshold on the normalized gradient magnitude, in [0, 1].
    pub threshold: f32,
    /// Optional bounded hysteresis.
    pub hysteresis: Option<Hysteresis>,
    pub polarity: EdgePolarity,
    pub output_format: PixelFormat,
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self {
            image_width_factor: None,
            image_height_factor: None,
            blur_size: 1.0,
            threshold: 0.5,
            hysteresis: None,
            polarity: EdgePolarity::Light,
            output_format: PixelFormat::Luminance,
        }
    }
}

impl EdgeParams {
    /// Checks every field, reporting the first offending one.
    pub fn validate(&self) -> EdgeResult<()> {
        if let Some(f) = self.image_width_factor {
            validate_factor("image_width_factor", f)?;
        }
        if let Some(f) = self.image_height_factor {
            validate_factor("image_height_factor", f)?;
        }
        validate_blur_size(self.blur_size)?;
        validate_threshold("threshold", self.threshold)?;
        if let Some(h) = &self.hysteresis {
            validate_threshold("hysteresis.low_threshold", h.low_threshold)?;
            if h.low_threshold > self.threshold {
                return Err(EdgeError::InvalidParameter(format!(
                    "hysteresis.low_threshold {} exceeds threshold {}",
                    h.low_threshold, self.threshold
                )));
            }
            if h.passes == 0 || h.passes > MAX_HYSTERESIS_PASSES {
                return Err(EdgeError::InvalidParameter(format!(
                    "hysteresis.passes must be in 1..={MAX_HYSTERESIS_PASSES}, got {}",
                    h.passes
                )));
            }
        }
        Ok(())
    }

    /// Factors in effect for a texture of the given size.
    pub fn resolve_factors(&self, width: u32, height: u32) -> (f32, f32) {
        (
            self.image_width_factor.unwrap_or(width as f32),
            self.image_height_factor.unwrap_or(height as f32),
        )
    }
}

pub(crate) fn validate_factor(name: &str, value: f32) -> EdgeResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(EdgeError::InvalidParameter(format!(
            "{name} must be a positive finite number, got {value}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_blur_size(value: f32) -> EdgeResult<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(EdgeError::InvalidParameter(format!(
            "blur_size must be >= 0, got {value}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_threshold(name: &str, value: f32) -> EdgeResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EdgeError::InvalidParameter(format!(
            "{name} must be in [0, 1], got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = EdgeParams::default();
        assert_eq!(p.blur_size, 1.0);
        assert_eq!(p.threshold, 0.5);
        assert_eq!(p.resolve_factors(640, 480), (640.0, 480.0));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_explicit_factors_win() {
        let p = EdgeParams {
            image_width_factor: Some(320.0),
            ..Default::default()
        };
        assert_eq!(p.resolve_factors(640, 480), (320.0, 480.0));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let cases = [
            EdgeParams { threshold: 1.5, ..Default::default() },
            EdgeParams { threshold: -0.1, ..Default::default() },
            EdgeParams { threshold: f32::NAN, ..Default::default() },
            EdgeParams { blur_size: -1.0, ..Default::default() },
            EdgeParams { blur_size: f32::INFINITY, ..Default::default() },
            EdgeParams { image_width_factor: Some(0.0), ..Default::default() },
            EdgeParams { image_height_factor: Some(-3.0), ..Default::default() },
        ];
        for p in cases {
            assert!(
                matches!(p.validate(), Err(EdgeError::InvalidParameter(_))),
                "accepted {p:?}"
            );
        }
    }

    #[test]
    fn test_threshold_bounds_are_inclusive() {
        for t in [0.0, 1.0] {
            let p = EdgeParams { threshold: t, ..Default::default() };
            assert!(p.validate().is_ok());
        }
    }

    #[test]
    fn test_hysteresis_validation() {
        let ok = EdgeParams {
            threshold: 0.4,
            hysteresis: Some(Hysteresis::new(0.2, 2)),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let low_above_high = EdgeParams {
            threshold: 0.4,
            hysteresis: Some(Hysteresis::new(0.6, 2)),
            ..Default::default()
        };
        assert!(low_above_high.validate().is_err());

        for passes in [0, MAX_HYSTERESIS_PASSES + 1] {
            let p = EdgeParams {
                hysteresis: Some(Hysteresis::new(0.1, passes)),
                ..Default::default()
            };
            assert!(p.validate().is_err());
        }
    }
}
