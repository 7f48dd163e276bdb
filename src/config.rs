//! Immutable per-generation render configuration.

use crate::{ConfigError, ShaderMode, ViewportState, ViewportTransform};

/// Snapshot of the viewport and image dimensions taken when a render generation starts.
///
/// A config is never mutated; a new viewport state always produces a new config.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    max_iterations: u32,
    scale: f64,
    pan: [f64; 2],
    image_size: [u32; 2],
    parallelism: usize,
    shader: ShaderMode,
    transform: ViewportTransform,
}

impl RenderConfig {
    /// Validates `state` against an image of `width` x `height` pixels and snapshots it.
    ///
    /// # Errors
    ///
    /// Returns an error if the scale is not a positive finite number, the pan offsets are
    /// not finite, or the iteration cap, parallelism or image dimensions are zero.
    pub fn new(state: &ViewportState, width: u32, height: u32) -> Result<Self, ConfigError> {
        if !(state.scale.is_finite() && state.scale > 0.0) {
            return Err(ConfigError::NonPositiveScale(state.scale));
        }
        let [dx, dy] = state.pan;
        if !(dx.is_finite() && dy.is_finite()) {
            return Err(ConfigError::NonFinitePan(dx, dy));
        }
        if state.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyImage { width, height });
        }
        if state.parallelism == 0 {
            return Err(ConfigError::ZeroParallelism);
        }

        Ok(Self {
            max_iterations: state.max_iterations,
            scale: state.scale,
            pan: state.pan,
            image_size: [width, height],
            parallelism: state.parallelism,
            shader: state.shader,
            transform: ViewportTransform::new([width, height], state.scale, state.pan),
        })
    }

    /// Returns a copy of this config with a different parallelism degree. Used by
    /// the sequential fallback.
    pub(crate) fn with_parallelism(&self, parallelism: usize) -> Self {
        debug_assert!(parallelism > 0);
        Self {
            parallelism,
            ..self.clone()
        }
    }

    /// Returns the iteration cap.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Returns the zoom factor.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Returns the pan offsets.
    pub fn pan(&self) -> [f64; 2] {
        self.pan
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> u32 {
        self.image_size[0]
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> u32 {
        self.image_size[1]
    }

    /// Returns the number of column-striped tasks.
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Returns the shader mode.
    pub fn shader(&self) -> ShaderMode {
        self.shader
    }

    /// Returns the pixel-to-complex-plane mapping.
    pub fn transform(&self) -> &ViewportTransform {
        &self.transform
    }

    /// Height of the visible complex region. Same as
    /// [`ViewportTransform::height_scalar()`].
    pub fn height_scalar(&self) -> f64 {
        self.transform.height_scalar()
    }

    /// Width of the visible complex region.
    pub fn width_scalar(&self) -> f64 {
        self.transform.width_scalar()
    }
}
