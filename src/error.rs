//! Errors surfaced to the caller of [`Renderer::render()`](crate::Renderer::render()).

use thiserror::Error;

use crate::ShaderMode;

/// Errors that may occur when starting a render or coloring a pixel.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    /// Render configuration is invalid; no task was dispatched.
    #[error("invalid render configuration: {0}")]
    Configuration(#[from] ConfigError),
    /// Shader mode is known, but has no implementation.
    #[error("shader mode `{}` is not supported", .0.name())]
    UnsupportedShaderMode(ShaderMode),
}

/// Specific cause of an [`Error::Configuration`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Scale is zero, negative or not finite.
    #[error("scale must be a positive finite number, got {0}")]
    NonPositiveScale(f64),
    /// One of the pan offsets is NaN or infinite.
    #[error("pan offsets must be finite, got ({0}, {1})")]
    NonFinitePan(f64, f64),
    /// Iteration cap is zero.
    #[error("iteration cap must be positive")]
    ZeroIterations,
    /// Image has no pixels.
    #[error("image must be non-empty, got {width}x{height}")]
    EmptyImage {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
    /// Parallelism degree is zero.
    #[error("parallelism must be positive")]
    ZeroParallelism,
}
