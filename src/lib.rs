//! Progressive [Mandelbrot set] rendering under a pannable, zoomable viewport.
//!
//! # Theory
//!
//! The Mandelbrot set consists of complex points `c` for which the sequence
//! `z_0 = 0`, `z_{n+1} = z_n^2 + c` stays bounded. The commonly used *escape-time*
//! way to render it is as follows:
//!
//! 1. Map each image pixel to a complex value `c` ([`ViewportTransform`]).
//! 2. Iterate `z <- z^2 + c` while `|z|^2 < 4`, but at most `K` times.
//! 3. If the loop ran all `K` iterations, `c` is considered to be in the set and gets
//!   intensity `0`. Otherwise, its intensity is `i / K`, where `i` is the number of
//!   performed iterations ([`escape_intensity()`]).
//! 4. Convert the intensity to a color ([`ShaderMode`], [`Shade`]).
//!
//! [Mandelbrot set]: https://en.wikipedia.org/wiki/Mandelbrot_set
//!
//! # Progressive rendering
//!
//! A [`Renderer`] splits the image into `N` column-interleaved strips: the strip
//! starting at column `x_init` owns columns `x_init, x_init + N, x_init + 2N, ...`.
//! Each strip is computed by a [`RenderTask`], which yields a [`ColumnResult`] as soon
//! as a column is done. Tasks run on a [`rayon`] thread pool (the [`Strategy::Parallel`]
//! strategy) or, as a fallback, on the caller's thread ([`Strategy::Sequential`]).
//!
//! All columns are consumed by a single [`Compositor`], which colors them, writes them
//! into the framebuffer and decides when to flush the framebuffer to the
//! [`DisplaySurface`] (see [`FlushPolicy`]). Hence, partial results become visible
//! while computation continues.
//!
//! Each call to [`Renderer::render()`] starts a new *generation*. Tasks of the previous
//! generation are cancelled cooperatively; any column they still manage to emit is tagged
//! with a stale [`GenerationId`] and is discarded by the compositor.
//!
//! [`rayon`]: https://crates.io/crates/rayon
//!
//! # Crate features
//!
//! - `parallel` (on by default) enables the parallel strategy. Without it, all renders
//!   use the sequential strategy.
//!
//! # Examples
//!
//! ```
//! use mandelbrot_render::{ImageSurface, Renderer, ShaderMode, ViewportState};
//!
//! # fn main() -> Result<(), mandelbrot_render::Error> {
//! let mut renderer = Renderer::new(ImageSurface::new(120, 80));
//! let mut state = ViewportState::new()
//!     .with_shader(ShaderMode::Blue)
//!     .with_max_iterations(200);
//! renderer.render(&state)?;
//!
//! // The viewport changes before the render is complete, e.g. after a drag gesture.
//! state.pan_by(10.0, -5.0);
//! renderer.render(&state)?;
//! let status = renderer.wait();
//! assert!(status.is_complete());
//! assert_eq!(status.columns_done, 120);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc(html_root_url = "https://docs.rs/mandelbrot-render/0.1.0")]
#![warn(missing_docs, missing_debug_implementations, bare_trait_objects)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

pub use crate::{
    compositor::{Accepted, Compositor, GenerationState, RenderStatus},
    config::RenderConfig,
    error::{ConfigError, Error},
    escape::escape_intensity,
    flush::{FlushPolicy, FLUSH_INTERVAL},
    scheduler::{Renderer, Strategy},
    shader::{Blue, Shade, ShaderMode, White},
    surface::{DisplaySurface, ImageSurface},
    task::{strip_columns, Cancellation, ColumnResult, GenerationId, RenderTask},
    viewport::{ViewportState, ViewportTransform, DEFAULT_MAX_ITERATIONS, DEFAULT_PARALLELISM},
};

mod compositor;
mod config;
mod error;
mod escape;
mod flush;
mod scheduler;
mod shader;
mod surface;
mod task;
mod viewport;

/// RGBA framebuffer owned by the [`Compositor`].
pub type Framebuffer = image::RgbaImage;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
