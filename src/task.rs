//! Column-striped render tasks.

use std::{
    fmt,
    iter::StepBy,
    ops::Range,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{escape::escape_intensity, RenderConfig};

/// Identifier of a render generation, i.e. one call to [`Renderer::render()`].
///
/// [`Renderer::render()`]: crate::Renderer::render()
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenerationId(pub(crate) u64);

impl GenerationId {
    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, formatter)
    }
}

/// Cooperative cancellation flag shared by all tasks of a generation.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    /// Creates a flag that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Tasks observe it at the next column boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Checks whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Escape intensities for a single image column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnResult {
    /// Generation that produced this column.
    pub generation: GenerationId,
    /// Column index.
    pub column: u32,
    /// Intensity for each row, top to bottom.
    pub intensities: Vec<f64>,
    /// Height of the visible complex region used for the render.
    pub height_scalar: f64,
}

/// Returns the columns of a `width`-pixel image owned by the strip starting at `x_init`
/// with stride `x_skip`.
///
/// # Panics
///
/// Panics if `x_skip` is zero.
pub fn strip_columns(x_init: u32, x_skip: u32, width: u32) -> StepBy<Range<u32>> {
    assert!(x_skip > 0, "stride must be positive");
    (x_init.min(width)..width).step_by(x_skip as usize)
}

/// Computes one column-interleaved strip of the image.
///
/// The task is a lazy iterator: each call to [`Iterator::next()`] computes and returns
/// the next owned column, so columns can be displayed as soon as they are ready.
/// Once the generation is cancelled, the iterator ends at the next column boundary.
#[derive(Debug)]
pub struct RenderTask {
    config: Arc<RenderConfig>,
    generation: GenerationId,
    x_init: u32,
    columns: StepBy<Range<u32>>,
    cancellation: Cancellation,
}

impl RenderTask {
    /// Creates a task computing columns `x_init, x_init + x_skip, ...` of the image
    /// described by `config`.
    pub fn new(
        config: Arc<RenderConfig>,
        generation: GenerationId,
        x_init: u32,
        x_skip: u32,
        cancellation: Cancellation,
    ) -> Self {
        let columns = strip_columns(x_init, x_skip, config.width());
        Self {
            config,
            generation,
            x_init,
            columns,
            cancellation,
        }
    }

    /// Returns the generation this task belongs to.
    pub fn generation(&self) -> GenerationId {
        self.generation
    }

    /// Returns the first column of the strip.
    pub fn x_init(&self) -> u32 {
        self.x_init
    }

    fn compute_column(&self, column: u32) -> ColumnResult {
        let transform = self.config.transform();
        let max_iterations = self.config.max_iterations();
        let intensities = (0..self.config.height())
            .map(|row| escape_intensity(transform.map_pixel(column, row), max_iterations))
            .collect();

        ColumnResult {
            generation: self.generation,
            column,
            intensities,
            height_scalar: transform.height_scalar(),
        }
    }
}

impl Iterator for RenderTask {
    type Item = ColumnResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cancellation.is_cancelled() {
            return None;
        }
        let column = self.columns.next()?;
        Some(self.compute_column(column))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.columns.size_hint().1)
    }
}
