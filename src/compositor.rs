//! Single consumer of render task output.

use std::{fmt, time::Instant};

use crate::{
    ColumnResult, DisplaySurface, FlushPolicy, Framebuffer, GenerationId, RenderConfig, Shade,
};

/// Outcome of [`Compositor::accept()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepted {
    /// Column was colored and written into the framebuffer.
    Written,
    /// Column belongs to a superseded generation (or doesn't fit the framebuffer)
    /// and was dropped.
    Discarded,
}

/// Lifecycle state of the current generation as seen by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    /// No generation is accepting output.
    Idle,
    /// Some tasks of the current generation are still running.
    Active,
    /// All tasks of the current generation have finished.
    Completed,
}

/// Progress of the current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStatus {
    /// Current generation.
    pub generation: GenerationId,
    /// Lifecycle state.
    pub state: GenerationState,
    /// Number of columns written so far.
    pub columns_done: u32,
    /// Image width, i.e., the total number of columns.
    pub width: u32,
}

impl RenderStatus {
    /// Checks whether the current generation has finished.
    pub fn is_complete(&self) -> bool {
        self.state == GenerationState::Completed
    }
}

/// Owns the framebuffer and the display surface; colors incoming columns and decides
/// when to flush.
///
/// The compositor is the only writer to the framebuffer and the surface. Columns tagged
/// with any generation other than the current one are discarded.
pub struct Compositor<S> {
    surface: S,
    framebuffer: Framebuffer,
    generation: GenerationId,
    state: GenerationState,
    shader: Box<dyn Shade + Send>,
    flush_policy: FlushPolicy,
    pending_tasks: usize,
    columns_done: u32,
    dirty: bool,
    discarded: u64,
}

impl<S: fmt::Debug> fmt::Debug for Compositor<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Compositor")
            .field("surface", &self.surface)
            .field("generation", &self.generation)
            .field("state", &self.state)
            .field("flush_policy", &self.flush_policy)
            .field("pending_tasks", &self.pending_tasks)
            .field("columns_done", &self.columns_done)
            .field("discarded", &self.discarded)
            .finish_non_exhaustive()
    }
}

impl<S: DisplaySurface> Compositor<S> {
    /// Creates an idle compositor drawing to `surface`.
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            framebuffer: Framebuffer::new(0, 0),
            generation: GenerationId::default(),
            state: GenerationState::Idle,
            shader: Box::new(crate::shader::Blue),
            flush_policy: FlushPolicy::position(0, 1),
            pending_tasks: 0,
            columns_done: 0,
            dirty: false,
            discarded: 0,
        }
    }

    /// Returns the display surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Returns the display surface mutably, e.g. to resize it between renders.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Consumes the compositor and returns the display surface.
    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Returns the framebuffer of the current (or last) generation.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Returns the current generation.
    pub fn generation(&self) -> GenerationId {
        self.generation
    }

    /// Returns the number of columns dropped because they belonged to a stale generation
    /// or did not fit the framebuffer.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Returns progress of the current generation.
    pub fn status(&self) -> RenderStatus {
        RenderStatus {
            generation: self.generation,
            state: self.state,
            columns_done: self.columns_done,
            width: self.framebuffer.width(),
        }
    }

    /// Starts accepting output of `generation`, which is rendered by `tasks` tasks.
    /// Resets the framebuffer to the config dimensions and clears the surface.
    pub fn begin(
        &mut self,
        generation: GenerationId,
        config: &RenderConfig,
        shader: Box<dyn Shade + Send>,
        flush_policy: FlushPolicy,
        tasks: usize,
    ) {
        debug_assert!(generation > self.generation, "generation ids must increase");
        self.generation = generation;
        self.framebuffer = Framebuffer::new(config.width(), config.height());
        self.shader = shader;
        self.flush_policy = flush_policy;
        self.pending_tasks = tasks;
        self.columns_done = 0;
        self.dirty = false;
        self.state = if tasks == 0 {
            GenerationState::Completed
        } else {
            GenerationState::Active
        };
        self.surface.clear();
    }

    /// Stops accepting output of the current generation. The framebuffer is kept
    /// as is.
    pub fn supersede(&mut self) {
        if self.state == GenerationState::Active {
            tracing::debug!(generation = %self.generation, "generation superseded");
            self.state = GenerationState::Idle;
        }
    }

    /// Colors `column` and writes it into the framebuffer, flushing the framebuffer
    /// if the flush policy says so.
    pub fn accept(&mut self, column: ColumnResult, now: Instant) -> Accepted {
        if column.generation != self.generation || self.state != GenerationState::Active {
            self.discarded += 1;
            return Accepted::Discarded;
        }
        let (width, height) = self.framebuffer.dimensions();
        if column.column >= width || column.intensities.len() != height as usize {
            tracing::warn!(
                generation = %column.generation,
                column = column.column,
                rows = column.intensities.len(),
                "column does not fit framebuffer"
            );
            self.discarded += 1;
            return Accepted::Discarded;
        }

        for (row, &intensity) in (0..height).zip(&column.intensities) {
            let pixel = self.shader.shade(intensity);
            self.framebuffer.put_pixel(column.column, row, pixel);
        }
        self.columns_done += 1;
        self.dirty = true;

        if self.flush_policy.on_column(column.column, now) {
            self.flush();
        }
        Accepted::Written
    }

    /// Records that a task of `generation` has emitted its last column. Once all tasks
    /// of the current generation are done, the framebuffer is flushed (if it has
    /// unflushed changes) and the generation completes.
    pub fn task_finished(&mut self, generation: GenerationId) {
        if generation != self.generation || self.state != GenerationState::Active {
            return;
        }
        self.pending_tasks = self.pending_tasks.saturating_sub(1);
        if self.pending_tasks == 0 {
            if self.dirty {
                self.flush();
            }
            self.state = GenerationState::Completed;
            tracing::debug!(
                generation = %self.generation,
                columns = self.columns_done,
                discarded = self.discarded,
                "generation completed"
            );
        }
    }

    fn flush(&mut self) {
        tracing::trace!(
            generation = %self.generation,
            columns = self.columns_done,
            "flushing framebuffer"
        );
        self.surface.flush(&self.framebuffer);
        self.dirty = false;
    }
}
