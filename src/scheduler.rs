//! Render generations: dispatching tasks, superseding stale renders and draining output.

#[cfg(feature = "parallel")]
use crossbeam_channel::{Receiver, Sender};

use std::{sync::Arc, time::Instant};

#[cfg(feature = "parallel")]
use crate::ColumnResult;
use crate::{
    compositor::RenderStatus, Cancellation, Compositor, DisplaySurface, Error, FlushPolicy,
    Framebuffer, GenerationId, RenderConfig, RenderTask, Shade, ViewportState,
};

/// Message sent by a worker to the compositor queue.
#[cfg(feature = "parallel")]
#[derive(Debug)]
enum WorkerMessage {
    Column(ColumnResult),
    Finished(GenerationId),
}

/// Strategy for executing the render tasks of a generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// One task per column strip, each running on a worker thread. Output is delivered
    /// via [`Renderer::poll()`] / [`Renderer::wait()`]. Falls back to
    /// [`Self::Sequential`] if the worker pool cannot be created (or the `parallel`
    /// crate feature is off).
    #[default]
    Parallel,
    /// A single task covering all columns, run to completion on the caller's thread
    /// inside [`Renderer::render()`].
    Sequential,
}

/// Progressive Mandelbrot renderer drawing to a [`DisplaySurface`].
///
/// Each call to [`Self::render()`] starts a new *generation*, superseding the previous
/// one. Columns produced by superseded generations never reach the framebuffer.
///
/// # Examples
///
/// ```
/// use mandelbrot_render::{ImageSurface, Renderer, ShaderMode, ViewportState};
///
/// # fn main() -> Result<(), mandelbrot_render::Error> {
/// let mut renderer = Renderer::new(ImageSurface::new(64, 48));
/// let state = ViewportState::new()
///     .with_shader(ShaderMode::White)
///     .with_max_iterations(50);
/// renderer.render(&state)?;
/// let status = renderer.wait();
/// assert!(status.is_complete());
/// let image = renderer.surface().image();
/// assert_eq!(image.dimensions(), (64, 48));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Renderer<S> {
    compositor: Compositor<S>,
    generation: GenerationId,
    cancellation: Cancellation,
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    strategy: Strategy,
    last_strategy: Option<Strategy>,
    #[cfg(feature = "parallel")]
    sender: Sender<WorkerMessage>,
    #[cfg(feature = "parallel")]
    receiver: Receiver<WorkerMessage>,
    #[cfg(feature = "parallel")]
    pool: Option<Arc<WorkerPool>>,
    #[cfg(feature = "parallel")]
    build_pool: BuildPool,
}

#[cfg(feature = "parallel")]
type BuildPool = fn(usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError>;

#[cfg(feature = "parallel")]
#[derive(Debug)]
struct WorkerPool {
    threads: usize,
    inner: rayon::ThreadPool,
}

#[cfg(feature = "parallel")]
impl WorkerPool {
    fn build(threads: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("mandelbrot-worker-{i}"))
            .build()
    }

    /// Returns the number of pool threads for `tasks` render tasks: no more than
    /// the tasks themselves and the available hardware parallelism.
    fn threads_for(tasks: usize) -> usize {
        let available = std::thread::available_parallelism().map_or(1, usize::from);
        tasks.min(available).max(1)
    }
}

impl<S: DisplaySurface> Renderer<S> {
    /// Creates an idle renderer drawing to `surface` with the [`Strategy::Parallel`]
    /// strategy.
    pub fn new(surface: S) -> Self {
        #[cfg(feature = "parallel")]
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            compositor: Compositor::new(surface),
            generation: GenerationId::default(),
            cancellation: Cancellation::new(),
            strategy: Strategy::default(),
            last_strategy: None,
            #[cfg(feature = "parallel")]
            sender,
            #[cfg(feature = "parallel")]
            receiver,
            #[cfg(feature = "parallel")]
            pool: None,
            #[cfg(feature = "parallel")]
            build_pool: WorkerPool::build,
        }
    }

    /// Sets the preferred execution strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Returns the strategy used by the latest generation, or `None` if nothing
    /// was rendered yet.
    pub fn last_strategy(&self) -> Option<Strategy> {
        self.last_strategy
    }

    /// Returns the compositor.
    pub fn compositor(&self) -> &Compositor<S> {
        &self.compositor
    }

    /// Returns the display surface.
    pub fn surface(&self) -> &S {
        self.compositor.surface()
    }

    /// Returns the display surface mutably, e.g. to resize it before the next render.
    pub fn surface_mut(&mut self) -> &mut S {
        self.compositor.surface_mut()
    }

    /// Consumes the renderer and returns the display surface. Running tasks stop
    /// at the next column boundary.
    pub fn into_surface(self) -> S {
        self.cancellation.cancel();
        self.compositor.into_surface()
    }

    /// Returns the framebuffer of the latest generation.
    pub fn framebuffer(&self) -> &Framebuffer {
        self.compositor.framebuffer()
    }

    /// Returns the latest generation.
    pub fn generation(&self) -> GenerationId {
        self.generation
    }

    /// Returns progress of the latest generation without draining worker output.
    pub fn status(&self) -> RenderStatus {
        self.compositor.status()
    }

    /// Starts a new render generation for `state`, superseding the active one.
    ///
    /// The state is snapshotted together with the current surface dimensions, so
    /// the caller may mutate it right after this call. With the parallel strategy,
    /// this method returns immediately; output is composited by [`Self::poll()`] or
    /// [`Self::wait()`]. With the sequential strategy, the whole image is rendered
    /// before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the shader mode is not supported.
    /// In this case, no tasks are dispatched and the active generation (if any)
    /// keeps running.
    pub fn render(&mut self, state: &ViewportState) -> Result<GenerationId, Error> {
        let [width, height] = self.compositor.surface().dimensions();
        let config = RenderConfig::new(state, width, height)?;
        let shader = config.shader().shader()?;

        self.cancel();
        self.generation = self.generation.next();
        self.cancellation = Cancellation::new();
        let generation = self.generation;
        let _span = tracing::info_span!("render", %generation).entered();

        #[cfg(feature = "parallel")]
        if self.strategy == Strategy::Parallel {
            let threads = WorkerPool::threads_for(parallel_tasks(&config) as usize);
            match self.ensure_pool(threads) {
                Ok(pool) => {
                    self.dispatch_parallel(&pool, generation, Arc::new(config), shader);
                    return Ok(generation);
                }
                Err(err) => {
                    tracing::warn!(%err, "cannot create worker pool; rendering sequentially");
                }
            }
        }
        self.render_sequentially(generation, &config, shader);
        Ok(generation)
    }

    /// Supersedes the active generation without starting a new one.
    pub fn cancel(&mut self) {
        self.cancellation.cancel();
        self.compositor.supersede();
    }

    /// Composites all worker output received so far without blocking.
    pub fn poll(&mut self) -> RenderStatus {
        #[cfg(feature = "parallel")]
        while let Ok(message) = self.receiver.try_recv() {
            self.handle(message);
        }
        self.compositor.status()
    }

    /// Blocks until the active generation completes, compositing its output.
    /// Returns immediately if no generation is active.
    pub fn wait(&mut self) -> RenderStatus {
        #[cfg(feature = "parallel")]
        while self.compositor.status().state == crate::GenerationState::Active {
            match self.receiver.recv() {
                Ok(message) => self.handle(message),
                Err(_) => break,
            }
        }
        self.compositor.status()
    }

    #[cfg(feature = "parallel")]
    fn handle(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Column(column) => {
                self.compositor.accept(column, Instant::now());
            }
            WorkerMessage::Finished(generation) => self.compositor.task_finished(generation),
        }
    }

    #[cfg(feature = "parallel")]
    fn ensure_pool(
        &mut self,
        threads: usize,
    ) -> Result<Arc<WorkerPool>, rayon::ThreadPoolBuildError> {
        if let Some(pool) = self.pool.as_ref().filter(|pool| pool.threads == threads) {
            return Ok(Arc::clone(pool));
        }
        let inner = (self.build_pool)(threads)?;
        let pool = Arc::new(WorkerPool { threads, inner });
        self.pool = Some(Arc::clone(&pool));
        Ok(pool)
    }

    #[cfg(feature = "parallel")]
    fn dispatch_parallel(
        &mut self,
        pool: &WorkerPool,
        generation: GenerationId,
        config: Arc<RenderConfig>,
        shader: &'static (dyn Shade + Send + Sync),
    ) {
        let x_skip = u32::try_from(config.parallelism()).unwrap_or(u32::MAX);
        let tasks = parallel_tasks(&config);
        tracing::debug!(
            width = config.width(),
            height = config.height(),
            tasks,
            threads = pool.threads,
            "dispatching parallel generation"
        );

        let flush_policy = FlushPolicy::position(config.width(), x_skip);
        self.compositor
            .begin(generation, &config, Box::new(shader), flush_policy, tasks as usize);

        for x_init in 0..tasks {
            let task = RenderTask::new(
                Arc::clone(&config),
                generation,
                x_init,
                x_skip,
                self.cancellation.clone(),
            );
            let sender = self.sender.clone();
            pool.inner.spawn(move || run_task(task, &sender));
        }
        self.last_strategy = Some(Strategy::Parallel);
    }

    fn render_sequentially(
        &mut self,
        generation: GenerationId,
        config: &RenderConfig,
        shader: &'static (dyn Shade + Send + Sync),
    ) {
        let config = Arc::new(config.with_parallelism(1));
        tracing::debug!(
            width = config.width(),
            height = config.height(),
            "rendering generation sequentially"
        );

        let flush_policy = FlushPolicy::time_based(Instant::now());
        self.compositor
            .begin(generation, &config, Box::new(shader), flush_policy, 1);
        let task = RenderTask::new(config, generation, 0, 1, self.cancellation.clone());
        for column in task {
            self.compositor.accept(column, Instant::now());
        }
        self.compositor.task_finished(generation);
        self.last_strategy = Some(Strategy::Sequential);
    }
}

/// Returns the number of strips worth a task. Strips starting past the right edge
/// own no columns.
#[cfg(feature = "parallel")]
fn parallel_tasks(config: &RenderConfig) -> u32 {
    let x_skip = u32::try_from(config.parallelism()).unwrap_or(u32::MAX);
    x_skip.min(config.width())
}

/// Streams the columns of `task` to the compositor queue. Stops early if the
/// renderer is gone.
#[cfg(feature = "parallel")]
fn run_task(task: RenderTask, sender: &Sender<WorkerMessage>) {
    let generation = task.generation();
    for column in task {
        if sender.send(WorkerMessage::Column(column)).is_err() {
            return;
        }
    }
    sender.send(WorkerMessage::Finished(generation)).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GenerationState, ImageSurface, ShaderMode};

    #[cfg(feature = "parallel")]
    use std::io;

    fn white_state() -> ViewportState {
        ViewportState::new()
            .with_shader(ShaderMode::White)
            .with_max_iterations(40)
    }

    fn reference_image(state: &ViewportState, width: u32, height: u32) -> Framebuffer {
        let mut renderer =
            Renderer::new(ImageSurface::new(width, height)).with_strategy(Strategy::Sequential);
        renderer.render(state).unwrap();
        renderer.into_surface().into_image()
    }

    #[test]
    fn sequential_render_completes_synchronously() {
        let mut renderer =
            Renderer::new(ImageSurface::new(16, 12)).with_strategy(Strategy::Sequential);
        let generation = renderer.render(&white_state()).unwrap();

        assert_eq!(generation, GenerationId(1));
        assert_eq!(renderer.last_strategy(), Some(Strategy::Sequential));
        let status = renderer.status();
        assert!(status.is_complete());
        assert_eq!(status.columns_done, 16);
        assert_eq!(renderer.surface().clear_count(), 1);
        assert!(renderer.surface().flush_count() >= 1);
        assert_eq!(renderer.surface().image(), renderer.framebuffer());
    }

    #[test]
    fn invalid_state_is_rejected_before_dispatch() {
        let mut renderer = Renderer::new(ImageSurface::new(16, 12));
        let err = renderer
            .render(&white_state().with_scale(0.0))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err}");

        let err = renderer
            .render(&white_state().with_shader(ShaderMode::Histogram))
            .unwrap_err();
        assert_eq!(err, Error::UnsupportedShaderMode(ShaderMode::Histogram));

        assert_eq!(renderer.generation(), GenerationId(0));
        assert_eq!(renderer.surface().clear_count(), 0);
        assert_eq!(renderer.status().state, GenerationState::Idle);
    }

    #[test]
    fn empty_surface_is_a_configuration_error() {
        let mut renderer = Renderer::new(ImageSurface::new(0, 12));
        let err = renderer.render(&white_state()).unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(crate::ConfigError::EmptyImage { .. })
        ));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_render_matches_sequential() {
        let state = white_state().with_parallelism(3);
        let mut renderer = Renderer::new(ImageSurface::new(37, 20));
        renderer.render(&state).unwrap();
        let status = renderer.wait();

        assert!(status.is_complete());
        assert_eq!(status.columns_done, 37);
        assert_eq!(renderer.last_strategy(), Some(Strategy::Parallel));
        assert_eq!(*renderer.framebuffer(), reference_image(&state, 37, 20));
        assert_eq!(renderer.surface().image(), renderer.framebuffer());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallelism_above_width_spawns_only_useful_tasks() {
        let state = white_state().with_parallelism(8);
        let mut renderer = Renderer::new(ImageSurface::new(3, 3));
        renderer.render(&state).unwrap();
        let status = renderer.wait();
        assert!(status.is_complete());
        assert_eq!(status.columns_done, 3);
        assert_eq!(*renderer.framebuffer(), reference_image(&state, 3, 3));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn pool_size_is_bounded_by_width_and_hardware() {
        let state = white_state().with_parallelism(20_000);
        let mut renderer = Renderer::new(ImageSurface::new(4, 4));
        renderer.render(&state).unwrap();
        let status = renderer.wait();

        assert!(status.is_complete());
        assert_eq!(status.columns_done, 4);
        assert_eq!(*renderer.framebuffer(), reference_image(&state, 4, 4));
        let threads = renderer.pool.as_ref().unwrap().threads;
        assert!(threads <= 4, "{threads}");
        assert_eq!(threads, WorkerPool::threads_for(4));

        renderer.surface_mut().resize(1_000, 2);
        renderer.render(&state).unwrap();
        assert!(renderer.wait().is_complete());
        let threads = renderer.pool.as_ref().unwrap().threads;
        let available = std::thread::available_parallelism().map_or(1, usize::from);
        assert!(threads <= available, "{threads}");
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn pool_build_failure_falls_back_to_sequential() {
        let state = white_state().with_parallelism(3);
        let mut renderer = Renderer::new(ImageSurface::new(23, 17));
        renderer.build_pool = |threads| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .spawn_handler(|_| Err(io::Error::new(io::ErrorKind::Other, "no threads")))
                .build()
        };

        let generation = renderer.render(&state).unwrap();
        assert_eq!(renderer.last_strategy(), Some(Strategy::Sequential));
        assert!(renderer.pool.is_none());
        // The sequential fallback completes inside `render()`.
        let status = renderer.status();
        assert!(status.is_complete());
        assert_eq!(status.generation, generation);
        assert_eq!(status.columns_done, 23);
        assert_eq!(*renderer.framebuffer(), reference_image(&state, 23, 17));
        assert_eq!(renderer.surface().image(), renderer.framebuffer());
        assert_eq!(renderer.poll(), status);
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn parallel_strategy_renders_sequentially_without_feature() {
        let state = white_state().with_parallelism(3);
        let mut renderer = Renderer::new(ImageSurface::new(9, 5));
        renderer.render(&state).unwrap();

        assert_eq!(renderer.last_strategy(), Some(Strategy::Sequential));
        assert!(renderer.status().is_complete());
        assert!(renderer.wait().is_complete());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn late_output_of_superseded_generation_is_discarded() {
        let slow_state = white_state().with_max_iterations(5_000);
        let mut renderer = Renderer::new(ImageSurface::new(200, 150));
        let stale_generation = renderer.render(&slow_state).unwrap();
        // Simulates a slow worker of the first generation emitting after cancellation.
        let stale_sender = renderer.sender.clone();

        let state = white_state().with_pan([3.0, -2.0]);
        let generation = renderer.render(&state).unwrap();
        assert_eq!(renderer.compositor().generation(), generation);
        assert!(renderer.surface().image().pixels().all(|pixel| pixel.0 == [0; 4]));

        stale_sender
            .send(WorkerMessage::Column(ColumnResult {
                generation: stale_generation,
                column: 0,
                intensities: vec![0.99; 150],
                height_scalar: 1.0,
            }))
            .unwrap();
        stale_sender
            .send(WorkerMessage::Finished(stale_generation))
            .unwrap();

        let status = renderer.wait();
        assert!(status.is_complete());
        assert_eq!(status.generation, generation);
        assert!(renderer.compositor().discarded() >= 1);
        assert_eq!(*renderer.framebuffer(), reference_image(&state, 200, 150));
        assert_eq!(renderer.surface().image(), renderer.framebuffer());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn cancel_stops_accepting_output() {
        let mut renderer = Renderer::new(ImageSurface::new(100, 100));
        renderer
            .render(&white_state().with_max_iterations(2_000))
            .unwrap();
        renderer.cancel();

        assert_eq!(renderer.status().state, GenerationState::Idle);
        let status = renderer.wait();
        assert_eq!(status.state, GenerationState::Idle);
        let status = renderer.poll();
        assert_eq!(status.state, GenerationState::Idle);
    }

    #[test]
    fn resized_surface_applies_to_next_generation() {
        let mut renderer =
            Renderer::new(ImageSurface::new(10, 10)).with_strategy(Strategy::Sequential);
        renderer.render(&white_state()).unwrap();
        renderer.surface_mut().resize(20, 5);
        renderer.render(&white_state()).unwrap();

        assert_eq!(renderer.framebuffer().dimensions(), (20, 5));
        assert_eq!(renderer.generation(), GenerationId(2));
        assert_eq!(renderer.surface().clear_count(), 2);
    }
}
