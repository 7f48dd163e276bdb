//! CLI rendering a Mandelbrot set view progressively and saving the final image to a file.

use anyhow::anyhow;
use clap::Parser;

use std::{path::PathBuf, str::FromStr, thread, time::Duration};

use mandelbrot_render::{ImageSurface, Renderer, ShaderMode, Strategy, ViewportState};

const ABOUT: &str = "CLI for rendering a Mandelbrot set view to a file.";

#[derive(Debug, Parser)]
#[command(author, version, about = ABOUT, long_about = None)]
struct Cli {
    /// Output file for the rendered image.
    #[arg(long, short = 'o', default_value = "mandelbrot.png")]
    output: PathBuf,
    /// Size of the image in pixels.
    #[arg(long, short = 's', default_value = "640x480")]
    size: Size,

    /// Zoom factor.
    #[arg(long, default_value = "1")]
    scale: f64,
    /// Horizontal pan offset.
    #[arg(name = "dx", long, default_value = "0", allow_hyphen_values = true)]
    pan_x: f64,
    /// Vertical pan offset.
    #[arg(name = "dy", long, default_value = "0", allow_hyphen_values = true)]
    pan_y: f64,
    /// Max iteration count.
    #[arg(name = "iter", long, default_value = "100")]
    max_iterations: u32,
    /// Shader mode: `blue` or `white`. Unknown names fall back to `blue`.
    #[arg(long, default_value = "blue")]
    shader: String,

    /// Number of column-striped workers.
    #[arg(long, short = 'j', default_value = "2")]
    parallelism: usize,
    /// Render on the main thread instead of the worker pool.
    #[arg(long)]
    sequential: bool,
}

impl Cli {
    fn run(self) -> anyhow::Result<()> {
        tracing::info!(cli = ?self, "starting render");

        let state = ViewportState::new()
            .with_scale(self.scale)
            .with_pan([self.pan_x, self.pan_y])
            .with_max_iterations(self.max_iterations)
            .with_shader(ShaderMode::from_name(&self.shader))
            .with_parallelism(self.parallelism);
        let strategy = if self.sequential {
            Strategy::Sequential
        } else {
            Strategy::Parallel
        };
        let surface = ImageSurface::new(self.size.width, self.size.height);
        let mut renderer = Renderer::new(surface).with_strategy(strategy);
        renderer.render(&state)?;

        loop {
            let status = renderer.poll();
            tracing::info!(
                columns = status.columns_done,
                width = status.width,
                flushes = renderer.surface().flush_count(),
                "progress"
            );
            if status.is_complete() {
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }

        renderer.into_surface().into_image().save(&self.output)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Size {
    width: u32,
    height: u32,
}

impl FromStr for Size {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let parts: Vec<_> = s.split('x').collect();
        match parts.as_slice() {
            [width, height] => Ok(Self {
                width: width.parse()?,
                height: height.parse()?,
            }),
            _ => Err(anyhow!(
                "Size should consist of width and height separated by `x`, e.g., `640x480`"
            )),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    Cli::parse().run()
}
