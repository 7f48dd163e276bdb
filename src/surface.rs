//! Display surface abstraction.

use crate::Framebuffer;

/// Surface displaying the rendered image, e.g. a window or a canvas.
///
/// The renderer reads [`Self::dimensions()`] before each generation, calls
/// [`Self::clear()`] once when the generation starts, and [`Self::flush()`] whenever
/// partial results should become visible. A flush always carries the entire accumulated
/// framebuffer, not just the newly computed columns.
pub trait DisplaySurface {
    /// Returns the current surface size as `[width, height]` in pixels.
    fn dimensions(&self) -> [u32; 2];

    /// Clears the surface.
    fn clear(&mut self);

    /// Presents the framebuffer. Its dimensions are those in effect when the
    /// generation started, which may differ from the current surface size.
    fn flush(&mut self, framebuffer: &Framebuffer);
}

/// In-memory surface keeping a copy of the last presented image.
#[derive(Debug, Clone)]
pub struct ImageSurface {
    size: [u32; 2],
    image: Framebuffer,
    flush_count: usize,
    clear_count: usize,
}

impl ImageSurface {
    /// Creates a surface with the specified dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: [width, height],
            image: Framebuffer::new(width, height),
            flush_count: 0,
            clear_count: 0,
        }
    }

    /// Changes the surface size. Takes effect for the next render generation.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = [width, height];
    }

    /// Returns the last presented image.
    pub fn image(&self) -> &Framebuffer {
        &self.image
    }

    /// Consumes the surface and returns the last presented image.
    pub fn into_image(self) -> Framebuffer {
        self.image
    }

    /// Returns the number of flushes since the surface was created.
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    /// Returns the number of clears since the surface was created.
    pub fn clear_count(&self) -> usize {
        self.clear_count
    }
}

impl DisplaySurface for ImageSurface {
    fn dimensions(&self) -> [u32; 2] {
        self.size
    }

    fn clear(&mut self) {
        let [width, height] = self.size;
        self.image = Framebuffer::new(width, height);
        self.clear_count += 1;
    }

    fn flush(&mut self, framebuffer: &Framebuffer) {
        self.image.clone_from(framebuffer);
        self.flush_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn image_surface_keeps_last_flush() {
        let mut surface = ImageSurface::new(3, 2);
        assert_eq!(surface.dimensions(), [3, 2]);

        let mut framebuffer = Framebuffer::new(3, 2);
        framebuffer.put_pixel(1, 1, Rgba([10, 20, 30, 255]));
        surface.flush(&framebuffer);
        assert_eq!(surface.flush_count(), 1);
        assert_eq!(surface.image()[(1, 1)], Rgba([10, 20, 30, 255]));

        surface.resize(5, 5);
        surface.clear();
        assert_eq!(surface.clear_count(), 1);
        assert_eq!(surface.image().dimensions(), (5, 5));
        assert!(surface.image().pixels().all(|pixel| pixel.0 == [0; 4]));
    }
}
