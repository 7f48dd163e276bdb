//! Viewport state and the pixel-to-complex-plane mapping.

use num_complex::Complex64;

use crate::ShaderMode;

/// Default number of column-striped workers per render.
pub const DEFAULT_PARALLELISM: usize = 2;
/// Default iteration cap.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Mutable view state owned by the interaction controller.
///
/// The renderer never reads this value after [`Renderer::render()`] returns; it takes
/// a [`RenderConfig`] snapshot instead. Hence, the controller is free to keep mutating
/// the state while a render is in flight.
///
/// [`Renderer::render()`]: crate::Renderer::render()
/// [`RenderConfig`]: crate::RenderConfig
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    pub(crate) scale: f64,
    pub(crate) pan: [f64; 2],
    pub(crate) shader: ShaderMode,
    pub(crate) max_iterations: u32,
    pub(crate) parallelism: usize,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportState {
    /// Creates the initial view: scale `1`, no pan, [`ShaderMode::Blue`],
    /// 100 iterations and 2 workers.
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            pan: [0.0, 0.0],
            shader: ShaderMode::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            parallelism: DEFAULT_PARALLELISM,
        }
    }

    /// Sets the zoom factor. Validity is checked when a render is requested.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the pan offsets.
    pub fn with_pan(mut self, pan: [f64; 2]) -> Self {
        self.pan = pan;
        self
    }

    /// Sets the shader mode.
    pub fn with_shader(mut self, shader: ShaderMode) -> Self {
        self.shader = shader;
        self
    }

    /// Sets the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the number of column-striped workers.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Returns the zoom factor.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Returns the pan offsets.
    pub fn pan(&self) -> [f64; 2] {
        self.pan
    }

    /// Returns the shader mode.
    pub fn shader(&self) -> ShaderMode {
        self.shader
    }

    /// Returns the iteration cap.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Returns the number of column-striped workers.
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Shifts the view so that the image moves by `dx`, `dy` pixels at the current scale.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan[0] += dx / self.scale;
        self.pan[1] += dy / self.scale;
    }

    /// Multiplies the zoom factor by `factor`, keeping the pan offsets.
    pub fn zoom_by(&mut self, factor: f64) {
        self.scale *= factor;
    }
}

/// Affine mapping from pixel coordinates to the complex plane.
///
/// The mapping is
///
/// ```text
/// width_scalar  = 3.5 / s
/// height_scalar = (3.5 * H / W) / s
/// x0 = (width_scalar / W) * (Px - dx * s) - width_scalar / 1.4
/// y0 = (height_scalar / H) * (Py - dy * s) - height_scalar / 2
/// ```
///
/// With no pan and `s == 1`, the image spans `[-2.5, 1]` along the real axis and is
/// vertically centered at `0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    image_size: [f64; 2],
    scale: f64,
    pan: [f64; 2],
    width_scalar: f64,
    height_scalar: f64,
}

impl ViewportTransform {
    /// Creates a transform for an image of `image_size` pixels.
    pub fn new(image_size: [u32; 2], scale: f64, pan: [f64; 2]) -> Self {
        let [width, height] = [f64::from(image_size[0]), f64::from(image_size[1])];
        Self {
            image_size: [width, height],
            scale,
            pan,
            width_scalar: 3.5 / scale,
            height_scalar: (3.5 * height / width) / scale,
        }
    }

    /// Width of the visible region of the complex plane.
    pub fn width_scalar(&self) -> f64 {
        self.width_scalar
    }

    /// Height of the visible region of the complex plane. Interaction logic needs it
    /// to invert the mapping (e.g., when zooming towards a clicked point).
    pub fn height_scalar(&self) -> f64 {
        self.height_scalar
    }

    /// Maps the pixel at column `px` and row `py` to the complex plane.
    #[inline]
    pub fn map_pixel(&self, px: u32, py: u32) -> Complex64 {
        let [width, height] = self.image_size;
        let tx = f64::from(px) - self.pan[0] * self.scale;
        let ty = f64::from(py) - self.pan[1] * self.scale;

        let re = (self.width_scalar / width) * tx - self.width_scalar / 1.4;
        let im = (self.height_scalar / height) * ty - self.height_scalar / 2.0;
        Complex64::new(re, im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(x: Complex64, y: Complex64) {
        assert!((x.re - y.re).abs() <= 1e-12, "{x:?}, {y:?}");
        assert!((x.im - y.im).abs() <= 1e-12, "{x:?}, {y:?}");
    }

    #[test]
    fn mapping_pixels() {
        let transform = ViewportTransform::new([350, 200], 1.0, [0.0, 0.0]);
        assert_close(transform.map_pixel(0, 0), Complex64::new(-2.5, -1.0));
        assert_close(transform.map_pixel(100, 100), Complex64::new(-1.5, 0.0));
        assert_close(transform.map_pixel(350, 200), Complex64::new(1.0, 1.0));
        assert!((transform.height_scalar() - 2.0).abs() <= 1e-12);
    }

    #[test]
    fn mapping_with_scale_and_pan() {
        let transform = ViewportTransform::new([350, 350], 2.0, [10.0, -5.0]);
        assert!((transform.width_scalar() - 1.75).abs() <= 1e-12);
        assert!((transform.height_scalar() - 1.75).abs() <= 1e-12);

        // Panned pixel (20, 0) shows what unpanned pixel (0, 10) did.
        let unpanned = ViewportTransform::new([350, 350], 2.0, [0.0, 0.0]);
        assert_close(transform.map_pixel(20, 0), unpanned.map_pixel(0, 10));
    }

    #[test]
    fn mapping_is_affine_in_pixel_coordinates() {
        let transform = ViewportTransform::new([640, 480], 3.7, [12.5, -40.25]);
        let step = transform.map_pixel(2, 7) - transform.map_pixel(1, 7);
        for px in [3, 50, 320, 639] {
            let other_step = transform.map_pixel(2 * px, 7) - transform.map_pixel(px, 7);
            let expected = step * f64::from(px);
            assert_close(other_step, expected);
        }

        let row_step = transform.map_pixel(5, 11) - transform.map_pixel(5, 10);
        assert_close(row_step, Complex64::new(0.0, transform.height_scalar() / 480.0));
    }

    #[test]
    fn panning_moves_image_by_pixels() {
        let mut state = ViewportState::new().with_scale(4.0);
        state.pan_by(8.0, -4.0);
        assert_eq!(state.pan(), [2.0, -1.0]);

        let panned = ViewportTransform::new([100, 100], state.scale(), state.pan());
        let original = ViewportTransform::new([100, 100], 4.0, [0.0, 0.0]);
        assert_close(panned.map_pixel(18, 6), original.map_pixel(10, 10));

        state.zoom_by(0.5);
        assert_eq!(state.scale(), 2.0);
        assert_eq!(state.pan(), [2.0, -1.0]);
    }
}
