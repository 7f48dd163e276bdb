//! Mapping of escape intensities to RGBA colors.

use image::Rgba;

use std::fmt;

use crate::Error;

/// Strategy converting a normalized escape intensity in `[0, 1)` to a pixel color.
pub trait Shade {
    /// Returns the color for `intensity`.
    fn shade(&self, intensity: f64) -> Rgba<u8>;
}

impl<T: Shade + ?Sized> Shade for &T {
    #[inline]
    fn shade(&self, intensity: f64) -> Rgba<u8> {
        (**self).shade(intensity)
    }
}

/// Converts a `[0, 1]` channel value to a byte, clamping out-of-range values. NaN maps to 0.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(value: f64) -> u8 {
    (value * 255.0).clamp(0.0, 255.0).round() as u8
}

/// Blue-tinted logarithmic ramp. Points in the set are black.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blue;

impl Shade for Blue {
    #[inline]
    fn shade(&self, intensity: f64) -> Rgba<u8> {
        let red_green = intensity * (-0.25 * (-intensity / 11.112_347 + 0.09).ln() - 0.25);
        let blue = intensity * (1.0 - 2.4 * (intensity + 1e-10).ln());
        let red_green = channel(red_green);
        Rgba([red_green, red_green, channel(blue), u8::MAX])
    }
}

/// Linear grayscale ramp. Points in the set are black.
#[derive(Debug, Clone, Copy, Default)]
pub struct White;

impl Shade for White {
    #[inline]
    fn shade(&self, intensity: f64) -> Rgba<u8> {
        let luma = channel(intensity);
        Rgba([luma, luma, luma, u8::MAX])
    }
}

/// Coloring mode selected by the viewport controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ShaderMode {
    /// [`Blue`] shader.
    #[default]
    Blue,
    /// [`White`] shader.
    White,
    /// Histogram-equalized coloring. Not implemented.
    Histogram,
    /// Intensity histogram coloring. Not implemented.
    IntensityHistogram,
}

impl ShaderMode {
    /// Parses a mode from its name (case-insensitive). Unrecognized names fall back
    /// to the default mode, [`Self::Blue`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "blue" => Self::Blue,
            "white" => Self::White,
            "histogram" => Self::Histogram,
            "intensity-histogram" | "intensity_histogram" | "intensityhistogram" => {
                Self::IntensityHistogram
            }
            _ => {
                tracing::debug!(name, "unrecognized shader mode, using default");
                Self::default()
            }
        }
    }

    /// Returns the canonical name of this mode.
    pub fn name(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::White => "white",
            Self::Histogram => "histogram",
            Self::IntensityHistogram => "intensity-histogram",
        }
    }

    /// Returns the shader implementing this mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedShaderMode`] for histogram modes.
    pub fn shader(self) -> Result<&'static (dyn Shade + Send + Sync), Error> {
        match self {
            Self::Blue => Ok(&Blue),
            Self::White => Ok(&White),
            Self::Histogram | Self::IntensityHistogram => Err(Error::UnsupportedShaderMode(self)),
        }
    }

    /// Colors a single `intensity` with this mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedShaderMode`] for histogram modes.
    pub fn shade(self, intensity: f64) -> Result<Rgba<u8>, Error> {
        self.shader().map(|shader| shader.shade(intensity))
    }
}

impl fmt::Display for ShaderMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}
