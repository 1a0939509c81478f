use crate::complex::Complex;
use crate::error::CoreError;

/// Pixel dimensions of the render target and the screen → fractal mapping.
///
/// `zoom` is the fractal-plane distance from the view centre to the nearer
/// screen edge, so one pixel spans `2·zoom / min(width, height)` units. The
/// mapping rotates screen offsets by the view rotation before they reach the
/// fractal plane; pixel `y` grows downward while the imaginary axis grows
/// upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Viewport width in pixels.
    pub width: u32,

    /// Viewport height in pixels.
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidViewport {
                reason: format!("dimensions must be > 0, got {width}×{height}"),
            });
        }
        Ok(Self { width, height })
    }

    /// Fractal units spanned by one pixel at `zoom`.
    #[inline]
    pub fn units_per_pixel(&self, zoom: f64) -> f64 {
        2.0 * zoom / f64::from(self.width.min(self.height))
    }

    /// Map a screen-space displacement (pixels) to a fractal-plane displacement.
    #[inline]
    pub fn screen_delta_to_fractal(&self, dx: f64, dy: f64, zoom: f64, rotation: f64) -> Complex {
        let scale = self.units_per_pixel(zoom);
        Complex::new(dx * scale, -dy * scale).rotated(rotation)
    }

    /// Offset of a pixel centre from the view centre, in fractal units.
    #[inline]
    pub fn pixel_offset(&self, px: f64, py: f64, zoom: f64, rotation: f64) -> Complex {
        let half_w = f64::from(self.width) / 2.0;
        let half_h = f64::from(self.height) / 2.0;
        self.screen_delta_to_fractal(px + 0.5 - half_w, py + 0.5 - half_h, zoom, rotation)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}
