//! Viewport size and the render target derived from it.

/// Device pixel density above this is ignored; the drawing buffer never
/// exceeds twice the CSS size.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

fn sanitised(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 }
}

/// The visible area in logical (CSS) pixels, the display's density, and the
/// size of the window surface in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f64,
    pub physical_width: u32,
    pub physical_height: u32,
}

impl Viewport {
    /// A viewport given in logical pixels.
    pub fn new(width: u32, height: u32, device_pixel_ratio: f64) -> Self {
        let ratio = sanitised(device_pixel_ratio);
        let scale = |v: u32| (v as f64 * ratio).round() as u32;
        Self {
            width,
            height,
            device_pixel_ratio: ratio,
            physical_width: scale(width),
            physical_height: scale(height),
        }
    }

    /// A viewport given in physical pixels, as windows report their size.
    pub fn from_physical(width: u32, height: u32, device_pixel_ratio: f64) -> Self {
        let ratio = sanitised(device_pixel_ratio);
        let scale = |v: u32| (v as f64 / ratio).round() as u32;
        Self {
            width: scale(width),
            height: scale(height),
            device_pixel_ratio: ratio,
            physical_width: width,
            physical_height: height,
        }
    }

    pub fn from_window(window: &winit::window::Window) -> Self {
        let size = window.inner_size();
        Self::from_physical(size.width, size.height, window.scale_factor())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.physical_width == 0 || self.physical_height == 0
    }
}

/// Output size and pixel density the scene is drawn at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderTarget {
    width: u32,
    height: u32,
    pixel_ratio: f64,
    buffer: (u32, u32),
}

impl RenderTarget {
    /// The drawing buffer matches the window surface exactly unless the
    /// display is denser than [`MAX_PIXEL_RATIO`], in which case it is scaled
    /// down to the cap.
    pub fn new(viewport: Viewport) -> Self {
        let ratio = viewport.device_pixel_ratio;
        let (pw, ph) = (viewport.physical_width, viewport.physical_height);
        let buffer = if ratio <= MAX_PIXEL_RATIO {
            (pw, ph)
        } else {
            let shrink = |v: u32| (v as f64 * MAX_PIXEL_RATIO / ratio).round() as u32;
            (shrink(pw), shrink(ph))
        };
        Self {
            width: viewport.width.max(1),
            height: viewport.height.max(1),
            pixel_ratio: ratio.min(MAX_PIXEL_RATIO),
            buffer: (buffer.0.max(1), buffer.1.max(1)),
        }
    }

    /// Applies a new viewport. Returns `false` when nothing changed, which
    /// includes zero-sized viewports: those are ignored.
    pub fn resize(&mut self, viewport: Viewport) -> bool {
        if viewport.is_empty() {
            return false;
        }
        let next = Self::new(viewport);
        if next == *self {
            return false;
        }
        *self = next;
        true
    }

    /// Logical size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Size of the surface actually rendered to, in physical pixels.
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped() {
        let target = RenderTarget::new(Viewport::new(800, 600, 3.0));
        assert_eq!(target.pixel_ratio(), 2.0);
        assert_eq!(target.drawing_buffer_size(), (1600, 1200));
    }

    #[test]
    fn low_density_is_kept() {
        let target = RenderTarget::new(Viewport::new(800, 600, 1.5));
        assert_eq!(target.drawing_buffer_size(), (1200, 900));
    }

    #[test]
    fn buffer_matches_odd_physical_sizes() {
        let viewport = Viewport::from_physical(1001, 701, 1.5);
        assert_eq!(viewport.width, 667);
        let target = RenderTarget::new(viewport);
        assert_eq!(target.drawing_buffer_size(), (1001, 701));
    }

    #[test]
    fn dense_physical_sizes_shrink_to_the_cap() {
        let target = RenderTarget::new(Viewport::from_physical(3000, 1500, 3.0));
        assert_eq!(target.size(), (1000, 500));
        assert_eq!(target.drawing_buffer_size(), (2000, 1000));
    }

    #[test]
    fn zero_viewport_is_ignored() {
        let mut target = RenderTarget::new(Viewport::new(800, 600, 1.0));
        assert!(!target.resize(Viewport::new(0, 600, 1.0)));
        assert!(!target.resize(Viewport::from_physical(800, 0, 1.0)));
        assert_eq!(target.size(), (800, 600));
    }

    #[test]
    fn invalid_ratio_falls_back_to_one() {
        let viewport = Viewport::new(640, 480, f64::NAN);
        assert_eq!(viewport.device_pixel_ratio, 1.0);
        assert_eq!(RenderTarget::new(viewport).drawing_buffer_size(), (640, 480));
    }
}
