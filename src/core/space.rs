use glam::Vec2;

// Width of one note unit as a fraction of the viewport width (16 lanes of 0.9 width each).
pub const X_SCALE_OF_WIDTH: f32 = 0.9 / 16.0;
// One unit of floor position spans this fraction of the viewport height.
pub const Y_SCALE_OF_HEIGHT: f32 = 0.6;
// Judge lines are drawn this many viewport widths to each side of their center.
pub const LINE_LENGTH_OF_WIDTH: f32 = 3.0;

/// Pixel geometry of the playfield. Rebuilt whenever the host surface is resized;
/// every derived scale is a pure function of the two dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1600.0, height: 900.0 }
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// False for minimized or otherwise degenerate surfaces.
    #[inline(always)]
    pub fn has_area(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    #[inline(always)]
    pub fn x_scale(&self) -> f32 {
        X_SCALE_OF_WIDTH * self.width
    }

    #[inline(always)]
    pub fn y_scale(&self) -> f32 {
        Y_SCALE_OF_HEIGHT * self.height
    }

    #[inline(always)]
    pub fn line_length(&self) -> f32 {
        LINE_LENGTH_OF_WIDTH * self.width
    }

    #[inline(always)]
    pub fn center(&self) -> Vec2 {
        Vec2::new(0.5 * self.width, 0.5 * self.height)
    }

    /// Maps chart-normalized coordinates (origin bottom-left, y up) to pixels
    /// (origin top-left, y down).
    #[inline(always)]
    pub fn to_screen(&self, normalized: Vec2) -> Vec2 {
        Vec2::new(normalized.x * self.width, (1.0 - normalized.y) * self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::Viewport;
    use glam::Vec2;

    #[test]
    fn derived_scales_follow_dimensions() {
        let vp = Viewport::new(1600.0, 900.0);
        assert!((vp.x_scale() - 90.0).abs() <= 1e-4, "x scale was {}", vp.x_scale());
        assert!((vp.y_scale() - 540.0).abs() <= 1e-4, "y scale was {}", vp.y_scale());
        assert!((vp.line_length() - 4800.0).abs() <= 1e-3);
    }

    #[test]
    fn degenerate_sizes_have_no_area() {
        assert!(Viewport::default().has_area());
        assert!(!Viewport::new(0.0, 0.0).has_area());
        assert!(!Viewport::new(1280.0, -1.0).has_area());
        assert!(!Viewport::new(f32::NAN, 720.0).has_area());
    }

    #[test]
    fn normalized_origin_is_bottom_left() {
        let vp = Viewport::new(200.0, 100.0);
        assert_eq!(vp.to_screen(Vec2::new(0.0, 0.0)), Vec2::new(0.0, 100.0));
        assert_eq!(vp.to_screen(Vec2::new(0.5, 0.5)), vp.center());
        assert_eq!(vp.to_screen(Vec2::new(1.0, 1.0)), Vec2::new(200.0, 0.0));
    }
}
