/// Drawable size in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    #[inline]
    pub fn aspect(self) -> f32 {
        if self.is_valid() { self.width / self.height } else { 1.0 }
    }
}

/// Sub-rectangle of a render target, in physical pixels (top-left origin).
///
/// Passed straight to `RenderPass::set_viewport`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ViewportRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewportRect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width < 1.0 || self.height < 1.0
    }

    #[inline]
    pub fn aspect(self) -> f32 {
        if self.is_empty() { 1.0 } else { self.width / self.height }
    }

    /// Top-right inset covering a quarter of each axis, `margin` pixels from the edges.
    ///
    /// Used for the second viewport. Collapses to an empty rect when the
    /// target is too small to hold it.
    pub fn inset_quarter(target: Viewport, margin: f32) -> Self {
        let w = (target.width * 0.25).floor();
        let h = (target.height * 0.25).floor();
        let x = target.width - w - margin;
        let y = margin;

        if x < 0.0 || w < 1.0 || h < 1.0 || y + h > target.height {
            return Self::default();
        }

        Self::new(x, y, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inset_quarter_sits_top_right() {
        let r = ViewportRect::inset_quarter(Viewport::new(800.0, 600.0), 10.0);
        assert_eq!(r, ViewportRect::new(590.0, 10.0, 200.0, 150.0));
        assert!((r.aspect() - 800.0 / 600.0).abs() < 1e-4);
    }

    #[test]
    fn inset_quarter_collapses_on_tiny_targets() {
        let r = ViewportRect::inset_quarter(Viewport::new(3.0, 3.0), 10.0);
        assert!(r.is_empty());
    }

    #[test]
    fn invalid_viewport_has_unit_aspect() {
        assert_eq!(Viewport::new(0.0, 600.0).aspect(), 1.0);
        assert_eq!(Viewport::new(f32::NAN, 600.0).aspect(), 1.0);
    }
}
