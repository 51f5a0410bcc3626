use super::{Vec2, Viewport};

/// Axis-aligned rectangle in logical pixels (top-left origin).
///
/// Used for scissor regions; the render queue stores one per
/// `DrawCall::Scissor`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Flips negative extents so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let (x, w) = if self.size.x < 0.0 {
            (self.origin.x + self.size.x, -self.size.x)
        } else {
            (self.origin.x, self.size.x)
        };
        let (y, h) = if self.size.y < 0.0 {
            (self.origin.y + self.size.y, -self.size.y)
        } else {
            (self.origin.y, self.size.y)
        };
        Rect::new(x, y, w, h)
    }

    /// Maps the rectangle to a physical-pixel scissor `(x, y, w, h)` clamped
    /// to `viewport * scale`.
    ///
    /// Returns `None` when nothing of the rectangle is left on screen.
    pub fn to_scissor(self, viewport: Viewport, scale: f32) -> Option<(u32, u32, u32, u32)> {
        let r = self.normalized();
        let phys_w = (viewport.width * scale).max(1.0) as u32;
        let phys_h = (viewport.height * scale).max(1.0) as u32;

        let x0 = ((r.origin.x * scale).max(0.0) as u32).min(phys_w);
        let y0 = ((r.origin.y * scale).max(0.0) as u32).min(phys_h);
        let x1 = ((r.max().x * scale).max(0.0) as u32).min(phys_w);
        let y1 = ((r.max().y * scale).max(0.0) as u32).min(phys_h);

        let (w, h) = (x1.saturating_sub(x0), y1.saturating_sub(y0));
        if w == 0 || h == 0 { None } else { Some((x0, y0, w, h)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect { Rect::new(x, y, w, h) }

    const VP: Viewport = Viewport::new(100.0, 50.0);

    // ── normalized ────────────────────────────────────────────────────────

    #[test]
    fn normalized_positive_is_identity() {
        let rect = r(1.0, 2.0, 10.0, 20.0);
        assert_eq!(rect.normalized(), rect);
    }

    #[test]
    fn normalized_negative_extents() {
        let n = r(10.0, 10.0, -4.0, -3.0).normalized();
        assert_eq!(n, r(6.0, 7.0, 4.0, 3.0));
    }

    // ── to_scissor ────────────────────────────────────────────────────────

    #[test]
    fn scissor_inside_viewport_is_scaled() {
        assert_eq!(r(10.0, 5.0, 20.0, 10.0).to_scissor(VP, 2.0), Some((20, 10, 40, 20)));
    }

    #[test]
    fn scissor_is_clamped_to_viewport() {
        assert_eq!(r(-10.0, 40.0, 200.0, 100.0).to_scissor(VP, 1.0), Some((0, 40, 100, 10)));
    }

    #[test]
    fn scissor_outside_viewport_is_none() {
        assert!(r(150.0, 0.0, 10.0, 10.0).to_scissor(VP, 1.0).is_none());
    }

    #[test]
    fn zero_area_scissor_is_none() {
        assert!(r(5.0, 5.0, 0.0, 10.0).to_scissor(VP, 1.0).is_none());
        assert!(r(5.0, 5.0, 0.0, 10.0).is_empty());
    }
}
