use crate::coords::Vec2;

/// Texture-space rectangle normalized to `[0, 1]`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct UvRect {
    pub u_min: f32,
    pub v_min: f32,
    pub u_max: f32,
    pub v_max: f32,
}

impl UvRect {
    pub const FULL: UvRect = UvRect::new(0.0, 0.0, 1.0, 1.0);
    pub const ZERO: UvRect = UvRect::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(u_min: f32, v_min: f32, u_max: f32, v_max: f32) -> Self {
        Self { u_min, v_min, u_max, v_max }
    }

    /// UVs of the pixel block `(x, y, width, height)` in a
    /// `texture_width x texture_height` texture.
    pub fn from_pixels(x: u32, y: u32, width: u32, height: u32, texture_width: u32, texture_height: u32) -> Self {
        let tw = texture_width.max(1) as f32;
        let th = texture_height.max(1) as f32;
        Self::new(
            x as f32 / tw,
            y as f32 / th,
            (x + width) as f32 / tw,
            (y + height) as f32 / th,
        )
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        Vec2::new(self.u_min, self.v_min)
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        Vec2::new(self.u_max, self.v_max)
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}
