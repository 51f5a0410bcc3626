use bytemuck::{Pod, Zeroable};

/// Straight-alpha RGBA color, one byte per channel.
///
/// Layout matches the vertex attribute `Unorm8x4`, so a `Color` is written
/// into vertices as-is. Premultiplication happens in the batch shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Per-channel linear interpolation; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8
        };
        Color::rgba(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    /// Opaque color from hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Color {
        let hue = hue.rem_euclid(360.0);
        let saturation = saturation.clamp(0.0, 1.0);
        let value = value.clamp(0.0, 1.0);

        let c = saturation * value;
        let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
        let m = value - c;

        let (r, g, b) = match hue {
            h if h < 60.0 => (c, x, 0.0),
            h if h < 120.0 => (x, c, 0.0),
            h if h < 180.0 => (0.0, c, x),
            h if h < 240.0 => (0.0, x, c),
            h if h < 300.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Color::rgb(to_u8(r), to_u8(g), to_u8(b))
    }

    /// Returns `[hue, saturation, value]`; alpha is ignored.
    pub fn to_hsv(self) -> [f32; 3] {
        let r = self.r as f32 / 255.0;
        let g = self.g as f32 / 255.0;
        let b = self.b as f32 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let diff = max - min;

        if diff <= 0.0 {
            return [0.0, 0.0, max];
        }

        let hue = if max == r {
            (60.0 * ((g - b) / diff) + 360.0) % 360.0
        } else if max == g {
            (60.0 * ((b - r) / diff) + 120.0) % 360.0
        } else {
            (60.0 * ((r - g) / diff) + 240.0) % 360.0
        };

        [hue, diff / max, max]
    }

    /// Clear color for a render pass, in straight alpha.
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64 / 255.0,
            g: self.g as f64 / 255.0,
            b: self.b as f64 / 255.0,
            a: self.a as f64 / 255.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: u8, b: u8) -> bool {
        a.abs_diff(b) <= 1
    }

    #[test]
    fn default_is_opaque_white() {
        assert_eq!(Color::default(), Color::rgba(255, 255, 255, 255));
    }

    #[test]
    fn layout_is_four_bytes_in_rgba_order() {
        let c = Color::rgba(1, 2, 3, 4);
        assert_eq!(bytemuck::bytes_of(&c), &[1, 2, 3, 4]);
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let a = Color::rgba(0, 100, 200, 255);
        let b = Color::rgba(200, 100, 0, 55);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Color::rgba(100, 100, 100, 155));
    }

    #[test]
    fn lerp_clamps_t() {
        let a = Color::BLACK;
        let b = Color::WHITE;
        assert_eq!(a.lerp(b, 4.0), b);
        assert_eq!(a.lerp(b, -1.0), a);
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(Color::from_hsv(0.0, 1.0, 1.0), Color::rgb(255, 0, 0));
        assert_eq!(Color::from_hsv(120.0, 1.0, 1.0), Color::rgb(0, 255, 0));
        assert_eq!(Color::from_hsv(240.0, 1.0, 1.0), Color::rgb(0, 0, 255));
        assert_eq!(Color::from_hsv(90.0, 0.0, 0.0), Color::BLACK);
    }

    #[test]
    fn hsv_round_trip_is_close() {
        for c in [
            Color::rgb(255, 128, 0),
            Color::rgb(12, 200, 90),
            Color::rgb(80, 80, 220),
            Color::rgb(190, 40, 160),
        ] {
            let [h, s, v] = c.to_hsv();
            let back = Color::from_hsv(h, s, v);
            assert!(close(back.r, c.r) && close(back.g, c.g) && close(back.b, c.b), "{c:?} -> {back:?}");
        }
    }

    #[test]
    fn grey_has_no_hue_or_saturation() {
        let [h, s, v] = Color::rgb(128, 128, 128).to_hsv();
        assert_eq!((h, s), (0.0, 0.0));
        assert!((v - 128.0 / 255.0).abs() < 1e-6);
    }
}
