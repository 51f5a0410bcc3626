/// Contiguous run of characters a font can map: `low ..= low + count - 1`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GlyphRange {
    pub low: char,
    pub count: u32,
}

impl GlyphRange {
    pub fn chars(self) -> impl Iterator<Item = char> {
        let start = self.low as u32;
        (start..start.saturating_add(self.count)).filter_map(char::from_u32)
    }
}

/// Size of a glyph cell in pixels at a given pixel height.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GlyphMetrics {
    pub width: u32,
    pub height: u32,
}

/// 8-bit coverage of one glyph cell, row-major, `width * height` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
}

/// Font rasterization service used to build glyph atlases.
///
/// Cells returned by `measure` and `render` for the same character and
/// pixel size must have the same dimensions.
pub trait FontRasterizer {
    /// Character ranges the font covers.
    fn enumerate_ranges(&self) -> Vec<GlyphRange>;

    /// Cell size of `ch` at pixel height `px`; `None` when the font cannot
    /// produce the character.
    fn measure(&self, ch: char, px: f32) -> Option<GlyphMetrics>;

    fn render(&self, ch: char, px: f32) -> Option<GlyphBitmap>;
}
