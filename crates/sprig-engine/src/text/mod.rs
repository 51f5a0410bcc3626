//! Fonts and glyph atlases.
//!
//! A [`GlyphAtlas`] rasterizes a font's whole alphabet once through a
//! [`FontRasterizer`]; text is then drawn as textured quads by the render
//! queue. [`FontSystem`] supplies fontdue-backed rasterizers.

mod desc;
mod font_system;
mod glyph_atlas;
mod rasterizer;

pub use desc::{FontDesc, FontFlags, FontQuality, TextAlign};
pub use font_system::{FontId, FontSystem, FontdueRasterizer};
pub use glyph_atlas::{AtlasState, GlyphAtlas, GlyphEntry};
pub use rasterizer::{FontRasterizer, GlyphBitmap, GlyphMetrics, GlyphRange};
