use crate::backend::GpuBackend;
use crate::coords::Vec2;
use crate::paint::Color;
use crate::render::vertex::Vertex;
use crate::text::{FontRasterizer, GlyphAtlas, TextAlign};

use super::RenderQueue;

/// Space and C0 controls advance the pen without producing a quad.
#[inline]
fn draws_glyph(ch: char) -> bool {
    ch > ' '
}

/// Offset applied to the run origin for `align`, given the run's extent.
pub(crate) fn alignment_offset(align: TextAlign, extent: Vec2) -> Vec2 {
    let x = if align.contains(TextAlign::CENTER_X) {
        (0.5 * extent.x).floor()
    } else if align.contains(TextAlign::RIGHT) {
        extent.x.floor()
    } else {
        0.0
    };
    let y = if align.contains(TextAlign::CENTER_Y) {
        (0.5 * extent.y).floor()
    } else if align.contains(TextAlign::BOTTOM) {
        extent.y.floor()
    } else {
        0.0
    };
    Vec2::new(x, y)
}

impl<B: GpuBackend> RenderQueue<B> {
    /// Lays out `text` with `font` starting at `position`.
    ///
    /// Every glyph samples the font's single atlas texture, so a run joins
    /// the preceding batch when that batch uses the same texture. Nothing is
    /// drawn while the font has no live texture.
    pub fn push_text<R: FontRasterizer>(
        &mut self,
        font: &GlyphAtlas<B, R>,
        position: Vec2,
        text: &str,
        color: Color,
        align: TextAlign,
    ) {
        let Some(texture) = font.texture() else {
            log::debug!("push_text: font '{}' has no texture; skipped", font.desc().family);
            return;
        };

        let origin = if align.is_empty() {
            position
        } else {
            position - alignment_offset(align, font.text_extent(text))
        };

        let line_height = font.line_height();
        let mut pen = origin;

        for ch in text.chars() {
            if ch == '\n' {
                pen.x = origin.x;
                pen.y += line_height;
                continue;
            }

            let advance = font.advance_for(ch);

            if draws_glyph(ch) {
                if let Some(glyph) = font.glyph(ch) {
                    let uv = glyph.uv;
                    let max = pen + Vec2::new(advance, glyph.height as f32 / font.scale());
                    self.push_quad(
                        Some(texture),
                        [
                            Vertex::new(pen, color, uv.min()),
                            Vertex::new(Vec2::new(max.x, pen.y), color, Vec2::new(uv.u_max, uv.v_min)),
                            Vertex::new(max, color, uv.max()),
                            Vertex::new(Vec2::new(pen.x, max.y), color, Vec2::new(uv.u_min, uv.v_max)),
                        ],
                    );
                }
            }

            pen.x += advance;
        }
    }
}
