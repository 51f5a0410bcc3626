use std::sync::Arc;

use crate::error::{RenderError, Result};

use super::desc::{FontDesc, FontFlags};
use super::rasterizer::{FontRasterizer, GlyphBitmap, GlyphMetrics, GlyphRange};

/// Opaque handle to a face loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

struct Face {
    family: String,
    flags: FontFlags,
    font: Arc<fontdue::Font>,
}

/// Registry of parsed font faces, looked up by family and style flags.
///
/// Faces are immutable after loading and shared with every rasterizer
/// handed out for them.
#[derive(Default)]
pub struct FontSystem {
    faces: Vec<Face>,
}

impl FontSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TrueType or OpenType face and registers it as `family` with
    /// the given style.
    pub fn load_font(&mut self, family: &str, flags: FontFlags, bytes: &[u8]) -> Result<FontId> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| RenderError::Configuration(format!("font '{family}': {e}")))?;

        let id = FontId(self.faces.len());
        self.faces.push(Face {
            family: family.to_string(),
            flags,
            font: Arc::new(font),
        });
        log::debug!("font '{family}' ({flags:?}) loaded as {id:?}");
        Ok(id)
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Rasterizer for the face matching `desc`.
    ///
    /// An exact style match wins; otherwise the family's first face is used.
    pub fn rasterizer(&self, desc: &FontDesc) -> Result<FontdueRasterizer> {
        let in_family = || self.faces.iter().filter(|f| f.family == desc.family);

        let face = in_family()
            .find(|f| f.flags == desc.flags)
            .or_else(|| {
                let fallback = in_family().next();
                if fallback.is_some() {
                    log::debug!(
                        "font '{}' has no {:?} face; using the first loaded face",
                        desc.family,
                        desc.flags
                    );
                }
                fallback
            })
            .ok_or_else(|| RenderError::Configuration(format!("unknown font family '{}'", desc.family)))?;

        Ok(FontdueRasterizer { font: Arc::clone(&face.font) })
    }
}

/// [`FontRasterizer`] backed by a fontdue face.
///
/// Cells are `ceil(advance)` wide and as tall as the face's line
/// (ascent to descent); the glyph sits on the baseline inside its cell.
#[derive(Clone)]
pub struct FontdueRasterizer {
    font: Arc<fontdue::Font>,
}

impl FontdueRasterizer {
    pub fn new(font: fontdue::Font) -> Self {
        Self { font: Arc::new(font) }
    }

    fn line(&self, px: f32) -> LineBox {
        match self.font.horizontal_line_metrics(px) {
            Some(lm) => LineBox::new(lm.ascent, lm.descent),
            None => LineBox::new(px, 0.0),
        }
    }
}

impl FontRasterizer for FontdueRasterizer {
    fn enumerate_ranges(&self) -> Vec<GlyphRange> {
        let mut chars: Vec<char> = self.font.chars().keys().copied().collect();
        chars.sort_unstable();
        collapse_ranges(&chars)
    }

    fn measure(&self, ch: char, px: f32) -> Option<GlyphMetrics> {
        if px <= 0.0 || self.font.lookup_glyph_index(ch) == 0 {
            return None;
        }
        let metrics = self.font.metrics(ch, px);
        Some(GlyphMetrics {
            width: cell_width(metrics.advance_width),
            height: self.line(px).height,
        })
    }

    fn render(&self, ch: char, px: f32) -> Option<GlyphBitmap> {
        let cell = self.measure(ch, px)?;
        let line = self.line(px);
        let (m, bitmap) = self.font.rasterize(ch, px);

        let raster = Raster {
            xmin: m.xmin,
            ymin: m.ymin,
            width: m.width as u32,
            height: m.height as u32,
            coverage: &bitmap,
        };
        Some(place_on_baseline(cell, line.ascent, &raster))
    }
}

/// Vertical extent of a face's line in whole pixels.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct LineBox {
    /// Baseline offset from the top of the cell.
    ascent: i32,
    height: u32,
}

impl LineBox {
    /// `descent` is negative below the baseline, as fontdue reports it.
    fn new(ascent: f32, descent: f32) -> Self {
        Self {
            ascent: ascent.ceil() as i32,
            height: (ascent - descent).ceil().max(1.0) as u32,
        }
    }
}

fn cell_width(advance: f32) -> u32 {
    (advance.ceil() as u32).max(1)
}

/// Collapses sorted characters into runs of consecutive code points.
fn collapse_ranges(sorted: &[char]) -> Vec<GlyphRange> {
    let mut ranges: Vec<GlyphRange> = Vec::new();
    for &ch in sorted {
        match ranges.last_mut() {
            Some(r) if r.low as u32 + r.count == ch as u32 => r.count += 1,
            _ => ranges.push(GlyphRange { low: ch, count: 1 }),
        }
    }
    ranges
}

/// Glyph coverage as produced by the rasterizer, positioned relative to the
/// pen on the baseline.
struct Raster<'a> {
    xmin: i32,
    /// Offset of the bitmap's bottom edge above the baseline.
    ymin: i32,
    width: u32,
    height: u32,
    coverage: &'a [u8],
}

/// Copies `raster` into a `cell`-sized bitmap whose baseline is `ascent`
/// rows from the top. Coverage outside the cell is dropped.
fn place_on_baseline(cell: GlyphMetrics, ascent: i32, raster: &Raster<'_>) -> GlyphBitmap {
    let (cell_w, cell_h) = (cell.width as i32, cell.height as i32);
    let mut coverage = vec![0u8; cell.width as usize * cell.height as usize];

    let top = ascent - (raster.height as i32 + raster.ymin);
    for row in 0..raster.height as i32 {
        let y = top + row;
        if !(0..cell_h).contains(&y) {
            continue;
        }
        for col in 0..raster.width as i32 {
            let x = raster.xmin + col;
            if !(0..cell_w).contains(&x) {
                continue;
            }
            coverage[(y * cell_w + x) as usize] =
                raster.coverage[(row * raster.width as i32 + col) as usize];
        }
    }

    GlyphBitmap {
        width: cell.width,
        height: cell.height,
        coverage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_rejected() {
        let mut fonts = FontSystem::new();
        let err = fonts.load_font("junk", FontFlags::empty(), &[0, 1, 2, 3]);
        assert!(matches!(err, Err(RenderError::Configuration(_))));
        assert!(fonts.is_empty());
    }

    #[test]
    fn unknown_family_is_a_configuration_error() {
        let fonts = FontSystem::new();
        let err = fonts.rasterizer(&FontDesc::new("missing", 12));
        assert!(matches!(err, Err(RenderError::Configuration(_))));
    }

    #[test]
    fn sorted_chars_collapse_into_runs() {
        let chars: Vec<char> = "ABCDxyz".chars().chain(['~']).collect();
        assert_eq!(
            collapse_ranges(&chars),
            vec![
                GlyphRange { low: 'A', count: 4 },
                GlyphRange { low: 'x', count: 3 },
                GlyphRange { low: '~', count: 1 },
            ]
        );
    }

    #[test]
    fn single_and_empty_inputs() {
        assert_eq!(collapse_ranges(&['q']), vec![GlyphRange { low: 'q', count: 1 }]);
        assert!(collapse_ranges(&[]).is_empty());
        // a gap of one code point splits the run
        assert_eq!(collapse_ranges(&['a', 'c']).len(), 2);
    }

    #[test]
    fn cells_round_up_to_whole_pixels() {
        assert_eq!(cell_width(7.2), 8);
        assert_eq!(cell_width(0.0), 1);

        let line = LineBox::new(11.3, -3.4);
        assert_eq!(line.ascent, 12);
        assert_eq!(line.height, 15);
        assert_eq!(LineBox::new(0.0, 0.0).height, 1);
    }

    #[test]
    fn coverage_sits_on_the_baseline() {
        // 2x3 glyph whose bottom row is one pixel below the baseline
        let raster = Raster {
            xmin: 1,
            ymin: -1,
            width: 2,
            height: 3,
            coverage: &[1, 2, 3, 4, 5, 6],
        };
        let cell = GlyphMetrics { width: 4, height: 6 };
        let bitmap = place_on_baseline(cell, 4, &raster);

        assert_eq!((bitmap.width, bitmap.height), (4, 6));
        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            0, 0, 0, 0,
            0, 0, 0, 0,
            0, 1, 2, 0,
            0, 3, 4, 0,
            0, 5, 6, 0, // under the baseline
            0, 0, 0, 0,
        ];
        assert_eq!(bitmap.coverage, expected);
    }

    #[test]
    fn coverage_outside_the_cell_is_clipped() {
        let raster = Raster {
            xmin: -1,
            ymin: 0,
            width: 3,
            height: 4,
            coverage: &[9; 12],
        };
        let cell = GlyphMetrics { width: 2, height: 3 };
        let bitmap = place_on_baseline(cell, 2, &raster);
        // rows -2..2, columns -1..2: only rows 0..2 and columns 0..2 survive
        assert_eq!(bitmap.coverage, vec![9, 9, 9, 9, 0, 0]);
    }
}
