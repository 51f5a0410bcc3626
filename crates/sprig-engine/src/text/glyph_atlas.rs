use std::collections::HashMap;

use crate::atlas::UvRect;
use crate::backend::{DeviceResource, GpuBackend};
use crate::coords::Vec2;
use crate::error::{RenderError, Result};

use super::desc::{FontDesc, FontQuality};
use super::rasterizer::{FontRasterizer, GlyphMetrics};

// ── build constants ────────────────────────────────────────────────────────

/// Side of the first candidate texture.
const INITIAL_SIZE: u32 = 128;
/// Horizontal gap around glyphs, as a fraction of the line height.
const SPACING_RATIO: f32 = 0.3;
/// Scale multiplier applied after each failed attempt at the device limit.
const SHRINK_RATIO: f32 = 0.9;
/// Upper bound for the doubling phase.
const MAX_DOUBLING_SIZE: u32 = 1 << 20;
/// Reference glyph for the line height.
const REFERENCE_CHAR: char = 'x';

/// Lifecycle of a [`GlyphAtlas`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AtlasState {
    Uninitialized,
    Built,
    /// Device objects released; the glyph table is still valid.
    Released,
}

/// Placement of one character in the atlas.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyphEntry {
    pub uv: UvRect,
    /// Cell size in atlas pixels.
    pub width: u32,
    pub height: u32,
}

/// Result of laying out the whole alphabet at one size.
enum Packing {
    Fits { spacing: u32, line_height: u32 },
    Overflow,
}

/// A font's alphabet rasterized into one texture.
///
/// The atlas is square. When the alphabet does not fit in the largest
/// texture the device supports, glyphs are rasterized smaller and
/// [`scale`](Self::scale) records the ratio; advances and line height are
/// divided by it so text keeps its requested size on screen.
pub struct GlyphAtlas<B: GpuBackend, R: FontRasterizer> {
    rasterizer: R,
    desc: FontDesc,
    state: AtlasState,

    glyphs: HashMap<char, GlyphEntry>,
    texture: Option<B::Texture>,

    width: u32,
    height: u32,
    spacing: u32,
    line_height: u32,
    scale: f32,
}

impl<B: GpuBackend, R: FontRasterizer> GlyphAtlas<B, R> {
    pub fn new(rasterizer: R, desc: FontDesc) -> Self {
        Self {
            rasterizer,
            desc,
            state: AtlasState::Uninitialized,
            glyphs: HashMap::new(),
            texture: None,
            width: 0,
            height: 0,
            spacing: 0,
            line_height: 0,
            scale: 1.0,
        }
    }

    /// Builds the atlas and uploads it.
    pub fn create(&mut self, backend: &mut B) -> Result<()> {
        self.erase();
        self.build(backend)
    }

    /// Drops the texture and the glyph table.
    pub fn erase(&mut self) {
        self.texture = None;
        self.glyphs.clear();
        self.width = 0;
        self.height = 0;
        self.spacing = 0;
        self.line_height = 0;
        self.scale = 1.0;
        self.state = AtlasState::Uninitialized;
    }

    // ── queries ────────────────────────────────────────────────────────────

    pub fn desc(&self) -> &FontDesc {
        &self.desc
    }

    pub fn state(&self) -> AtlasState {
        self.state
    }

    pub fn texture(&self) -> Option<&B::Texture> {
        self.texture.as_ref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn spacing(&self) -> u32 {
        self.spacing
    }

    /// Rasterized size over requested size; `1.0` unless the device limit
    /// forced a smaller build.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn glyph(&self, ch: char) -> Option<&GlyphEntry> {
        self.glyphs.get(&ch)
    }

    /// UVs of `ch`, or [`UvRect::ZERO`] for characters not in the atlas.
    pub fn coords(&self, ch: char) -> UvRect {
        self.glyphs.get(&ch).map_or(UvRect::ZERO, |g| g.uv)
    }

    /// Horizontal pen advance for `ch` in logical pixels.
    ///
    /// Text layout and [`text_extent`](Self::text_extent) both go through
    /// this, so measured and drawn runs always agree.
    pub fn advance_for(&self, ch: char) -> f32 {
        self.glyphs.get(&ch).map_or(0.0, |g| g.width as f32 / self.scale)
    }

    /// Distance between baselines in logical pixels.
    pub fn line_height(&self) -> f32 {
        self.line_height as f32 / self.scale
    }

    /// Bounding box of `text` as laid out by `push_text`.
    pub fn text_extent(&self, text: &str) -> Vec2 {
        let line_height = self.line_height();
        let mut width = 0.0f32;
        let mut row = 0.0f32;
        let mut height = line_height;

        for ch in text.chars() {
            if ch == '\n' {
                row = 0.0;
                height += line_height;
                continue;
            }
            row += self.advance_for(ch);
            width = width.max(row);
        }

        Vec2::new(width, height)
    }

    // ── build ──────────────────────────────────────────────────────────────

    fn build(&mut self, backend: &mut B) -> Result<()> {
        let max = backend.max_texture_dimension();
        let requested = self.desc.height as f32;
        if requested < 1.0 {
            return Err(RenderError::Configuration(format!(
                "font '{}' has zero height",
                self.desc.family
            )));
        }

        let mut size = INITIAL_SIZE;
        loop {
            match self.layout(requested, size, |_, _, _, _| {})? {
                Packing::Fits { .. } => break,
                Packing::Overflow if size >= MAX_DOUBLING_SIZE => break,
                Packing::Overflow => size *= 2,
            }
        }

        let mut scale = 1.0f32;
        if size > max {
            scale = max as f32 / size as f32;
            size = max;
            let mut first = true;
            loop {
                if !first {
                    scale *= SHRINK_RATIO;
                }
                first = false;

                let px = requested * scale;
                if px < 1.0 {
                    return Err(RenderError::Configuration(format!(
                        "font '{}' at {}px does not fit in a {max}x{max} atlas",
                        self.desc.family, self.desc.height
                    )));
                }
                if let Packing::Fits { .. } = self.layout(px, size, |_, _, _, _| {})? {
                    break;
                }
            }
            log::debug!(
                "font '{}' shrunk to scale {scale:.3} to fit {size}x{size}",
                self.desc.family
            );
        }

        self.commit(backend, size, scale)
    }

    /// Renders every glyph into a `size x size` coverage map at `scale`,
    /// then uploads it as white texels with coverage in alpha.
    fn commit(&mut self, backend: &mut B, size: u32, scale: f32) -> Result<()> {
        let px = self.desc.height as f32 * scale;
        let stride = size as usize;
        let mut coverage = vec![0u8; stride * stride];
        let mut placed = Vec::new();

        let packing = self.layout(px, size, |ch, x, y, m| placed.push((ch, x, y, m)))?;
        let Packing::Fits { spacing, line_height } = packing else {
            return Err(RenderError::Configuration(format!(
                "font '{}' layout changed between passes",
                self.desc.family
            )));
        };

        let mut glyphs = HashMap::with_capacity(placed.len());
        for (ch, x, y, m) in placed {
            glyphs.insert(
                ch,
                GlyphEntry {
                    uv: UvRect::from_pixels(x, y, m.width, m.height, size, size),
                    width: m.width,
                    height: m.height,
                },
            );

            let Some(bitmap) = self.rasterizer.render(ch, px) else { continue };
            let (x0, y0) = (x as usize, y as usize);
            let w = bitmap.width.min(m.width) as usize;
            let h = bitmap.height.min(m.height) as usize;
            for row in 0..h {
                let src = &bitmap.coverage[row * bitmap.width as usize..][..w];
                let dst = (y0 + row) * stride + x0;
                coverage[dst..dst + w].copy_from_slice(src);
            }
        }

        let aliased = self.desc.quality == FontQuality::Aliased;
        let texels: Vec<u8> = coverage
            .iter()
            .flat_map(|&c| {
                let a = match (aliased, c) {
                    (true, c) if c >= 128 => 255,
                    (true, _) => 0,
                    (false, c) => c,
                };
                [255, 255, 255, a]
            })
            .collect();

        let texture = backend.create_texture(size, size, Some(&texels))?;

        log::debug!(
            "font '{}' {}px: {} glyphs in {size}x{size} atlas",
            self.desc.family,
            self.desc.height,
            glyphs.len()
        );

        self.glyphs = glyphs;
        self.texture = Some(texture);
        self.width = size;
        self.height = size;
        self.spacing = spacing;
        self.line_height = line_height;
        self.scale = scale;
        self.state = AtlasState::Built;
        Ok(())
    }

    /// Lays out every character the rasterizer reports at pixel height `px`
    /// in a `size x size` square, calling `place(ch, x, y, metrics)` for each.
    fn layout<F>(&self, px: f32, size: u32, mut place: F) -> Result<Packing>
    where
        F: FnMut(char, u32, u32, GlyphMetrics),
    {
        let reference = self.rasterizer.measure(REFERENCE_CHAR, px).ok_or_else(|| {
            RenderError::Configuration(format!(
                "font '{}' cannot measure '{REFERENCE_CHAR}'",
                self.desc.family
            ))
        })?;
        let line_height = reference.height;
        let spacing = (line_height as f32 * SPACING_RATIO).ceil() as u32;

        let ranges = self.rasterizer.enumerate_ranges();
        if ranges.is_empty() {
            return Err(RenderError::Configuration(format!(
                "font '{}' reports no characters",
                self.desc.family
            )));
        }

        let (mut x, mut y) = (spacing, 0u32);
        // tallest cell on the current row
        let mut row_height = 0u32;

        for ch in ranges.into_iter().flat_map(|r| r.chars()) {
            let Some(m) = self.rasterizer.measure(ch, px) else { continue };

            if x + m.width + spacing > size {
                x = spacing;
                y += row_height + 1;
                row_height = 0;
                if x + m.width + spacing > size {
                    return Ok(Packing::Overflow);
                }
            }
            if y + m.height > size {
                return Ok(Packing::Overflow);
            }

            place(ch, x, y, m);
            x += m.width + 2 * spacing;
            row_height = row_height.max(m.height);
        }

        Ok(Packing::Fits { spacing, line_height })
    }
}

impl<B: GpuBackend, R: FontRasterizer> DeviceResource<B> for GlyphAtlas<B, R> {
    fn reset(&mut self, backend: &mut B, pre_reset: bool) -> Result<()> {
        if pre_reset {
            self.texture = None;
            if self.state == AtlasState::Built {
                self.state = AtlasState::Released;
            }
            return Ok(());
        }
        self.create(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BlockRasterizer, GpuCall, RecordingBackend};
    use crate::text::desc::FontFlags;

    type Atlas = GlyphAtlas<RecordingBackend, BlockRasterizer>;

    fn atlas(height: u32) -> Atlas {
        GlyphAtlas::new(BlockRasterizer::ascii(), FontDesc::new("block", height))
    }

    fn built(height: u32, gpu: &mut RecordingBackend) -> Atlas {
        let mut a = atlas(height);
        a.create(gpu).unwrap();
        a
    }

    #[test]
    fn new_atlas_is_uninitialized() {
        let a = atlas(16);
        assert_eq!(a.state(), AtlasState::Uninitialized);
        assert!(a.texture().is_none());
        assert!(a.coords('a').is_zero());
    }

    #[test]
    fn grows_until_alphabet_fits() {
        let mut gpu = RecordingBackend::new();
        let a = built(16, &mut gpu);

        assert_eq!(a.state(), AtlasState::Built);
        assert_eq!((a.width(), a.height()), (256, 256));
        assert_eq!(a.spacing(), 5);
        assert_eq!(a.scale(), 1.0);
        assert_eq!(a.glyph_count(), 95);
        assert_eq!(
            gpu.calls,
            vec![GpuCall::CreateTexture { id: 1, width: 256, height: 256 }]
        );
    }

    #[test]
    fn glyph_cells_lie_inside_the_texture_and_do_not_overlap() {
        let mut gpu = RecordingBackend::new();
        let a = built(16, &mut gpu);

        let cells: Vec<_> = (' '..='~').filter_map(|c| a.glyph(c).copied()).collect();
        for g in &cells {
            assert!(g.uv.u_min >= 0.0 && g.uv.u_max <= 1.0);
            assert!(g.uv.v_min >= 0.0 && g.uv.v_max <= 1.0);
        }
        for (i, p) in cells.iter().enumerate() {
            for q in &cells[i + 1..] {
                let disjoint = p.uv.u_max <= q.uv.u_min
                    || q.uv.u_max <= p.uv.u_min
                    || p.uv.v_max <= q.uv.v_min
                    || q.uv.v_max <= p.uv.v_min;
                assert!(disjoint, "{p:?} overlaps {q:?}");
            }
        }
    }

    fn assert_disjoint(cells: &[(char, GlyphEntry)]) {
        for (i, (a, p)) in cells.iter().enumerate() {
            for (b, q) in &cells[i + 1..] {
                let disjoint = p.uv.u_max <= q.uv.u_min
                    || q.uv.u_max <= p.uv.u_min
                    || p.uv.v_max <= q.uv.v_min
                    || q.uv.v_max <= p.uv.v_min;
                assert!(disjoint, "{a} {p:?} overlaps {b} {q:?}");
            }
        }
    }

    #[test]
    fn rows_advance_past_their_tallest_cell() {
        let mut gpu = RecordingBackend::new();
        let mut raster = BlockRasterizer::ascii();
        raster.tall.push('A');
        let mut a: Atlas = GlyphAtlas::new(raster, FontDesc::new("block", 16));
        a.create(&mut gpu).unwrap();

        let tall = *a.glyph('A').unwrap();
        assert_eq!(tall.height, 64);
        let cells: Vec<_> = (' '..='~').filter_map(|c| a.glyph(c).map(|g| (c, *g))).collect();
        assert_eq!(cells.len(), 95);
        assert_disjoint(&cells);

        // the row after 'A' starts below it
        let below: Vec<_> = cells.iter().filter(|(_, g)| g.uv.v_min > tall.uv.v_min).collect();
        assert!(!below.is_empty());
        let row_below = below.iter().map(|(_, g)| g.uv.v_min).fold(f32::MAX, f32::min);
        assert!(row_below >= tall.uv.v_max);
    }

    #[test]
    fn bitmaps_land_on_their_cells_in_a_non_power_of_two_atlas() {
        let mut gpu = RecordingBackend::new();
        gpu.max_texture_dimension = 100;
        let a = built(16, &mut gpu);
        assert_eq!(a.width(), 100);

        let texels = gpu.texels(a.texture().unwrap().id);
        let alpha = |x: usize, y: usize| texels[(y * 100 + x) * 4 + 3];
        for c in ' '..='~' {
            let g = *a.glyph(c).unwrap();
            let x = (g.uv.u_min * 100.0).round() as usize;
            let y = (g.uv.v_min * 100.0).round() as usize;
            assert_eq!(alpha(x, y), 100, "{c}");
            assert_eq!(alpha(x + 1, y), 200, "{c}");
            assert_eq!(alpha(x - 1, y), 0, "{c}");
        }
    }

    #[test]
    fn first_glyph_starts_after_spacing() {
        let mut gpu = RecordingBackend::new();
        let a = built(16, &mut gpu);
        assert_eq!(a.coords(' '), UvRect::from_pixels(5, 0, 8, 16, 256, 256));
    }

    #[test]
    fn texels_are_white_with_coverage_alpha() {
        let mut gpu = RecordingBackend::new();
        let a = built(16, &mut gpu);
        let texels = gpu.texels(a.texture().unwrap().id);

        // 'x' cell: first column 100, the rest 200
        let g = *a.glyph('x').unwrap();
        let x = (g.uv.u_min * 256.0).round() as usize;
        let y = (g.uv.v_min * 256.0).round() as usize;
        let at = |dx: usize| &texels[((y * 256) + x + dx) * 4..][..4];
        assert_eq!(at(0), &[255, 255, 255, 100]);
        assert_eq!(at(1), &[255, 255, 255, 200]);
        assert_eq!(&texels[..4], &[255, 255, 255, 0]);
    }

    #[test]
    fn aliased_quality_thresholds_coverage() {
        let mut gpu = RecordingBackend::new();
        let desc = FontDesc::new("block", 16).with_quality(FontQuality::Aliased);
        let mut a: Atlas = GlyphAtlas::new(BlockRasterizer::ascii(), desc);
        a.create(&mut gpu).unwrap();

        let texels = gpu.texels(a.texture().unwrap().id);
        let g = *a.glyph('x').unwrap();
        let x = (g.uv.u_min * 256.0).round() as usize;
        let y = (g.uv.v_min * 256.0).round() as usize;
        let base = (y * 256 + x) * 4;
        assert_eq!(texels[base + 3], 0);
        assert_eq!(texels[base + 7], 255);
    }

    #[test]
    fn shrinks_to_the_device_limit() {
        let mut gpu = RecordingBackend::new();
        gpu.max_texture_dimension = 128;
        let a = built(16, &mut gpu);

        assert_eq!((a.width(), a.height()), (128, 128));
        assert_eq!(a.scale(), 0.5);
        // advances are reported at the requested size
        assert_eq!(a.advance_for('a'), 8.0);
        assert_eq!(a.line_height(), 16.0);
    }

    #[test]
    fn impossible_limit_is_a_configuration_error() {
        let mut gpu = RecordingBackend::new();
        gpu.max_texture_dimension = 8;
        let mut a = atlas(16);
        assert!(matches!(a.create(&mut gpu), Err(RenderError::Configuration(_))));
        assert!(a.texture().is_none());
    }

    #[test]
    fn missing_reference_glyph_is_a_configuration_error() {
        let mut gpu = RecordingBackend::new();
        let mut raster = BlockRasterizer::ascii();
        raster.missing.push('x');
        let mut a: Atlas = GlyphAtlas::new(raster, FontDesc::new("block", 16));
        assert!(matches!(a.create(&mut gpu), Err(RenderError::Configuration(_))));
    }

    #[test]
    fn unmeasurable_characters_are_skipped() {
        let mut gpu = RecordingBackend::new();
        let mut raster = BlockRasterizer::ascii();
        raster.missing.push('q');
        let mut a: Atlas = GlyphAtlas::new(raster, FontDesc::new("block", 16));
        a.create(&mut gpu).unwrap();
        assert_eq!(a.glyph_count(), 94);
        assert!(a.coords('q').is_zero());
        assert_eq!(a.advance_for('q'), 0.0);
    }

    #[test]
    fn build_is_deterministic() {
        let mut gpu = RecordingBackend::new();
        let a = built(20, &mut gpu);
        let b = built(20, &mut gpu);
        for c in ' '..='~' {
            assert_eq!(a.coords(c), b.coords(c));
        }
        assert_eq!(a.scale(), b.scale());
    }

    #[test]
    fn text_extent_sums_advances_per_line() {
        let mut gpu = RecordingBackend::new();
        let a = built(16, &mut gpu);
        assert_eq!(a.text_extent("ab"), Vec2::new(16.0, 16.0));
        assert_eq!(a.text_extent("ab\nabc"), Vec2::new(24.0, 32.0));
        assert_eq!(a.text_extent("MW"), Vec2::new(26.0, 16.0));
    }

    #[test]
    fn pre_reset_keeps_uvs_and_rebuild_restores_texture() {
        let mut gpu = RecordingBackend::new();
        let mut a = built(16, &mut gpu);
        let uv = a.coords('k');
        let old = a.texture().unwrap().id;

        a.reset(&mut gpu, true).unwrap();
        assert_eq!(a.state(), AtlasState::Released);
        assert!(a.texture().is_none());
        assert_eq!(a.coords('k'), uv);
        assert_eq!(gpu.released(), vec![old]);

        a.reset(&mut gpu, false).unwrap();
        assert_eq!(a.state(), AtlasState::Built);
        assert_eq!(a.coords('k'), uv);
        assert_ne!(a.texture().unwrap().id, old);
    }

    #[test]
    fn erase_returns_to_uninitialized() {
        let mut gpu = RecordingBackend::new();
        let mut a = built(16, &mut gpu);
        a.erase();
        assert_eq!(a.state(), AtlasState::Uninitialized);
        assert_eq!(a.glyph_count(), 0);
        assert_eq!(a.desc().flags, FontFlags::empty());
    }
}
