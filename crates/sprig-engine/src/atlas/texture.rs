use std::collections::HashMap;

use crate::backend::{texel_len, texel_offset, DeviceResource, GpuBackend, TexelRegion};
use crate::error::{RenderError, Result};

use super::shelf::ShelfCursor;
use super::uv::UvRect;

/// Channel order of pixel data passed to [`TextureAtlas::append`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum PixelFormat {
    #[default]
    Rgba8,
    Bgra8,
}

/// Fixed-size texture packing arbitrary images keyed by a numeric id.
///
/// Entries are never moved or removed; once the shelf cursor reaches the
/// bottom, appends fail with [`RenderError::Overflow`] and the caller needs a
/// new atlas. A CPU copy of the texels lets a device reset restore every
/// entry in place.
pub struct TextureAtlas<B: GpuBackend> {
    width: u32,
    height: u32,
    cursor: ShelfCursor,
    entries: HashMap<u32, UvRect>,
    shadow: Vec<u8>,
    texture: Option<B::Texture>,
}

impl<B: GpuBackend> TextureAtlas<B> {
    pub fn create(backend: &mut B, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::Configuration(format!(
                "texture atlas size {width}x{height}"
            )));
        }
        let max = backend.max_texture_dimension();
        if width > max || height > max {
            return Err(RenderError::Configuration(format!(
                "texture atlas size {width}x{height} exceeds device limit {max}"
            )));
        }

        let texture = backend.create_texture(width, height, None)?;

        Ok(Self {
            width,
            height,
            cursor: ShelfCursor::default(),
            entries: HashMap::new(),
            shadow: vec![0; texel_len(width, height)],
            texture: Some(texture),
        })
    }

    /// Packs a `width x height` image and records it under `id`.
    ///
    /// On any failure the atlas is unchanged. Appending an id again stores a
    /// second copy and points the id at it.
    pub fn append(
        &mut self,
        backend: &mut B,
        id: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
        format: PixelFormat,
    ) -> Result<UvRect> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidData(format!("image {id} has zero size")));
        }
        let expected = texel_len(width, height);
        if pixels.len() != expected {
            return Err(RenderError::InvalidData(format!(
                "image {id}: expected {expected} bytes, got {}",
                pixels.len()
            )));
        }

        let Some(((x, y), next)) = self.cursor.place(width, height, (self.width, self.height))
        else {
            log::debug!("texture atlas full; image {id} ({width}x{height}) rejected");
            return Err(RenderError::Overflow {
                width,
                height,
                atlas_width: self.width,
                atlas_height: self.height,
            });
        };

        let texels = to_rgba(pixels, format);
        if let Some(texture) = self.texture.as_ref() {
            backend.write_texture(texture, TexelRegion::new(x, y, width, height), &texels)?;
        }

        let row = texel_len(width, 1);
        for (r, src) in (y..).zip(texels.chunks_exact(row)) {
            let start = texel_offset(self.width, x, r);
            self.shadow[start..start + row].copy_from_slice(src);
        }

        let uv = UvRect::from_pixels(x, y, width, height, self.width, self.height);
        if self.entries.insert(id, uv).is_some() {
            log::debug!("texture atlas: id {id} re-appended");
        }
        self.cursor = next;
        Ok(uv)
    }

    /// UVs of `id`, or [`UvRect::ZERO`] when it was never appended.
    pub fn coords(&self, id: u32) -> UvRect {
        self.entries.get(&id).copied().unwrap_or(UvRect::ZERO)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn texture(&self) -> Option<&B::Texture> {
        self.texture.as_ref()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> ShelfCursor {
        self.cursor
    }
}

impl<B: GpuBackend> DeviceResource<B> for TextureAtlas<B> {
    fn reset(&mut self, backend: &mut B, pre_reset: bool) -> Result<()> {
        self.texture = None;
        if pre_reset {
            return Ok(());
        }
        self.texture = Some(backend.create_texture(self.width, self.height, Some(&self.shadow))?);
        Ok(())
    }
}

fn to_rgba(pixels: &[u8], format: PixelFormat) -> Vec<u8> {
    match format {
        PixelFormat::Rgba8 => pixels.to_vec(),
        PixelFormat::Bgra8 => pixels
            .chunks_exact(4)
            .flat_map(|p| [p[2], p[1], p[0], p[3]])
            .collect(),
    }
}
