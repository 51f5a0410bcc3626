//! Graphics device boundary.
//!
//! The render queue and the atlases never touch a graphics API directly;
//! they drive a [`GpuBackend`] that is passed in explicitly wherever device
//! work happens. Handles are RAII: dropping a `Buffer` or `Texture` releases
//! the device object.
//!
//! The wgpu implementation lives in [`crate::device::WgpuBackend`].

use crate::coords::Rect;
use crate::error::Result;

/// Role of a GPU buffer created through [`GpuBackend::create_buffer`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Sub-rectangle of a texture, in texels.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TexelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TexelRegion {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether the region lies inside a `width x height` texture.
    pub fn fits_in(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }

    pub fn byte_len(&self) -> usize {
        texel_len(self.width, self.height)
    }
}

/// Bytes per RGBA8 texel.
pub const TEXEL_SIZE: usize = 4;

/// Byte length of a tightly packed `width x height` RGBA8 image.
#[inline]
pub fn texel_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * TEXEL_SIZE
}

/// Byte offset of texel `(x, y)` in an image `stride` texels wide.
#[inline]
pub fn texel_offset(stride: u32, x: u32, y: u32) -> usize {
    (y as usize * stride as usize + x as usize) * TEXEL_SIZE
}

/// Device operations needed to batch and replay 2D geometry.
///
/// All texel data is tightly packed RGBA8.
pub trait GpuBackend {
    type Buffer;
    /// Texture handle. Equality is identity: two handles compare equal only
    /// when they refer to the same device texture.
    type Texture: Clone + PartialEq;

    fn create_buffer(&mut self, kind: BufferKind, byte_size: u64) -> Result<Self::Buffer>;

    /// Replaces the leading `bytes.len()` bytes of `buffer`.
    fn upload(&mut self, buffer: &Self::Buffer, bytes: &[u8]) -> Result<()>;

    /// Creates a `width x height` texture, zero-filled when `texels` is `None`.
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        texels: Option<&[u8]>,
    ) -> Result<Self::Texture>;

    fn write_texture(
        &mut self,
        texture: &Self::Texture,
        region: TexelRegion,
        texels: &[u8],
    ) -> Result<()>;

    fn max_texture_dimension(&self) -> u32;

    /// Binds the shared pipeline and the queue's vertex/index buffers.
    fn bind_pipeline_state(&mut self, vertices: &Self::Buffer, indices: &Self::Buffer);

    /// `None` binds the backend's 1x1 opaque white texture.
    fn bind_texture(&mut self, slot: u32, texture: Option<&Self::Texture>);

    fn set_scissor(&mut self, rect: Rect);

    /// Draws `index_count` indices starting at `index_offset`; every index is
    /// offset by `vertex_offset`.
    fn draw_indexed(&mut self, index_count: u32, index_offset: u32, vertex_offset: u32);
}

/// A holder of device objects that must follow the two-phase device reset.
///
/// `pre_reset == true` releases every device object while keeping CPU-side
/// state; `pre_reset == false` recreates them on the (possibly new) device.
pub trait DeviceResource<B: GpuBackend> {
    fn reset(&mut self, backend: &mut B, pre_reset: bool) -> Result<()>;
}

/// Runs one reset phase over every resource, in order.
///
/// All resources are visited even if one fails; the first error is returned.
pub fn reset_all<B: GpuBackend>(
    backend: &mut B,
    resources: &mut [&mut dyn DeviceResource<B>],
    pre_reset: bool,
) -> Result<()> {
    let mut first_err = None;
    for resource in resources.iter_mut() {
        if let Err(err) = resource.reset(backend, pre_reset) {
            log::warn!("device resource reset (pre_reset={pre_reset}) failed: {err}");
            first_err.get_or_insert(err);
        }
    }
    first_err.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texel_math_does_not_wrap_at_the_largest_textures() {
        assert_eq!(texel_len(32768, 32768), 4 << 30);
        assert_eq!(texel_offset(32768, 5, 32767), (32767 * 32768 + 5) * 4);
        assert_eq!(TexelRegion::new(0, 0, 65536, 65536).byte_len(), 1 << 34);
    }

    #[test]
    fn region_bounds_check_does_not_wrap() {
        assert!(TexelRegion::new(2, 3, 6, 5).fits_in(8, 8));
        assert!(!TexelRegion::new(2, 3, 7, 5).fits_in(8, 8));
        assert!(!TexelRegion::new(u32::MAX, 0, 2, 1).fits_in(8, 8));
    }
}
