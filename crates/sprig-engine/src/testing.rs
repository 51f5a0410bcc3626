//! Test doubles for the device and font boundaries.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::backend::{texel_len, texel_offset, BufferKind, GpuBackend, TexelRegion};
use crate::coords::Rect;
use crate::error::{RenderError, Result};
use crate::text::{FontRasterizer, GlyphBitmap, GlyphMetrics, GlyphRange};

/// One call made through the backend boundary.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GpuCall {
    CreateBuffer { id: u32, kind: BufferKind, size: u64 },
    Upload { id: u32, len: usize },
    CreateTexture { id: u32, width: u32, height: u32 },
    WriteTexture { id: u32, region: TexelRegion },
    BindPipeline { vertices: u32, indices: u32 },
    BindTexture { slot: u32, texture: Option<u32> },
    SetScissor(Rect),
    Draw { index_count: u32, index_offset: u32, vertex_offset: u32 },
}

type ReleaseLog = Rc<RefCell<Vec<u32>>>;

struct ReleaseGuard {
    id: u32,
    log: ReleaseLog,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.log.borrow_mut().push(self.id);
    }
}

pub(crate) struct MockBuffer {
    pub id: u32,
    pub size: u64,
    _guard: ReleaseGuard,
}

#[derive(Clone)]
pub(crate) struct MockTexture {
    pub id: u32,
    _guard: Rc<ReleaseGuard>,
}

impl PartialEq for MockTexture {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for MockTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MockTexture({})", self.id)
    }
}

struct TextureStore {
    width: u32,
    height: u32,
    texels: Vec<u8>,
}

/// Backend that records every call and keeps uploaded data in memory.
pub(crate) struct RecordingBackend {
    pub calls: Vec<GpuCall>,
    pub max_texture_dimension: u32,
    pub fail_uploads: bool,
    pub fail_buffers: bool,
    pub fail_textures: bool,
    buffers: HashMap<u32, Vec<u8>>,
    textures: HashMap<u32, TextureStore>,
    released: ReleaseLog,
    next_id: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            max_texture_dimension: 16384,
            fail_uploads: false,
            fail_buffers: false,
            fail_textures: false,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            released: Rc::new(RefCell::new(Vec::new())),
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// `(index_count, index_offset, vertex_offset)` of every draw, in order.
    pub fn draws(&self) -> Vec<(u32, u32, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                GpuCall::Draw { index_count, index_offset, vertex_offset } => {
                    Some((index_count, index_offset, vertex_offset))
                }
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&GpuCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn buffer_bytes(&self, id: u32) -> &[u8] {
        self.buffers.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn texels(&self, id: u32) -> &[u8] {
        self.textures.get(&id).map(|t| t.texels.as_slice()).unwrap_or(&[])
    }

    pub fn released(&self) -> Vec<u32> {
        self.released.borrow().clone()
    }

    fn guard(&self, id: u32) -> ReleaseGuard {
        ReleaseGuard { id, log: Rc::clone(&self.released) }
    }
}

impl GpuBackend for RecordingBackend {
    type Buffer = MockBuffer;
    type Texture = MockTexture;

    fn create_buffer(&mut self, kind: BufferKind, byte_size: u64) -> Result<MockBuffer> {
        if self.fail_buffers {
            return Err(RenderError::Allocation(format!("{kind:?} buffer of {byte_size} bytes")));
        }
        let id = self.next_id();
        self.calls.push(GpuCall::CreateBuffer { id, kind, size: byte_size });
        self.buffers.insert(id, Vec::new());
        Ok(MockBuffer { id, size: byte_size, _guard: self.guard(id) })
    }

    fn upload(&mut self, buffer: &MockBuffer, bytes: &[u8]) -> Result<()> {
        if self.fail_uploads {
            return Err(RenderError::Allocation("upload refused".into()));
        }
        if bytes.len() as u64 > buffer.size {
            return Err(RenderError::InvalidData("upload larger than buffer".into()));
        }
        self.calls.push(GpuCall::Upload { id: buffer.id, len: bytes.len() });
        self.buffers.insert(buffer.id, bytes.to_vec());
        Ok(())
    }

    fn create_texture(&mut self, width: u32, height: u32, texels: Option<&[u8]>) -> Result<MockTexture> {
        if self.fail_textures || width > self.max_texture_dimension || height > self.max_texture_dimension {
            return Err(RenderError::Allocation(format!("texture {width}x{height}")));
        }
        let len = texel_len(width, height);
        let texels = match texels {
            Some(t) if t.len() != len => {
                return Err(RenderError::InvalidData("texel length mismatch".into()));
            }
            Some(t) => t.to_vec(),
            None => vec![0; len],
        };
        let id = self.next_id();
        self.calls.push(GpuCall::CreateTexture { id, width, height });
        self.textures.insert(id, TextureStore { width, height, texels });
        Ok(MockTexture { id, _guard: Rc::new(self.guard(id)) })
    }

    fn write_texture(&mut self, texture: &MockTexture, region: TexelRegion, texels: &[u8]) -> Result<()> {
        if self.fail_textures {
            return Err(RenderError::Allocation("texture write refused".into()));
        }
        let Some(store) = self.textures.get_mut(&texture.id) else {
            return Err(RenderError::DeviceLoss);
        };
        if !region.fits_in(store.width, store.height) || texels.len() != region.byte_len() {
            return Err(RenderError::InvalidData("region out of bounds".into()));
        }
        let row = texel_len(region.width, 1);
        for (r, src) in (region.y..).zip(texels.chunks_exact(row)) {
            let start = texel_offset(store.width, region.x, r);
            store.texels[start..start + row].copy_from_slice(src);
        }
        self.calls.push(GpuCall::WriteTexture { id: texture.id, region });
        Ok(())
    }

    fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    fn bind_pipeline_state(&mut self, vertices: &MockBuffer, indices: &MockBuffer) {
        self.calls.push(GpuCall::BindPipeline { vertices: vertices.id, indices: indices.id });
    }

    fn bind_texture(&mut self, slot: u32, texture: Option<&MockTexture>) {
        self.calls.push(GpuCall::BindTexture { slot, texture: texture.map(|t| t.id) });
    }

    fn set_scissor(&mut self, rect: Rect) {
        self.calls.push(GpuCall::SetScissor(rect));
    }

    fn draw_indexed(&mut self, index_count: u32, index_offset: u32, vertex_offset: u32) {
        self.calls.push(GpuCall::Draw { index_count, index_offset, vertex_offset });
    }
}

/// Deterministic font: every glyph is a solid block.
///
/// Cells are `ceil(px / 2)` wide (`ceil(px * 0.8)` for `M` and `W`) and
/// `ceil(px)` tall, or `ceil(px * 4)` for characters in `tall`. The first
/// coverage column is 100, the rest 200.
pub(crate) struct BlockRasterizer {
    pub ranges: Vec<GlyphRange>,
    pub missing: Vec<char>,
    pub tall: Vec<char>,
}

impl BlockRasterizer {
    /// Printable ASCII, `' '..='~'`.
    pub fn ascii() -> Self {
        Self {
            ranges: vec![GlyphRange { low: ' ', count: 95 }],
            missing: Vec::new(),
            tall: Vec::new(),
        }
    }

    pub fn cell_width(ch: char, px: f32) -> u32 {
        let ratio = if matches!(ch, 'M' | 'W') { 0.8 } else { 0.5 };
        ((px * ratio).ceil() as u32).max(1)
    }
}

impl FontRasterizer for BlockRasterizer {
    fn enumerate_ranges(&self) -> Vec<GlyphRange> {
        self.ranges.clone()
    }

    fn measure(&self, ch: char, px: f32) -> Option<GlyphMetrics> {
        if self.missing.contains(&ch) || px < 1.0 {
            return None;
        }
        let height = if self.tall.contains(&ch) { px * 4.0 } else { px };
        Some(GlyphMetrics { width: Self::cell_width(ch, px), height: height.ceil() as u32 })
    }

    fn render(&self, ch: char, px: f32) -> Option<GlyphBitmap> {
        let GlyphMetrics { width, height } = self.measure(ch, px)?;
        let coverage = (0..width * height)
            .map(|i| if i % width == 0 { 100 } else { 200 })
            .collect();
        Some(GlyphBitmap { width, height, coverage })
    }
}
