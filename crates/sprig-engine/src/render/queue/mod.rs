//! Batching render queue.
//!
//! Primitives are appended into one shared vertex buffer and one shared
//! index buffer. Consecutive primitives that use the same texture extend the
//! last `Triangles` call instead of starting a new one, so a frame replays
//! as few draws as possible while keeping submission order.

mod shapes;
mod text;

use crate::backend::{BufferKind, DeviceResource, GpuBackend};
use crate::error::{RenderError, Result};

use super::buffer::GrowableBuffer;
use super::call::DrawCall;
use super::vertex::{Index, Vertex};

/// Largest vertex count a single batch may reach while staying addressable
/// by `u16` indices.
pub const MAX_BATCH_VERTICES: u32 = Index::MAX as u32 + 1;

/// Initial CPU/GPU capacities of a [`RenderQueue`], in slots.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct QueueConfig {
    pub initial_vertices: usize,
    pub initial_indices: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            initial_vertices: 32767,
            initial_indices: 65535,
        }
    }
}

/// Where a new primitive group lands relative to the batch it joins.
#[derive(Debug, Copy, Clone)]
struct BatchSlot {
    /// Vertex count of the batch before this group; added to every index.
    base: u32,
    merge: bool,
}

/// Accumulates one frame of 2D geometry and replays it on a backend.
pub struct RenderQueue<B: GpuBackend> {
    vertices: GrowableBuffer<Vertex>,
    indices: GrowableBuffer<Index>,
    calls: Vec<DrawCall<B::Texture>>,

    gpu_vertices: Option<B::Buffer>,
    gpu_indices: Option<B::Buffer>,

    needs_upload: bool,
    released: bool,
}

impl<B: GpuBackend> RenderQueue<B> {
    /// Allocates CPU storage and matching device buffers.
    pub fn create(backend: &mut B, config: QueueConfig) -> Result<Self> {
        let vertices = GrowableBuffer::with_capacity(config.initial_vertices)?;
        let indices = GrowableBuffer::with_capacity(config.initial_indices)?;

        let gpu_vertices = backend.create_buffer(BufferKind::Vertex, vertices.byte_capacity())?;
        let gpu_indices = backend.create_buffer(BufferKind::Index, indices.byte_capacity())?;

        log::debug!(
            "render queue created ({} vertices, {} indices)",
            config.initial_vertices,
            config.initial_indices
        );

        Ok(Self {
            vertices,
            indices,
            calls: Vec::new(),
            gpu_vertices: Some(gpu_vertices),
            gpu_indices: Some(gpu_indices),
            needs_upload: false,
            released: false,
        })
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn draw_calls(&self) -> &[DrawCall<B::Texture>] {
        &self.calls
    }

    pub fn vertices(&self) -> &[Vertex] {
        self.vertices.as_slice()
    }

    pub fn indices(&self) -> &[Index] {
        self.indices.as_slice()
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertices.capacity()
    }

    pub fn index_capacity(&self) -> usize {
        self.indices.capacity()
    }

    /// CPU contents changed since the last successful upload.
    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }

    pub fn vertex_buffer_resized(&self) -> bool {
        self.vertices.is_resized()
    }

    pub fn index_buffer_resized(&self) -> bool {
        self.indices.is_resized()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    // ── frame lifecycle ───────────────────────────────────────────────────

    /// Drops all geometry and calls; capacity is kept.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.calls.clear();
    }

    /// Replays every recorded call on `backend`.
    ///
    /// Buffers are re-uploaded first when anything was pushed since the last
    /// flush. A failed upload leaves the queue dirty so the next flush retries.
    pub fn flush(&mut self, backend: &mut B) -> Result<()> {
        if self.calls.is_empty() {
            return Ok(());
        }
        if self.released {
            return Err(RenderError::DeviceLoss);
        }
        if self.needs_upload {
            self.upload(backend)?;
        }

        let (Some(vertices), Some(indices)) = (self.gpu_vertices.as_ref(), self.gpu_indices.as_ref())
        else {
            return Err(RenderError::DeviceLoss);
        };

        backend.bind_pipeline_state(vertices, indices);

        let mut vertex_offset = 0u32;
        let mut index_offset = 0u32;

        for call in &self.calls {
            match call {
                DrawCall::Triangles { texture, vertex_count, index_count, .. } => {
                    backend.bind_texture(0, texture.as_ref());
                    backend.draw_indexed(*index_count, index_offset, vertex_offset);
                    vertex_offset += vertex_count;
                    index_offset += index_count;
                }
                DrawCall::Scissor(rect) => backend.set_scissor(*rect),
            }
        }

        Ok(())
    }

    fn upload(&mut self, backend: &mut B) -> Result<()> {
        if self.vertices.is_resized() || self.gpu_vertices.is_none() {
            self.gpu_vertices = None;
            self.gpu_vertices =
                Some(backend.create_buffer(BufferKind::Vertex, self.vertices.byte_capacity())?);
            self.vertices.clear_resized();
        }
        if self.indices.is_resized() || self.gpu_indices.is_none() {
            self.gpu_indices = None;
            self.gpu_indices =
                Some(backend.create_buffer(BufferKind::Index, self.indices.byte_capacity())?);
            self.indices.clear_resized();
        }

        let (Some(vertices), Some(indices)) = (self.gpu_vertices.as_ref(), self.gpu_indices.as_ref())
        else {
            return Err(RenderError::DeviceLoss);
        };

        backend.upload(vertices, self.vertices.as_bytes())?;
        backend.upload(indices, self.indices.as_bytes())?;

        self.needs_upload = false;
        Ok(())
    }

    // ── batching ──────────────────────────────────────────────────────────

    fn batch_slot(&self, texture: Option<&B::Texture>, vertex_count: u32) -> BatchSlot {
        match self.calls.last() {
            Some(DrawCall::Triangles { texture: last, vertex_count: n, .. })
                if last.as_ref() == texture && n + vertex_count <= MAX_BATCH_VERTICES =>
            {
                BatchSlot { base: *n, merge: true }
            }
            _ => BatchSlot { base: 0, merge: false },
        }
    }

    /// Appends one group of `vertex_count` vertices and `index_count`
    /// indices. `fill` writes indices relative to the group's first vertex;
    /// they are rebased onto the batch afterwards.
    ///
    /// Groups that cannot be stored are dropped with a warning.
    fn push_group<F>(
        &mut self,
        texture: Option<&B::Texture>,
        vertex_count: usize,
        index_count: usize,
        primitive_count: u32,
        fill: F,
    ) where
        F: FnOnce(&mut [Vertex], &mut [Index]),
    {
        if vertex_count == 0 || index_count == 0 {
            return;
        }
        if vertex_count > MAX_BATCH_VERTICES as usize {
            log::debug!("primitive with {vertex_count} vertices exceeds a single batch; ignored");
            return;
        }

        if let Err(err) = self
            .vertices
            .ensure_capacity(vertex_count)
            .and_then(|()| self.indices.ensure_capacity(index_count))
        {
            log::warn!("dropping primitive ({vertex_count} vertices): {err}");
            return;
        }

        let slot = self.batch_slot(texture, vertex_count as u32);

        let (Ok(vtx), Ok(idx)) = (
            self.vertices.append(vertex_count),
            self.indices.append(index_count),
        ) else {
            return;
        };

        fill(vtx, idx);
        if slot.base > 0 {
            for i in idx.iter_mut() {
                *i += slot.base as Index;
            }
        }

        let (vertex_count, index_count) = (vertex_count as u32, index_count as u32);
        match self.calls.last_mut() {
            Some(DrawCall::Triangles {
                vertex_count: v,
                index_count: i,
                primitive_count: p,
                ..
            }) if slot.merge => {
                *v += vertex_count;
                *i += index_count;
                *p += primitive_count;
            }
            _ => self.calls.push(DrawCall::Triangles {
                texture: texture.cloned(),
                vertex_count,
                index_count,
                primitive_count,
            }),
        }

        self.needs_upload = true;
    }

    /// Two triangles over corners given as top-left, top-right,
    /// bottom-right, bottom-left.
    fn push_quad(&mut self, texture: Option<&B::Texture>, corners: [Vertex; 4]) {
        self.push_group(texture, 4, 6, 2, |vtx, idx| {
            vtx.copy_from_slice(&corners);
            idx.copy_from_slice(&QUAD_INDICES);
        });
    }
}

/// Quad triangulation sharing the top-right / bottom-left diagonal.
const QUAD_INDICES: [Index; 6] = [0, 1, 3, 3, 2, 1];

impl<B: GpuBackend> DeviceResource<B> for RenderQueue<B> {
    fn reset(&mut self, backend: &mut B, pre_reset: bool) -> Result<()> {
        if pre_reset {
            self.gpu_vertices = None;
            self.gpu_indices = None;
            self.released = true;
            return Ok(());
        }

        self.gpu_vertices =
            Some(backend.create_buffer(BufferKind::Vertex, self.vertices.byte_capacity())?);
        self.gpu_indices =
            Some(backend.create_buffer(BufferKind::Index, self.indices.byte_capacity())?);
        self.vertices.clear_resized();
        self.indices.clear_resized();
        self.needs_upload = true;
        self.released = false;
        Ok(())
    }
}
