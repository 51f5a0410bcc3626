use std::fmt;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::backend::{texel_len, BufferKind, GpuBackend, TexelRegion};
use crate::coords::{Rect, Viewport};
use crate::error::{RenderError, Result};
use crate::paint::Color;
use crate::render::Vertex;

const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// ── blend ─────────────────────────────────────────────────────────────────

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── viewport uniform ──────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    viewport: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

impl ViewportUniform {
    fn new(viewport: Viewport) -> Self {
        Self {
            viewport: [viewport.width.max(1.0), viewport.height.max(1.0)],
            _pad: [0.0; 2],
        }
    }
}

// ── handles ───────────────────────────────────────────────────────────────

/// Device buffer created by [`WgpuBackend`]. Dropping it releases the buffer.
pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
    kind: BufferKind,
}

impl WgpuBuffer {
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.buffer.size()
    }
}

struct TextureInner {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

/// Shared handle to an RGBA8 texture and its bind group.
///
/// Clones refer to the same device texture; it is released when the last
/// clone drops.
#[derive(Clone)]
pub struct WgpuTexture(Arc<TextureInner>);

impl WgpuTexture {
    pub fn size(&self) -> (u32, u32) {
        (self.0.width, self.0.height)
    }
}

impl PartialEq for WgpuTexture {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for WgpuTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WgpuTexture({}x{} @ {:p})", self.0.width, self.0.height, Arc::as_ptr(&self.0))
    }
}

// ── backend ───────────────────────────────────────────────────────────────

/// Construction parameters for [`WgpuBackend`].
#[derive(Debug, Copy, Clone)]
pub struct BackendInit {
    /// Filter used when sampling every bound texture.
    pub sampler_filter: wgpu::FilterMode,
    /// Logical size of the render target.
    pub viewport: Viewport,
    /// Physical pixels per logical pixel.
    pub scale_factor: f32,
}

impl Default for BackendInit {
    fn default() -> Self {
        Self {
            sampler_filter: wgpu::FilterMode::Nearest,
            viewport: Viewport::new(1.0, 1.0),
            scale_factor: 1.0,
        }
    }
}

/// [`GpuBackend`] on top of wgpu.
///
/// One pipeline draws every batch: group 0 holds the viewport uniform and
/// group 1 the bound texture with the shared sampler. Draw commands are
/// recorded into the render pass opened by [`begin_pass`](Self::begin_pass);
/// outside a pass they are ignored.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    viewport_ubo: wgpu::Buffer,
    viewport_bind_group: wgpu::BindGroup,
    viewport: Viewport,
    scale_factor: f32,

    white: WgpuTexture,

    pass: Option<wgpu::RenderPass<'static>>,
    scissor_empty: bool,
    warned_no_pass: bool,
}

impl WgpuBackend {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        init: BackendInit,
    ) -> Result<Self> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprig batch shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/batch.wgsl").into()),
        });

        let viewport_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprig viewport bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(
                        std::mem::size_of::<ViewportUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprig texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprig batch pipeline layout"),
            bind_group_layouts: &[&viewport_layout, &texture_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprig batch pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sprig sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: init.sampler_filter,
            min_filter: init.sampler_filter,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let viewport_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprig viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&viewport_ubo, 0, bytemuck::bytes_of(&ViewportUniform::new(init.viewport)));

        let viewport_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprig viewport bind group"),
            layout: &viewport_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_ubo.as_entire_binding(),
            }],
        });

        let white = texture_with_bind_group(device, queue, &texture_layout, &sampler, 1, 1, &[255; 4]);

        log::debug!("wgpu backend ready ({surface_format:?}, {:?} sampling)", init.sampler_filter);

        Ok(Self {
            device: device.clone(),
            queue: queue.clone(),
            pipeline,
            texture_layout,
            sampler,
            viewport_ubo,
            viewport_bind_group,
            viewport: init.viewport,
            scale_factor: init.scale_factor,
            white,
            pass: None,
            scissor_empty: false,
            warned_no_pass: false,
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Updates the logical target size; takes effect for the next pass.
    pub fn set_viewport(&mut self, viewport: Viewport, scale_factor: f32) {
        self.viewport = viewport;
        self.scale_factor = scale_factor;
        self.queue.write_buffer(
            &self.viewport_ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform::new(viewport)),
        );
    }

    /// Opens the render pass that subsequent draws are recorded into.
    ///
    /// `clear` fills the target first; `None` keeps its contents.
    pub fn begin_pass(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        clear: Option<Color>,
    ) {
        self.end_pass();

        let load = match clear {
            Some(c) => wgpu::LoadOp::Clear(c.to_wgpu()),
            None => wgpu::LoadOp::Load,
        };

        let mut pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sprig batch pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime();

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.viewport_bind_group, &[]);
        pass.set_bind_group(1, &self.white.0.bind_group, &[]);

        self.pass = Some(pass);
        self.scissor_empty = false;
        self.warned_no_pass = false;
    }

    /// Closes the current pass. The encoder may be finished afterwards.
    pub fn end_pass(&mut self) {
        self.pass = None;
    }

    pub fn in_pass(&self) -> bool {
        self.pass.is_some()
    }

    fn active_pass(&mut self) -> Option<&mut wgpu::RenderPass<'static>> {
        if self.pass.is_none() && !self.warned_no_pass {
            log::warn!("draw command issued outside a render pass; ignored");
            self.warned_no_pass = true;
        }
        self.pass.as_mut()
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        self.end_pass();
    }
}

fn texture_with_bind_group(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    width: u32,
    height: u32,
    texels: &[u8],
) -> WgpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("sprig texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    write_texels(queue, &texture, TexelRegion::new(0, 0, width, height), texels);

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("sprig texture bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    WgpuTexture(Arc::new(TextureInner {
        texture,
        bind_group,
        width,
        height,
    }))
}

fn write_texels(queue: &wgpu::Queue, texture: &wgpu::Texture, region: TexelRegion, texels: &[u8]) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: region.x,
                y: region.y,
                z: 0,
            },
            aspect: wgpu::TextureAspect::All,
        },
        texels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(region.width * 4),
            rows_per_image: Some(region.height),
        },
        wgpu::Extent3d {
            width: region.width,
            height: region.height,
            depth_or_array_layers: 1,
        },
    );
}

impl GpuBackend for WgpuBackend {
    type Buffer = WgpuBuffer;
    type Texture = WgpuTexture;

    fn create_buffer(&mut self, kind: BufferKind, byte_size: u64) -> Result<WgpuBuffer> {
        let size = byte_size.max(4).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let limit = self.device.limits().max_buffer_size;
        if size > limit {
            return Err(RenderError::Allocation(format!(
                "{kind:?} buffer of {size} bytes exceeds the device limit of {limit}"
            )));
        }

        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(match kind {
                BufferKind::Vertex => "sprig vertex buffer",
                BufferKind::Index => "sprig index buffer",
            }),
            size,
            usage,
            mapped_at_creation: false,
        });
        log::trace!("{kind:?} buffer created ({size} bytes)");

        Ok(WgpuBuffer { buffer, kind })
    }

    fn upload(&mut self, buffer: &WgpuBuffer, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        if bytes.len() as u64 > buffer.size() {
            return Err(RenderError::InvalidData(format!(
                "{} bytes do not fit a {:?} buffer of {}",
                bytes.len(),
                buffer.kind,
                buffer.size()
            )));
        }

        // write_buffer requires a 4-byte multiple
        let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
        if bytes.len() % align == 0 {
            self.queue.write_buffer(&buffer.buffer, 0, bytes);
        } else {
            let mut padded = bytes.to_vec();
            padded.resize(bytes.len().next_multiple_of(align), 0);
            self.queue.write_buffer(&buffer.buffer, 0, &padded);
        }
        Ok(())
    }

    fn create_texture(&mut self, width: u32, height: u32, texels: Option<&[u8]>) -> Result<WgpuTexture> {
        let max = self.max_texture_dimension();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::Allocation(format!(
                "texture {width}x{height} outside the device range 1..={max}"
            )));
        }

        let len = texel_len(width, height);
        let zeroed;
        let texels = match texels {
            Some(t) if t.len() != len => {
                return Err(RenderError::InvalidData(format!(
                    "{} texel bytes for a {width}x{height} texture",
                    t.len()
                )));
            }
            Some(t) => t,
            None => {
                zeroed = vec![0u8; len];
                &zeroed
            }
        };

        Ok(texture_with_bind_group(
            &self.device,
            &self.queue,
            &self.texture_layout,
            &self.sampler,
            width,
            height,
            texels,
        ))
    }

    fn write_texture(&mut self, texture: &WgpuTexture, region: TexelRegion, texels: &[u8]) -> Result<()> {
        let (width, height) = texture.size();
        if !region.fits_in(width, height) {
            return Err(RenderError::InvalidData(format!(
                "region {region:?} outside a {width}x{height} texture"
            )));
        }
        if texels.len() != region.byte_len() {
            return Err(RenderError::InvalidData(format!(
                "{} texel bytes for region {region:?}",
                texels.len()
            )));
        }
        if region.width == 0 || region.height == 0 {
            return Ok(());
        }

        write_texels(&self.queue, &texture.0.texture, region, texels);
        Ok(())
    }

    fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn bind_pipeline_state(&mut self, vertices: &WgpuBuffer, indices: &WgpuBuffer) {
        let Some(pass) = self.active_pass() else { return };
        pass.set_vertex_buffer(0, vertices.buffer.slice(..));
        pass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint16);
    }

    fn bind_texture(&mut self, slot: u32, texture: Option<&WgpuTexture>) {
        if slot != 0 {
            log::debug!("texture slot {slot} is not bound by the batch pipeline");
            return;
        }
        let texture = texture.unwrap_or(&self.white).clone();
        let Some(pass) = self.active_pass() else { return };
        pass.set_bind_group(1, &texture.0.bind_group, &[]);
    }

    fn set_scissor(&mut self, rect: Rect) {
        let scissor = rect.to_scissor(self.viewport, self.scale_factor);
        let Some(pass) = self.active_pass() else { return };
        match scissor {
            Some((x, y, w, h)) => {
                pass.set_scissor_rect(x, y, w, h);
                self.scissor_empty = false;
            }
            None => self.scissor_empty = true,
        }
    }

    fn draw_indexed(&mut self, index_count: u32, index_offset: u32, vertex_offset: u32) {
        if self.scissor_empty || index_count == 0 {
            return;
        }
        let Some(pass) = self.active_pass() else { return };
        pass.draw_indexed(index_offset..index_offset + index_count, vertex_offset as i32, 0..1);
    }
}
