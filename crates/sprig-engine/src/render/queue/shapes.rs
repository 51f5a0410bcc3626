use std::f32::consts::TAU;

use crate::atlas::UvRect;
use crate::backend::GpuBackend;
use crate::coords::{Rect, Vec2};
use crate::paint::Color;
use crate::render::call::DrawCall;
use crate::render::vertex::{Index, Vertex};

use super::{RenderQueue, MAX_BATCH_VERTICES};

impl<B: GpuBackend> RenderQueue<B> {
    /// Axis-aligned rectangle; corners are snapped down to whole pixels.
    pub fn push_filled_rectangle(
        &mut self,
        position: Vec2,
        size: Vec2,
        color: Color,
        texture: Option<&B::Texture>,
        uv: UvRect,
    ) {
        self.push_gradient_rectangle(position, size, [color; 4], texture, uv);
    }

    /// Rectangle with one color per corner: top-left, top-right,
    /// bottom-left, bottom-right.
    pub fn push_gradient_rectangle(
        &mut self,
        position: Vec2,
        size: Vec2,
        colors: [Color; 4],
        texture: Option<&B::Texture>,
        uv: UvRect,
    ) {
        let min = position.floor();
        let max = (position + size).floor();
        let [top_left, top_right, bottom_left, bottom_right] = colors;

        self.push_quad(
            texture,
            [
                Vertex::new(min, top_left, uv.min()),
                Vertex::new(Vec2::new(max.x, min.y), top_right, Vec2::new(uv.u_max, uv.v_min)),
                Vertex::new(max, bottom_right, uv.max()),
                Vertex::new(Vec2::new(min.x, max.y), bottom_left, Vec2::new(uv.u_min, uv.v_max)),
            ],
        );
    }

    pub fn push_filled_triangle(
        &mut self,
        points: [Vec2; 3],
        colors: [Color; 3],
        texture: Option<&B::Texture>,
        uvs: [Vec2; 3],
    ) {
        self.push_group(texture, 3, 3, 1, |vtx, idx| {
            for (i, slot) in vtx.iter_mut().enumerate() {
                *slot = Vertex::new(points[i], colors[i], uvs[i]);
            }
            idx.copy_from_slice(&[0, 1, 2]);
        });
    }

    /// Line of `width` pixels drawn as a quad around the segment.
    pub fn push_line(&mut self, p1: Vec2, p2: Vec2, color: Color, width: f32) {
        let delta = p2 - p1;
        let length = delta.length() + f32::EPSILON;
        let scale = width / (2.0 * length);
        let radius = Vec2::new(-scale * delta.y, scale * delta.x);

        self.push_quad(
            None,
            [
                Vertex::new(p1 - radius, color, Vec2::new(0.0, 0.0)),
                Vertex::new(p1 + radius, color, Vec2::new(1.0, 0.0)),
                Vertex::new(p2 + radius, color, Vec2::new(0.0, 1.0)),
                Vertex::new(p2 - radius, color, Vec2::new(1.0, 1.0)),
            ],
        );
    }

    /// Triangle fan around `center` with `segments` rim vertices.
    ///
    /// Fewer than 3 segments draws nothing.
    pub fn push_filled_circle(
        &mut self,
        center: Vec2,
        radius: f32,
        segments: u32,
        center_color: Color,
        outer_color: Color,
    ) {
        if segments < 3 || segments >= MAX_BATCH_VERTICES {
            log::debug!("circle with {segments} segments ignored");
            return;
        }

        let n = segments as usize;
        self.push_group(None, n + 1, n * 3, segments, |vtx, idx| {
            vtx[0] = Vertex::new(center, center_color, Vec2::zero());
            for i in 0..n {
                let theta = TAU * i as f32 / segments as f32;
                let rim = center + Vec2::new(theta.cos(), theta.sin()) * radius;
                vtx[i + 1] = Vertex::new(rim, outer_color, Vec2::zero());
            }
            for (i, tri) in idx.chunks_exact_mut(3).enumerate() {
                let next = if i + 1 == n { 1 } else { i + 2 };
                tri.copy_from_slice(&[0, (i + 1) as Index, next as Index]);
            }
        });
    }

    /// Restricts the following draws to `position`/`size` (logical pixels).
    pub fn push_scissor(&mut self, position: Vec2, size: Vec2) {
        self.calls.push(DrawCall::Scissor(Rect::from_origin_size(position, size)));
    }
}
