use bytemuck::{Pod, Zeroable};

use crate::coords::Vec2;
use crate::paint::Color;

/// Index type of every batch. A single batch addresses at most 65536 vertices.
pub type Index = u16;

/// Vertex layout shared by every primitive (28 bytes):
///
///  offset  0  position  [f32; 4]   loc 0  (x, y, z = 0, w = 1)
///  offset 16  color     Unorm8x4   loc 1
///  offset 20  uv        [f32; 2]   loc 2
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 4],
    pub color: Color,
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x4, // position
        1 => Unorm8x4,  // color
        2 => Float32x2  // uv
    ];

    #[inline]
    pub fn new(position: Vec2, color: Color, uv: Vec2) -> Self {
        Self {
            position: [position.x, position.y, 0.0, 1.0],
            color,
            uv: [uv.x, uv.y],
        }
    }

    #[inline]
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.position[0], self.position[1])
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_28_bytes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 28);
    }

    #[test]
    fn new_sets_depth_and_w() {
        let v = Vertex::new(Vec2::new(3.0, 4.0), Color::BLACK, Vec2::new(0.5, 1.0));
        assert_eq!(v.position, [3.0, 4.0, 0.0, 1.0]);
        assert_eq!(v.uv, [0.5, 1.0]);
        assert_eq!(v.pos(), Vec2::new(3.0, 4.0));
    }
}
