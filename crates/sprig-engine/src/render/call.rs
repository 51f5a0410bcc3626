use crate::coords::Rect;

/// One entry of a render queue's replay list.
///
/// `T` is the backend's texture handle. `Triangles` counts are relative to
/// the running offsets of the replay: each batch's indices refer to its own
/// first vertex.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall<T> {
    Triangles {
        /// `None` draws with the backend's default white texture.
        texture: Option<T>,
        vertex_count: u32,
        index_count: u32,
        primitive_count: u32,
    },
    Scissor(Rect),
}

impl<T> DrawCall<T> {
    #[inline]
    pub fn is_triangles(&self) -> bool {
        matches!(self, DrawCall::Triangles { .. })
    }
}
