//! Texture packing.
//!
//! [`TextureAtlas`] shelf-packs images into one texture; [`UvRect`] is the
//! normalized rectangle every atlas hands out.

mod shelf;
mod texture;
mod uv;

pub use shelf::ShelfCursor;
pub use texture::{PixelFormat, TextureAtlas};
pub use uv::UvRect;
