//! sprig engine crate.
//!
//! Immediate-mode 2D batching renderer: a render queue turns rectangles,
//! triangles, lines, circles and text into as few indexed draws as
//! possible, glyph and texture atlases pack images into shared textures,
//! and a wgpu backend plus a winit runtime put the result on screen.

pub mod atlas;
pub mod backend;
pub mod coords;
pub mod core;
pub mod device;
pub mod error;
pub mod logging;
pub mod paint;
pub mod render;
pub mod text;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{RenderError, Result};
