//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Windows, and wires each window to its GPU
//! context and render backend, including recovery after device loss.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
