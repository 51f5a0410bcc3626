//! Color model consumed by vertices and clear passes.

pub mod color;

pub use color::Color;
