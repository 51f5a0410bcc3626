//! CPU-side batching of 2D primitives.
//!
//! Convention:
//! - Geometry is in logical pixels (top-left origin, +Y down).
//! - One vertex format and one pipeline serve every primitive; batches
//!   differ only by the texture they sample.

mod buffer;
mod call;
mod double;
mod queue;
mod vertex;

pub use buffer::GrowableBuffer;
pub use call::DrawCall;
pub use double::DoubleBufferedQueue;
pub use queue::{QueueConfig, RenderQueue, MAX_BATCH_VERTICES};
pub use vertex::{Index, Vertex};
