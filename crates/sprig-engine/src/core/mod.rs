//! Core engine-facing contracts.
//!
//! This module defines the interface between the runtime (platform loop)
//! and applications: lifecycle callbacks, the two-phase device reset and
//! the per-frame context.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
