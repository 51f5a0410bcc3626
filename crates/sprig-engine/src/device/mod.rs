//! GPU device, surface and the wgpu rendering backend.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue and recovering them
//!   after device loss
//! - creating & configuring the Surface (swapchain)
//! - acquiring frames and providing encoders/views for rendering
//! - implementing [`crate::backend::GpuBackend`] on wgpu

mod backend;
mod error;
mod frame;
mod gpu;
mod init;
mod surface;

pub use backend::{BackendInit, WgpuBackend, WgpuBuffer, WgpuTexture};
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
