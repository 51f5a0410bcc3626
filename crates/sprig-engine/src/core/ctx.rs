use winit::window::{Window, WindowId};

use crate::coords::Viewport;
use crate::device::{Gpu, SurfaceErrorAction, WgpuBackend};
use crate::paint::Color;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Logical window size.
    pub fn viewport(&self) -> Viewport {
        let phys = self.window.inner_size();
        Viewport::from_physical(phys.width, phys.height, self.scale_factor())
    }

    pub fn scale_factor(&self) -> f32 {
        self.window.scale_factor() as f32
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub backend: &'a mut WgpuBackend,
    /// Frames rendered by this window so far.
    pub frame_index: u64,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires a frame, clears it with `clear`, runs `draw` inside an open
    /// render pass, then presents.
    ///
    /// An error from `draw` is logged and the partial frame is still
    /// presented; device loss is picked up by the runtime before the next
    /// frame.
    pub fn render<F>(&mut self, clear: Color, draw: F) -> AppControl
    where
        F: FnOnce(&mut WgpuBackend) -> crate::Result<()>,
    {
        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => AppControl::Exit,
                    _ => AppControl::Continue,
                };
            }
        };

        self.backend.begin_pass(&mut frame.encoder, &frame.view, Some(clear));
        if let Err(err) = draw(self.backend) {
            log::warn!("frame {} degraded: {err}", self.frame_index);
        }
        // the encoder stays locked while the pass is open
        self.backend.end_pass();

        self.window.window.pre_present_notify();
        self.gpu.submit(frame);

        AppControl::Continue
    }
}
