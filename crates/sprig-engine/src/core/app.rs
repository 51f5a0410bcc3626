use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::device::WgpuBackend;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
///
/// Everything an app creates through a window's backend (render queues,
/// atlases) belongs to that window's device and must follow
/// [`on_device_reset`](Self::on_device_reset).
pub trait App {
    /// Called once per window after its GPU and backend exist.
    fn on_init(&mut self, window_id: WindowId, backend: &mut WgpuBackend) -> anyhow::Result<()> {
        let _ = (window_id, backend);
        Ok(())
    }

    /// Called for window events.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per rendered frame per window.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Two-phase device reset.
    ///
    /// With `pre_reset == true` every device object must be released; the
    /// backend passed in is about to be dropped. With `pre_reset == false`
    /// the backend is new and resources are recreated on it.
    fn on_device_reset(
        &mut self,
        window_id: WindowId,
        backend: &mut WgpuBackend,
        pre_reset: bool,
    ) -> anyhow::Result<()> {
        let _ = (window_id, backend, pre_reset);
        Ok(())
    }
}
