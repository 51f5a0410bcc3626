use crate::backend::{DeviceResource, GpuBackend};
use crate::error::Result;

use super::queue::{QueueConfig, RenderQueue};

/// Two render queues: one being written, one being flushed.
///
/// While the toggle is `false` the front queue is written and the back queue
/// flushed; [`swap`](Self::swap) exchanges the roles. Writing and flushing
/// both need `&mut self`, so the two sides are never used concurrently.
pub struct DoubleBufferedQueue<B: GpuBackend> {
    front: RenderQueue<B>,
    back: RenderQueue<B>,
    swapped: bool,
}

impl<B: GpuBackend> DoubleBufferedQueue<B> {
    pub fn create(backend: &mut B, config: QueueConfig) -> Result<Self> {
        Ok(Self {
            front: RenderQueue::create(backend, config)?,
            back: RenderQueue::create(backend, config)?,
            swapped: false,
        })
    }

    #[inline]
    pub fn swap(&mut self) {
        self.swapped = !self.swapped;
    }

    /// The queue currently accepting draw calls.
    pub fn queue(&mut self) -> &mut RenderQueue<B> {
        if self.swapped { &mut self.back } else { &mut self.front }
    }

    /// The queue the next [`flush`](Self::flush) replays.
    pub fn flushing_queue(&self) -> &RenderQueue<B> {
        if self.swapped { &self.front } else { &self.back }
    }

    pub fn flush(&mut self, backend: &mut B) -> Result<()> {
        let side = if self.swapped { &mut self.front } else { &mut self.back };
        side.flush(backend)
    }
}

impl<B: GpuBackend> DeviceResource<B> for DoubleBufferedQueue<B> {
    fn reset(&mut self, backend: &mut B, pre_reset: bool) -> Result<()> {
        let front = self.front.reset(backend, pre_reset);
        let back = self.back.reset(backend, pre_reset);
        front.and(back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::UvRect;
    use crate::coords::Vec2;
    use crate::paint::Color;
    use crate::testing::{GpuCall, RecordingBackend};

    fn small() -> QueueConfig {
        QueueConfig { initial_vertices: 16, initial_indices: 32 }
    }

    fn rect(q: &mut RenderQueue<RecordingBackend>) {
        q.push_filled_rectangle(Vec2::zero(), Vec2::new(4.0, 4.0), Color::WHITE, None, UvRect::FULL);
    }

    #[test]
    fn swap_exchanges_writer_and_flusher() {
        let mut gpu = RecordingBackend::new();
        let mut dbq = DoubleBufferedQueue::create(&mut gpu, small()).unwrap();

        rect(dbq.queue());
        assert!(dbq.flushing_queue().is_empty());

        dbq.swap();
        assert_eq!(dbq.flushing_queue().draw_calls().len(), 1);
        assert!(dbq.queue().is_empty());
    }

    #[test]
    fn flush_replays_only_the_swapped_out_side() {
        let mut gpu = RecordingBackend::new();
        let mut dbq = DoubleBufferedQueue::create(&mut gpu, small()).unwrap();

        rect(dbq.queue());
        dbq.flush(&mut gpu).unwrap();
        assert!(gpu.draws().is_empty());

        dbq.swap();
        dbq.flush(&mut gpu).unwrap();
        assert_eq!(gpu.draws(), vec![(6, 0, 0)]);
    }

    #[test]
    fn reset_covers_both_sides() {
        let mut gpu = RecordingBackend::new();
        let mut dbq = DoubleBufferedQueue::create(&mut gpu, small()).unwrap();
        gpu.clear_calls();

        dbq.reset(&mut gpu, true).unwrap();
        assert_eq!(gpu.released().len(), 4);

        dbq.reset(&mut gpu, false).unwrap();
        assert_eq!(gpu.count(|c| matches!(c, GpuCall::CreateBuffer { .. })), 4);
    }
}
