mod scene;

use anyhow::Context;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use sprig_engine::atlas::TextureAtlas;
use sprig_engine::backend::{reset_all, DeviceResource};
use sprig_engine::core::{App, AppControl, FrameCtx};
use sprig_engine::device::{GpuInit, WgpuBackend};
use sprig_engine::logging::{init_logging, LoggingConfig};
use sprig_engine::paint::Color;
use sprig_engine::render::{DoubleBufferedQueue, QueueConfig};
use sprig_engine::text::{FontDesc, FontFlags, FontSystem, FontdueRasterizer, GlyphAtlas};
use sprig_engine::window::{Runtime, RuntimeConfig};

const BACKGROUND: Color = Color::rgb(18, 20, 28);
const FONT_FAMILY: &str = "body";

/// Device-bound state of the demo window.
struct Resources {
    queue: DoubleBufferedQueue<WgpuBackend>,
    icons: TextureAtlas<WgpuBackend>,
    font: Option<GlyphAtlas<WgpuBackend, FontdueRasterizer>>,
}

struct Studio {
    fonts: FontSystem,
    resources: Option<Resources>,
}

impl Studio {
    fn new(fonts: FontSystem) -> Self {
        Self { fonts, resources: None }
    }
}

impl App for Studio {
    fn on_init(&mut self, _window_id: WindowId, backend: &mut WgpuBackend) -> anyhow::Result<()> {
        let queue = DoubleBufferedQueue::create(backend, QueueConfig::default())?;
        let icons = scene::build_icons(backend).context("failed to build icon atlas")?;

        let font = if self.fonts.is_empty() {
            None
        } else {
            let desc = FontDesc::new(FONT_FAMILY, 18);
            let mut atlas = GlyphAtlas::new(self.fonts.rasterizer(&desc)?, desc);
            atlas.create(backend).context("failed to build glyph atlas")?;
            log::info!(
                "glyph atlas {}x{} with {} glyphs",
                atlas.width(),
                atlas.height(),
                atlas.glyph_count()
            );
            Some(atlas)
        };

        self.resources = Some(Resources { queue, icons, font });
        Ok(())
    }

    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(Resources { queue, icons, font }) = self.resources.as_mut() else {
            return AppControl::Continue;
        };

        let viewport = ctx.window.viewport();
        let seconds = ctx.frame_index as f32 / 60.0;

        let writing = queue.queue();
        writing.clear();
        scene::draw(writing, icons, font.as_ref(), viewport, seconds);
        queue.swap();

        ctx.render(BACKGROUND, |backend| queue.flush(backend))
    }

    fn on_device_reset(
        &mut self,
        _window_id: WindowId,
        backend: &mut WgpuBackend,
        pre_reset: bool,
    ) -> anyhow::Result<()> {
        let Some(res) = self.resources.as_mut() else {
            return Ok(());
        };

        let mut targets: Vec<&mut dyn DeviceResource<WgpuBackend>> = Vec::with_capacity(3);
        targets.push(&mut res.queue);
        targets.push(&mut res.icons);
        if let Some(font) = res.font.as_mut() {
            targets.push(font);
        }
        reset_all(backend, &mut targets, pre_reset)?;
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let mut fonts = FontSystem::new();
    match load_font() {
        Some(bytes) => {
            fonts.load_font(FONT_FAMILY, FontFlags::empty(), &bytes)?;
        }
        None => log::warn!("no system font found; text is not drawn"),
    }

    let config = RuntimeConfig {
        title: "sprig studio".to_string(),
        initial_size: LogicalSize::new(960.0, 600.0),
        sampler_filter: wgpu::FilterMode::Nearest,
    };

    Runtime::run(config, GpuInit::default(), Studio::new(fonts))
}

fn load_font() -> Option<Vec<u8>> {
    [
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
        "C:\\Windows\\Fonts\\segoeui.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok())
}
