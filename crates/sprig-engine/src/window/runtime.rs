use anyhow::{Context, Result};
use ouroboros::self_referencing;
use std::collections::HashMap;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::Viewport;
use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{BackendInit, Gpu, GpuInit, WgpuBackend};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Texture filtering of the window's backend.
    pub sampler_filter: wgpu::FilterMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "sprig".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            sampler_filter: wgpu::FilterMode::Nearest,
        }
    }
}

/// Runtime context passed to the application.
///
/// Commands are buffered and applied after the current callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn create_window(&mut self, config: RuntimeConfig) {
        self.commands.push(Command::CreateWindow(config));
    }

    pub fn close_window(&mut self, id: WindowId) {
        self.commands.push(Command::CloseWindow(id));
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }
}

enum Command {
    CreateWindow(RuntimeConfig),
    CloseWindow(WindowId),
    Exit,
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(initial: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(initial, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    frame_index: u64,
    sampler_filter: wgpu::FilterMode,

    /// `None` only while the device is being replaced.
    backend: Option<WgpuBackend>,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

fn new_backend(gpu: &Gpu<'_>, window: &Window, sampler_filter: wgpu::FilterMode) -> Result<WgpuBackend> {
    let scale_factor = window.scale_factor() as f32;
    let size = gpu.size();
    let init = BackendInit {
        sampler_filter,
        viewport: Viewport::from_physical(size.width, size.height, scale_factor),
        scale_factor,
    };
    WgpuBackend::new(gpu.device(), gpu.queue(), gpu.surface_format(), init)
        .context("failed to create render backend")
}

/// Runs the two-phase reset around a device replacement.
fn recover_device<A: CoreApp>(
    app: &mut A,
    window_id: WindowId,
    window: &Window,
    gpu: &mut Gpu<'_>,
    slot: &mut Option<WgpuBackend>,
    sampler_filter: wgpu::FilterMode,
) -> Result<()> {
    if let Some(backend) = slot.as_mut() {
        if let Err(e) = app.on_device_reset(window_id, backend, true) {
            log::warn!("pre-reset failed: {e:#}");
        }
    }
    *slot = None;

    gpu.recover()?;

    let mut backend = new_backend(gpu, window, sampler_filter)?;
    app.on_device_reset(window_id, &mut backend, false)
        .context("failed to restore device resources")?;
    *slot = Some(backend);
    Ok(())
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    initial: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    windows: HashMap<WindowId, WindowEntry>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(initial: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            initial,
            gpu_init,
            app,
            windows: HashMap::new(),
            exit_requested: false,
        }
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn create_window_entry(
        &mut self,
        event_loop: &ActiveEventLoop,
        config: RuntimeConfig,
    ) -> Result<WindowId> {
        let attrs = Window::default_attributes()
            .with_title(config.title)
            .with_inner_size(config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let id = window.id();
        let gpu_init = self.gpu_init.clone();

        let mut entry = WindowEntryTryBuilder {
            frame_index: 0,
            sampler_filter: config.sampler_filter,
            backend: None,
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        let app = &mut self.app;
        entry.with_mut(|fields| -> Result<()> {
            let mut backend = new_backend(fields.gpu, fields.window, *fields.sampler_filter)?;
            app.on_init(id, &mut backend).context("application init failed")?;
            *fields.backend = Some(backend);
            Ok(())
        })?;

        self.windows.insert(id, entry);
        Ok(id)
    }

    fn destroy_window_entry(&mut self, id: WindowId) {
        self.windows.remove(&id);
    }

    fn apply_commands(&mut self, event_loop: &ActiveEventLoop, mut ctx: RuntimeCtx) {
        for cmd in ctx.commands.drain(..) {
            match cmd {
                Command::CreateWindow(cfg) => {
                    if let Err(e) = self.create_window_entry(event_loop, cfg) {
                        log::error!("failed to create window: {e:#}");
                        self.request_exit();
                    }
                }
                Command::CloseWindow(id) => self.destroy_window_entry(id),
                Command::Exit => self.request_exit(),
            }
        }

        if self.windows.is_empty() {
            self.request_exit();
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }

    fn resize(&mut self, window_id: WindowId) {
        let Some(entry) = self.windows.get_mut(&window_id) else {
            return;
        };
        entry.with_mut(|fields| {
            let size = fields.window.inner_size();
            fields.gpu.resize(size);
            if size.width == 0 || size.height == 0 {
                return;
            }
            let scale_factor = fields.window.scale_factor() as f32;
            if let Some(backend) = fields.backend.as_mut() {
                backend.set_viewport(
                    Viewport::from_physical(size.width, size.height, scale_factor),
                    scale_factor,
                );
            }
        });
        entry.with_window(|w| w.request_redraw());
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId) {
        let mut runtime_ctx = RuntimeCtx::default();
        let mut app_control = AppControl::Continue;
        let mut failure = None;

        let (app, windows) = (&mut self.app, &mut self.windows);
        if let Some(entry) = windows.get_mut(&window_id) {
            entry.with_mut(|fields| {
                if fields.gpu.device_lost() {
                    if let Err(e) = recover_device(
                        app,
                        window_id,
                        fields.window,
                        fields.gpu,
                        fields.backend,
                        *fields.sampler_filter,
                    ) {
                        failure = Some(e);
                        return;
                    }
                }

                let size = fields.gpu.size();
                if size.width == 0 || size.height == 0 {
                    return;
                }
                let Some(backend) = fields.backend.as_mut() else {
                    return;
                };

                let mut ctx = FrameCtx {
                    window: WindowCtx {
                        id: window_id,
                        window: fields.window,
                    },
                    gpu: fields.gpu,
                    backend,
                    frame_index: *fields.frame_index,
                    runtime: &mut runtime_ctx,
                };
                app_control = app.on_frame(&mut ctx);
                *fields.frame_index += 1;
            });
        }

        if let Some(e) = failure {
            log::error!("GPU device could not be recovered: {e:#}");
            runtime_ctx.exit();
        }
        if app_control == AppControl::Exit {
            runtime_ctx.exit();
        }

        self.apply_commands(event_loop, runtime_ctx);
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.windows.is_empty() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop, self.initial.clone()) {
            log::error!("failed to create initial window: {e:#}");
            self.request_exit();
            event_loop.exit();
            return;
        }

        for entry in self.windows.values() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // immediate mode: every window is redrawn continuously
        for entry in self.windows.values() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        if !self.windows.contains_key(&window_id) {
            return;
        }

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.request_exit();
            event_loop.exit();
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.destroy_window_entry(window_id);
                if self.windows.is_empty() {
                    self.request_exit();
                    event_loop.exit();
                }
            }

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.resize(window_id);
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop, window_id),

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}
