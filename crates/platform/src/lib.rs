//! Platform layer: windowing & event loop.
//!
//! Everything tied to the window (surface, device, buffers, input state)
//! lives in one [`AppContext`]. It is created on `resumed` and dropped on
//! close or on the first fatal error, which `run_with_renderer` returns.

mod fps;

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use asset::LoadedModel;
use corelib::orbit::OrbitController;
use renderer::GpuState;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::fps::FpsCounter;

/// Window and input settings for one run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub title: String,
    pub backends: wgpu::Backends,
    pub show_fps: bool,
    pub width: u32,
    pub height: u32,
    pub sensitivity: f32,
}

/// Open a window, render `model` until it is closed.
pub fn run_with_renderer(config: RunConfig, model: LoadedModel) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App {
        config,
        model,
        context: None,
        error: None,
    };

    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow!("Event loop error: {e:?}"))?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Resources that only exist while a window does.
struct AppContext {
    gpu: GpuState,
    window: Arc<Window>,
    orbit: OrbitController,
    fps: FpsCounter,
}

struct App {
    config: RunConfig,
    model: LoadedModel,
    context: Option<AppContext>,
    error: Option<anyhow::Error>,
}

impl App {
    fn create_context(&self, event_loop: &ActiveEventLoop) -> Result<AppContext> {
        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("Failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            self.config.backends,
            &self.model,
        ))?;

        Ok(AppContext {
            gpu,
            window,
            orbit: OrbitController::new(self.config.sensitivity),
            fps: FpsCounter::new(),
        })
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop, error: Option<anyhow::Error>) {
        if let Some(err) = &error {
            log::error!("Fatal: {err:#}");
        }
        self.error = self.error.take().or(error);
        self.context = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.is_some() {
            return;
        }
        match self.create_context(event_loop) {
            Ok(context) => self.context = Some(context),
            Err(err) => self.shutdown(event_loop, Some(err)),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };

        let fatal = match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                self.shutdown(event_loop, None);
                return;
            }
            WindowEvent::Resized(new_size) => {
                log::debug!("Resized: {}x{}", new_size.width, new_size.height);
                ctx.gpu.resize(new_size.width, new_size.height);
                None
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                // A Resized event follows with the new physical size.
                log::info!("Scale factor changed: {:.3}", scale_factor);
                None
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                match state {
                    ElementState::Pressed => ctx.orbit.press(),
                    ElementState::Released => ctx.orbit.release(),
                }
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                ctx.orbit.cursor_moved(position.x, position.y);
                None
            }
            WindowEvent::CursorLeft { .. } => {
                ctx.orbit.cursor_left();
                None
            }
            WindowEvent::RedrawRequested => match ctx.gpu.render(ctx.orbit.rotation()) {
                Ok(()) => {
                    if self.config.show_fps {
                        if let Some(fps) = ctx.fps.frame() {
                            log::info!("FPS: {:.1}", fps);
                        }
                    }
                    None
                }
                Err(err) if GpuState::is_surface_lost(&err) => {
                    log::warn!("Surface {err}; reconfiguring");
                    ctx.gpu.recreate_surface();
                    None
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    log::warn!("Surface timeout; skipping frame");
                    None
                }
                Err(err) => Some(anyhow!("Surface error: {err}")),
            },
            _ => None,
        };

        if let Some(err) = fatal {
            self.shutdown(event_loop, Some(err));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ctx) = &self.context {
            ctx.window.request_redraw();
        }
    }
}
