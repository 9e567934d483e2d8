//! Application event loop.
//!
//! [`run`] opens a window and drives a [`RoomEngine`] from winit events. Each
//! redraw runs the camera update, applies finished texture loads and renders
//! the shadow and main passes, strictly in that order. Input handlers run
//! between frames on the same thread, so every edit is visible in the next
//! frame.

use std::sync::Arc;

use anyhow::Context as _;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use crate::{config::EngineConfig, engine::RoomEngine};

/// Pixels of trackpad scrolling that count as one wheel notch.
const PIXELS_PER_LINE: f64 = 50.0;

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: EngineConfig,
    engine: Option<RoomEngine>,
    cursor: PhysicalPosition<f64>,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        let async_runtime =
            tokio::runtime::Runtime::new().context("failed to start the texture runtime")?;
        Ok(Self {
            async_runtime,
            config,
            engine: None,
            cursor: PhysicalPosition::new(0.0, 0.0),
            last_time: Instant::now(),
            error: None,
        })
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<RoomEngine> {
        let window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create the window")?,
        );
        let handle = self.async_runtime.handle().clone();
        self.async_runtime
            .block_on(RoomEngine::new(window, self.config.clone(), handle))
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();

        let editor = engine.editor_mut();
        editor.update(dt);
        for notice in editor.take_notices() {
            log::warn!("{}", notice);
        }

        match engine.render() {
            Ok(stats) => log::trace!(
                "Frame: {} shadow / {} main draws",
                stats.shadow_draws,
                stats.main_draws
            ),
            Err(e) => {
                if !engine.handle_surface_error(e) {
                    event_loop.exit();
                    return;
                }
            }
        }
        engine.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(engine) => {
                engine.request_redraw();
                self.last_time = Instant::now();
                self.engine = Some(engine);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let WindowEvent::RedrawRequested = event {
            self.redraw(event_loop);
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => engine.resize(size.width, size.height),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position;
                engine
                    .editor_mut()
                    .on_pointer_move(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let editor = engine.editor_mut();
                match state {
                    ElementState::Pressed => {
                        editor.on_pointer_down(self.cursor.x as f32, self.cursor.y as f32)
                    }
                    ElementState::Released => editor.on_pointer_up(),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_LINE) as f32,
                };
                engine.editor_mut().on_scroll(lines);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let editor = engine.editor_mut();
                match event.state {
                    ElementState::Pressed => {
                        editor.on_key_down(code);
                    }
                    ElementState::Released => {
                        editor.on_key_up(code);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Opens the room designer window and blocks until it is closed.
pub fn run(config: EngineConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let event_loop = EventLoop::new().context("failed to create the event loop")?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;

    // drop GPU resources before the runtime goes away
    app.engine = None;
    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
