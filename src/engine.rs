//! The windowed engine: an [`Editor`] on a real device plus the renderer.

use std::sync::Arc;

use winit::window::Window;

use crate::{
    config::EngineConfig,
    context::Context,
    editor::Editor,
    pipelines::light::DirectionalLight,
    render::{FrameStats, Renderer},
    resources::wgpu_backend::WgpuBackend,
};

pub struct RoomEngine {
    ctx: Context,
    editor: Editor<WgpuBackend>,
    renderer: Renderer,
}

impl RoomEngine {
    /// Sets up the device, builds the room and compiles both render programs.
    /// Any failure here is fatal.
    pub async fn new(
        window: Arc<Window>,
        config: EngineConfig,
        runtime: tokio::runtime::Handle,
    ) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        let backend = WgpuBackend::new(ctx.device.clone(), ctx.queue.clone());
        let mut editor = Editor::new(backend, config, runtime)?;
        let [width, height] = ctx.size();
        editor.resize(width, height);

        let config = editor.config().clone();
        let rig = *editor.camera();
        let renderer = Renderer::new(
            editor.resources_mut(),
            &config,
            &rig,
            ctx.config.format,
            [width, height],
        )?;
        log::info!("Room engine ready");
        Ok(Self {
            ctx,
            editor,
            renderer,
        })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn editor(&self) -> &Editor<WgpuBackend> {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor<WgpuBackend> {
        &mut self.editor
    }

    pub fn light(&self) -> &DirectionalLight {
        self.renderer.light()
    }

    pub fn set_light(&mut self, light: DirectionalLight) {
        let config = self.editor.config().clone();
        self.renderer.set_light(&self.ctx.queue, light, &config);
    }

    pub fn request_redraw(&self) {
        self.ctx.window().request_redraw();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.editor.resize(width, height);
            self.renderer.resize(&self.ctx.device, width, height);
        }
    }

    /// Renders one frame to the window.
    pub fn render(&mut self) -> Result<FrameStats, wgpu::SurfaceError> {
        if !self.ctx.is_surface_configured() {
            return Ok(FrameStats::default());
        }
        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let stats = self.renderer.render(&view, &self.editor);
        self.ctx.window().pre_present_notify();
        output.present();
        Ok(stats)
    }

    /// Recovers from a failed frame where possible. Returns `false` when the
    /// error is fatal.
    pub fn handle_surface_error(&mut self, error: wgpu::SurfaceError) -> bool {
        match error {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                let size = self.ctx.window().inner_size();
                self.resize(size.width, size.height);
                true
            }
            wgpu::SurfaceError::OutOfMemory => {
                log::error!("Out of memory while acquiring a frame");
                false
            }
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => {
                log::warn!("Skipping frame: {}", error);
                true
            }
        }
    }
}

impl Drop for RoomEngine {
    fn drop(&mut self) {
        self.editor.shutdown();
    }
}
