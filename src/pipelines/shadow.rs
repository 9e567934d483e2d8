//! Shadow pass: scene depth as seen from the directional light.
//!
//! Recording goes through [`ShadowRecorder`], which can only be obtained from
//! [`ShadowPass::begin`] and must be finished with [`ShadowRecorder::end`], so
//! draws can never leak into the main pass.

use crate::{
    data_structures::{geometry::ModelVertex, geometry::Vertex, instance::InstanceRaw, texture::Texture},
    error::Result,
    pipelines::{
        basic::{PipelineTarget, mk_pipeline_layout, mk_render_pipeline},
        light::LightResources,
    },
    resources::{
        ProgramHandle, ResourceManager,
        wgpu_backend::{GpuMesh, WgpuBackend},
    },
};

pub struct ShadowPass {
    pub map: Texture,
    resolution: u32,
    program: ProgramHandle,
    pipeline: wgpu::RenderPipeline,
}

impl ShadowPass {
    /// Compiles the depth-only program and allocates the square shadow map.
    pub fn new(
        resources: &mut ResourceManager<WgpuBackend>,
        light: &LightResources,
        resolution: u32,
    ) -> Result<Self> {
        let program = resources.compile_program("shadow", include_str!("shadow.wgsl"), None)?;
        let device = resources.backend().device().clone();
        let layout = mk_pipeline_layout(&device, "Shadow Pipeline Layout", &[&light.bind_group_layout]);
        let pipeline = {
            let modules = resources.program(program)?;
            mk_render_pipeline(
                &device,
                "Shadow Pipeline",
                &layout,
                &modules.vertex,
                None,
                &[ModelVertex::desc(), InstanceRaw::desc()],
                &PipelineTarget::depth_only(),
            )?
        };
        let map = Texture::create_shadow_map(&device, resolution);
        log::info!("Shadow map {resolution}x{resolution} ready");
        Ok(Self {
            map,
            resolution,
            program,
            pipeline,
        })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Clears the shadow map and starts recording depth draws into it.
    pub fn begin<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        light: &LightResources,
        instances: &wgpu::Buffer,
    ) -> ShadowRecorder<'e> {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });
        let size = self.resolution as f32;
        pass.set_viewport(0.0, 0.0, size, size, 0.0, 1.0);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &light.bind_group, &[]);
        pass.set_vertex_buffer(1, instances.slice(..));
        ShadowRecorder { pass, draws: 0 }
    }
}

/// An open shadow pass.
pub struct ShadowRecorder<'e> {
    pass: wgpu::RenderPass<'e>,
    draws: u32,
}

impl ShadowRecorder<'_> {
    /// Draws `mesh` with the model matrix stored at `instance` in the
    /// instance buffer.
    pub fn render_mesh(&mut self, mesh: &GpuMesh, instance: u32) {
        self.pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.pass
            .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        self.pass
            .draw_indexed(0..mesh.num_elements, 0, instance..instance + 1);
        self.draws += 1;
    }

    /// Closes the pass and returns the number of draws recorded. The main
    /// pass sets its own viewport.
    pub fn end(self) -> u32 {
        self.draws
    }
}
