//! Main pass: Phong shading with shadow lookup and selection highlight.

use std::collections::HashMap;

use crate::{
    camera::CameraResources,
    data_structures::{
        geometry::{ModelVertex, Vertex},
        instance::InstanceRaw,
        texture::{Texture, create_default_sampler},
    },
    error::Result,
    pipelines::{
        basic::{PipelineTarget, mk_pipeline_layout, mk_render_pipeline},
        light::LightResources,
        shadow::ShadowPass,
    },
    render::FrameDraws,
    resources::{ProgramHandle, ResourceManager, TextureHandle, wgpu_backend::WgpuBackend},
};

pub struct MainPass {
    program: ProgramHandle,
    pipeline: wgpu::RenderPipeline,
    depth_texture: Texture,
    shadow_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    texture_bind_groups: HashMap<TextureHandle, wgpu::BindGroup>,
}

impl MainPass {
    /// Compiles the Phong program. A failure here means nothing can be drawn.
    pub fn new(
        resources: &mut ResourceManager<WgpuBackend>,
        surface_format: wgpu::TextureFormat,
        size: [u32; 2],
        camera: &CameraResources,
        light: &LightResources,
        shadow: &ShadowPass,
    ) -> Result<Self> {
        let program = resources.compile_program(
            "phong",
            include_str!("phong_vertex.wgsl"),
            Some(include_str!("phong_fragment.wgsl")),
        )?;
        let device = resources.backend().device().clone();

        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            }],
            label: Some("shadow_map_bind_group_layout"),
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &shadow_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&shadow.map.view),
            }],
            label: Some("shadow_map_bind_group"),
        });
        let texture_layout = diffuse_layout(&device);

        let layout = mk_pipeline_layout(
            &device,
            "Phong Pipeline Layout",
            &[
                &camera.bind_group_layout,
                &light.bind_group_layout,
                &shadow_layout,
                &texture_layout,
            ],
        );
        let pipeline = {
            let modules = resources.program(program)?;
            mk_render_pipeline(
                &device,
                "Phong Pipeline",
                &layout,
                &modules.vertex,
                modules.fragment.as_ref(),
                &[ModelVertex::desc(), InstanceRaw::desc()],
                &PipelineTarget::color(surface_format),
            )?
        };

        Ok(Self {
            program,
            pipeline,
            depth_texture: Texture::create_depth_texture(&device, size, "depth_texture"),
            shadow_bind_group,
            texture_layout,
            sampler: create_default_sampler(&device),
            texture_bind_groups: HashMap::new(),
        })
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Recreates the depth buffer for a new surface size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Texture::create_depth_texture(device, [width, height], "depth_texture");
    }

    /// Creates bind groups for textures drawn this frame and drops those of
    /// released textures.
    fn prepare_textures(
        &mut self,
        resources: &ResourceManager<WgpuBackend>,
        draws: &FrameDraws,
        fallback: TextureHandle,
    ) {
        self.texture_bind_groups
            .retain(|handle, _| resources.is_live(*handle));
        let device = resources.backend().device();
        let wanted = draws
            .items
            .iter()
            .filter_map(|item| item.texture)
            .chain(std::iter::once(fallback));
        for handle in wanted {
            if self.texture_bind_groups.contains_key(&handle) {
                continue;
            }
            let texture = match resources.texture(handle) {
                Ok(texture) => texture,
                Err(e) => {
                    log::warn!("Texture {:?} unavailable: {}", handle, e);
                    continue;
                }
            };
            let sampler = texture.sampler.as_ref().unwrap_or(&self.sampler);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
                label: Some("diffuse_bind_group"),
            });
            self.texture_bind_groups.insert(handle, bind_group);
        }
    }

    /// Records the colour pass. Draws whose mesh or texture is gone are
    /// skipped. Returns the number of draws recorded.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clear_colour: wgpu::Color,
        camera: &CameraResources,
        light: &LightResources,
        draws: &FrameDraws,
        instances: &wgpu::Buffer,
        resources: &ResourceManager<WgpuBackend>,
        fallback: TextureHandle,
    ) -> u32 {
        self.prepare_textures(resources, draws, fallback);

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture.view,
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
        if draws.is_empty() {
            return 0;
        }

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &camera.bind_group, &[]);
        render_pass.set_bind_group(1, &light.bind_group, &[]);
        render_pass.set_bind_group(2, &self.shadow_bind_group, &[]);
        render_pass.set_vertex_buffer(1, instances.slice(..));

        let mut recorded = 0;
        for item in &draws.items {
            let mesh = match resources.mesh(item.mesh) {
                Ok(entry) => &entry.mesh,
                Err(e) => {
                    log::warn!("Skipping draw of {}: {}", item.entity, e);
                    continue;
                }
            };
            let texture = item
                .texture
                .and_then(|handle| self.texture_bind_groups.get(&handle))
                .or_else(|| self.texture_bind_groups.get(&fallback));
            let Some(texture) = texture else {
                log::warn!("Skipping draw of {}: no texture bound", item.entity);
                continue;
            };
            render_pass.set_bind_group(3, texture, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..mesh.num_elements, 0, item.instance..item.instance + 1);
            recorded += 1;
        }
        recorded
    }
}

pub fn diffuse_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("diffuse_bind_group_layout"),
    })
}
