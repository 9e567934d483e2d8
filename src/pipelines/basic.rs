use crate::{
    data_structures::texture::Texture,
    error::{Result, RoomError, ShaderStage},
};

/// How a pipeline writes its output.
pub struct PipelineTarget {
    /// `None` builds a depth-only pipeline.
    pub color_format: Option<wgpu::TextureFormat>,
    pub blend: Option<wgpu::BlendState>,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_bias: wgpu::DepthBiasState,
}

impl PipelineTarget {
    pub fn color(format: wgpu::TextureFormat) -> Self {
        Self {
            color_format: Some(format),
            blend: Some(wgpu::BlendState {
                alpha: wgpu::BlendComponent::REPLACE,
                color: wgpu::BlendComponent::REPLACE,
            }),
            cull_mode: Some(wgpu::Face::Back),
            depth_bias: wgpu::DepthBiasState::default(),
        }
    }

    pub fn depth_only() -> Self {
        Self {
            color_format: None,
            blend: None,
            cull_mode: None,
            depth_bias: wgpu::DepthBiasState::default(),
        }
    }
}

/// Builds a triangle-list pipeline with a depth test from already compiled
/// shader modules. A missing fragment module makes the pipeline depth-only.
///
/// This is where the two stages are linked: mismatched stage interfaces or
/// bindings the layout does not provide are reported as a
/// [`ShaderStage::Link`] failure.
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    vertex: &wgpu::ShaderModule,
    fragment: Option<&wgpu::ShaderModule>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    target: &PipelineTarget,
) -> Result<wgpu::RenderPipeline> {
    let color_targets = [target.color_format.map(|format| wgpu::ColorTargetState {
        format,
        blend: target.blend,
        write_mask: wgpu::ColorWrites::ALL,
    })];
    let fragment = match (fragment, target.color_format) {
        (Some(module), Some(_)) => Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &color_targets,
            compilation_options: Default::default(),
        }),
        _ => None,
    };

    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: target.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: target.depth_bias,
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    });
    match futures::executor::block_on(scope.pop()) {
        None => Ok(pipeline),
        Some(error) => Err(RoomError::ShaderCompile {
            stage: ShaderStage::Link,
            label: label.to_string(),
            log: error.to_string(),
        }),
    }
}

pub fn mk_pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        immediate_size: 0,
    })
}
