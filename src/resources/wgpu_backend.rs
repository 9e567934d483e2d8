use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        geometry::{GeometryData, ModelVertex},
        texture::{Texture, TextureImage},
    },
    error::{Result, RoomError, ShaderStage},
    resources::GpuBackend,
};

/// Vertex and index buffers of one uploaded mesh.
#[derive(Debug)]
pub struct GpuMesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

/// Compiled shader stages of one program. Pipelines are built from these by
/// the passes that own them.
#[derive(Debug)]
pub struct GpuProgram {
    pub label: String,
    pub vertex: wgpu::ShaderModule,
    pub fragment: Option<wgpu::ShaderModule>,
}

/// [`GpuBackend`] on a real WGPU device.
///
/// Device and queue are reference counted by WGPU internally, so this holds
/// cheap clones of the ones owned by the context.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Compiles one WGSL stage, turning validation errors and compiler
    /// messages into a [`RoomError::ShaderCompile`].
    fn compile_stage(&self, label: &str, stage: ShaderStage, source: &str) -> Result<wgpu::ShaderModule> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} ({stage})")),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let scope_error = futures::executor::block_on(scope.pop());
        let info = futures::executor::block_on(module.get_compilation_info());

        let mut log: Vec<String> = info
            .messages
            .iter()
            .filter(|message| matches!(message.message_type, wgpu::CompilationMessageType::Error))
            .map(|message| match &message.location {
                Some(location) => format!(
                    "{}:{}: {}",
                    location.line_number, location.line_position, message.message
                ),
                None => message.message.clone(),
            })
            .collect();
        if let Some(error) = scope_error {
            log.push(error.to_string());
        }
        if log.is_empty() {
            Ok(module)
        } else {
            Err(RoomError::ShaderCompile {
                stage,
                label: label.to_string(),
                log: log.join("\n"),
            })
        }
    }
}

impl GpuBackend for WgpuBackend {
    type Mesh = GpuMesh;
    type Program = GpuProgram;
    type Texture = Texture;

    fn create_mesh(&mut self, label: &str, geometry: &GeometryData) -> Result<Self::Mesh> {
        if geometry.is_empty() {
            return Err(RoomError::InvalidGeometry(format!("mesh '{label}' has no triangles")));
        }
        let vertex_bytes = (geometry.vertices.len() * std::mem::size_of::<ModelVertex>()) as u64;
        let max_buffer_size = self.device.limits().max_buffer_size;
        if vertex_bytes > max_buffer_size {
            return Err(RoomError::ResourceExhaustion {
                resource: format!("{label} vertex buffer"),
                detail: format!("{vertex_bytes} bytes exceed the device limit of {max_buffer_size}"),
            });
        }

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(GpuMesh {
            name: label.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: geometry.indices.len() as u32,
        })
    }

    fn destroy_mesh(&mut self, mesh: Self::Mesh) {
        log::debug!("Destroying mesh '{}'", mesh.name);
        mesh.vertex_buffer.destroy();
        mesh.index_buffer.destroy();
    }

    fn compile_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: Option<&str>,
    ) -> Result<Self::Program> {
        let vertex = self.compile_stage(label, ShaderStage::Vertex, vertex_source)?;
        let fragment = fragment_source
            .map(|source| self.compile_stage(label, ShaderStage::Fragment, source))
            .transpose()?;
        Ok(GpuProgram {
            label: label.to_string(),
            vertex,
            fragment,
        })
    }

    fn create_texture(&mut self, label: &str, image: &TextureImage) -> Result<Self::Texture> {
        let max = self.device.limits().max_texture_dimension_2d;
        if image.width > max || image.height > max {
            return Err(RoomError::ResourceExhaustion {
                resource: format!("texture '{label}'"),
                detail: format!(
                    "{}x{} exceeds the device limit of {max}x{max}",
                    image.width, image.height
                ),
            });
        }
        Ok(Texture::from_image(&self.device, &self.queue, image, Some(label)))
    }

    fn destroy_texture(&mut self, texture: Self::Texture) {
        texture.texture.destroy();
    }
}
