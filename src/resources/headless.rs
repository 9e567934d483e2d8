//! CPU-only [`GpuBackend`] that keeps track of what would have been allocated.
//!
//! Used wherever there is no device to talk to: tooling, scene scripting and
//! the test-suite. An optional byte budget makes allocation failures
//! reproducible.

use crate::{
    data_structures::{
        geometry::{GeometryData, ModelVertex},
        texture::TextureImage,
    },
    error::{Result, RoomError, ShaderStage},
    resources::GpuBackend,
};

#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessMesh {
    pub label: String,
    pub vertex_count: usize,
    pub index_count: usize,
    pub bytes: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessProgram {
    pub label: String,
    pub has_fragment_stage: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    budget: Option<u64>,
    allocated: u64,
    meshes_created: usize,
    meshes_destroyed: usize,
    textures_created: usize,
    textures_destroyed: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails any allocation that would push the total above `bytes`.
    pub fn with_budget(bytes: u64) -> Self {
        Self {
            budget: Some(bytes),
            ..Self::default()
        }
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.allocated
    }

    pub fn meshes_created(&self) -> usize {
        self.meshes_created
    }

    pub fn meshes_destroyed(&self) -> usize {
        self.meshes_destroyed
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created
    }

    pub fn textures_destroyed(&self) -> usize {
        self.textures_destroyed
    }

    fn allocate(&mut self, resource: &str, bytes: u64) -> Result<()> {
        if let Some(budget) = self.budget {
            if self.allocated + bytes > budget {
                return Err(RoomError::ResourceExhaustion {
                    resource: resource.to_string(),
                    detail: format!(
                        "{bytes} bytes requested, {} of {budget} in use",
                        self.allocated
                    ),
                });
            }
        }
        self.allocated += bytes;
        Ok(())
    }
}

/// Entry points every program source has to declare.
fn check_entry_point(label: &str, stage: ShaderStage, source: &str, entry: &str) -> Result<()> {
    if source.contains(&format!("fn {entry}(")) {
        Ok(())
    } else {
        Err(RoomError::ShaderCompile {
            stage,
            label: label.to_string(),
            log: format!("entry point '{entry}' not found"),
        })
    }
}

impl GpuBackend for HeadlessBackend {
    type Mesh = HeadlessMesh;
    type Program = HeadlessProgram;
    type Texture = HeadlessTexture;

    fn create_mesh(&mut self, label: &str, geometry: &GeometryData) -> Result<Self::Mesh> {
        if geometry.is_empty() {
            return Err(RoomError::InvalidGeometry(format!("mesh '{label}' has no triangles")));
        }
        let bytes = (geometry.vertices.len() * std::mem::size_of::<ModelVertex>()
            + geometry.indices.len() * std::mem::size_of::<u16>()) as u64;
        self.allocate(label, bytes)?;
        self.meshes_created += 1;
        Ok(HeadlessMesh {
            label: label.to_string(),
            vertex_count: geometry.vertices.len(),
            index_count: geometry.indices.len(),
            bytes,
        })
    }

    fn destroy_mesh(&mut self, mesh: Self::Mesh) {
        self.allocated -= mesh.bytes;
        self.meshes_destroyed += 1;
    }

    fn compile_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: Option<&str>,
    ) -> Result<Self::Program> {
        check_entry_point(label, ShaderStage::Vertex, vertex_source, "vs_main")?;
        if let Some(fragment_source) = fragment_source {
            check_entry_point(label, ShaderStage::Fragment, fragment_source, "fs_main")?;
        }
        Ok(HeadlessProgram {
            label: label.to_string(),
            has_fragment_stage: fragment_source.is_some(),
        })
    }

    fn create_texture(&mut self, label: &str, image: &TextureImage) -> Result<Self::Texture> {
        self.allocate(label, image.byte_len())?;
        self.textures_created += 1;
        Ok(HeadlessTexture {
            label: label.to_string(),
            width: image.width,
            height: image.height,
            bytes: image.byte_len(),
        })
    }

    fn destroy_texture(&mut self, texture: Self::Texture) {
        self.allocated -= texture.bytes;
        self.textures_destroyed += 1;
    }
}
