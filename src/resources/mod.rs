//! GPU resource ownership.
//!
//! [`ResourceManager`] hands out opaque, generation-checked handles for meshes,
//! shader programs and textures created through a [`GpuBackend`]. Handles are
//! plain `Copy` values: the manager is the only owner of the underlying GPU
//! objects, and a handle that outlived its resource simply stops resolving.
//!
//! Box meshes are deduplicated by their dimensions and reference counted, so
//! the four identical legs of a table share one vertex/index buffer pair which
//! is freed when the last leg is released. Every acquisition gets its own
//! [`MeshHandle`] lease: releasing a lease twice is a no-op and can never drop
//! a reference held by another owner. Textures are reference counted too:
//! the placeholder is shared by every entity still waiting for its own.

use std::collections::HashMap;

use cgmath::Vector3;

use crate::{
    data_structures::{
        geometry::{GeometryData, build_box},
        texture::TextureImage,
    },
    error::{Result, RoomError},
};

pub mod headless;
pub mod procedural;
pub mod texture;
pub mod wgpu_backend;

/// The graphics API seen by the resource manager.
///
/// Creation reports failure instead of returning null objects; destruction
/// consumes the resource so it can never be used again.
pub trait GpuBackend {
    type Mesh;
    type Program;
    type Texture;

    fn create_mesh(&mut self, label: &str, geometry: &GeometryData) -> Result<Self::Mesh>;

    fn destroy_mesh(&mut self, mesh: Self::Mesh) {
        drop(mesh);
    }

    /// Compiles a program. Depth-only programs pass no fragment source.
    fn compile_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: Option<&str>,
    ) -> Result<Self::Program>;

    fn destroy_program(&mut self, program: Self::Program) {
        drop(program);
    }

    fn create_texture(&mut self, label: &str, image: &TextureImage) -> Result<Self::Texture>;

    fn destroy_texture(&mut self, texture: Self::Texture) {
        drop(texture);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SlotId {
    index: u32,
    generation: u32,
}

/// One owner's lease on a mesh. Owners of a shared box each hold a distinct
/// handle; use [`ResourceManager::same_mesh`] to compare the geometry behind
/// two handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(SlotId);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(SlotId);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(SlotId);

/// Any handle the manager can release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceHandle {
    Mesh(MeshHandle),
    Program(ProgramHandle),
    Texture(TextureHandle),
}

impl From<MeshHandle> for ResourceHandle {
    fn from(handle: MeshHandle) -> Self {
        ResourceHandle::Mesh(handle)
    }
}

impl From<ProgramHandle> for ResourceHandle {
    fn from(handle: ProgramHandle) -> Self {
        ResourceHandle::Program(handle)
    }
}

impl From<TextureHandle> for ResourceHandle {
    fn from(handle: TextureHandle) -> Self {
        ResourceHandle::Texture(handle)
    }
}

/// Generational slot storage. Freed slots are reused with a bumped generation
/// so stale handles never alias a newer resource.
struct Slots<T> {
    entries: Vec<(u32, Option<T>)>,
    free: Vec<u32>,
}

impl<T> Slots<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
        }
    }

    fn insert(&mut self, value: T) -> SlotId {
        match self.free.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.0 = entry.0.wrapping_add(1);
                entry.1 = Some(value);
                SlotId {
                    index,
                    generation: entry.0,
                }
            }
            None => {
                self.entries.push((0, Some(value)));
                SlotId {
                    index: (self.entries.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    fn get(&self, id: SlotId) -> Option<&T> {
        match self.entries.get(id.index as usize) {
            Some((generation, Some(value))) if *generation == id.generation => Some(value),
            _ => None,
        }
    }

    fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        match self.entries.get_mut(id.index as usize) {
            Some((generation, Some(value))) if *generation == id.generation => Some(value),
            _ => None,
        }
    }

    fn remove(&mut self, id: SlotId) -> Option<T> {
        let entry = self.entries.get_mut(id.index as usize)?;
        if entry.0 != id.generation {
            return None;
        }
        let value = entry.1.take()?;
        self.free.push(id.index);
        Some(value)
    }

    fn len(&self) -> usize {
        self.entries.iter().filter(|(_, value)| value.is_some()).count()
    }

    fn drain(&mut self) -> Vec<T> {
        let mut drained = Vec::new();
        for (index, (generation, value)) in self.entries.iter_mut().enumerate() {
            if let Some(value) = value.take() {
                *generation = generation.wrapping_add(1);
                self.free.push(index as u32);
                drained.push(value);
            }
        }
        drained
    }
}

/// Dimensions of a deduplicated box mesh, compared bit for bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryKey([u32; 3]);

impl GeometryKey {
    pub fn for_box(size: Vector3<f32>) -> Self {
        // + 0.0 folds -0.0 into 0.0
        Self([
            (size.x + 0.0).to_bits(),
            (size.y + 0.0).to_bits(),
            (size.z + 0.0).to_bits(),
        ])
    }
}

/// An uploaded mesh together with its draw parameters.
pub struct MeshEntry<M> {
    pub mesh: M,
    pub index_count: u32,
    ref_count: u32,
    key: Option<GeometryKey>,
}

impl<M> MeshEntry<M> {
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }
}

struct TextureEntry<T> {
    texture: T,
    ref_count: u32,
}

pub struct ResourceManager<B: GpuBackend> {
    backend: B,
    meshes: Slots<MeshEntry<B::Mesh>>,
    mesh_leases: Slots<SlotId>,
    shared_meshes: HashMap<GeometryKey, SlotId>,
    programs: Slots<B::Program>,
    textures: Slots<TextureEntry<B::Texture>>,
}

impl<B: GpuBackend> ResourceManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            meshes: Slots::new(),
            mesh_leases: Slots::new(),
            shared_meshes: HashMap::new(),
            programs: Slots::new(),
            textures: Slots::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Uploads geometry owned exclusively by the caller.
    pub fn upload_geometry(&mut self, label: &str, geometry: &GeometryData) -> Result<MeshHandle> {
        self.insert_mesh(label, geometry, None)
    }

    /// Leases the shared box mesh of the given dimensions, uploading it on
    /// first use. The returned handle belongs to this caller alone.
    pub fn acquire_box(&mut self, size: Vector3<f32>) -> Result<MeshHandle> {
        let key = GeometryKey::for_box(size);
        if let Some(id) = self.shared_meshes.get(&key).copied() {
            if let Some(entry) = self.meshes.get_mut(id) {
                entry.ref_count += 1;
                log::debug!(
                    "Reusing box mesh {:?} ({} owners)",
                    size,
                    entry.ref_count
                );
                return Ok(MeshHandle(self.mesh_leases.insert(id)));
            }
            self.shared_meshes.remove(&key);
        }
        let geometry = build_box(size.x, size.y, size.z);
        let label = format!("box {:.3}x{:.3}x{:.3}", size.x, size.y, size.z);
        self.insert_mesh(&label, &geometry, Some(key))
    }

    fn insert_mesh(
        &mut self,
        label: &str,
        geometry: &GeometryData,
        key: Option<GeometryKey>,
    ) -> Result<MeshHandle> {
        let mesh = self.backend.create_mesh(label, geometry)?;
        let entry = MeshEntry {
            mesh,
            index_count: geometry.indices.len() as u32,
            ref_count: 1,
            key,
        };
        let id = self.meshes.insert(entry);
        if let Some(key) = key {
            self.shared_meshes.insert(key, id);
        }
        Ok(MeshHandle(self.mesh_leases.insert(id)))
    }

    fn mesh_id(&self, handle: MeshHandle) -> Option<SlotId> {
        self.mesh_leases.get(handle.0).copied()
    }

    pub fn mesh(&self, handle: MeshHandle) -> Result<&MeshEntry<B::Mesh>> {
        self.mesh_id(handle)
            .and_then(|id| self.meshes.get(id))
            .ok_or(RoomError::InvalidHandle)
    }

    /// Whether two live leases refer to the same uploaded geometry.
    pub fn same_mesh(&self, a: MeshHandle, b: MeshHandle) -> bool {
        match (self.mesh_id(a), self.mesh_id(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn mesh_ref_count(&self, handle: MeshHandle) -> Option<u32> {
        self.meshes
            .get(self.mesh_id(handle)?)
            .map(|entry| entry.ref_count)
    }

    /// Compiles a program; the caller owns the returned handle.
    pub fn compile_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: Option<&str>,
    ) -> Result<ProgramHandle> {
        let program = self
            .backend
            .compile_program(label, vertex_source, fragment_source)?;
        log::info!("Compiled program '{}'", label);
        Ok(ProgramHandle(self.programs.insert(program)))
    }

    pub fn program(&self, handle: ProgramHandle) -> Result<&B::Program> {
        self.programs.get(handle.0).ok_or(RoomError::InvalidHandle)
    }

    pub fn create_texture(&mut self, label: &str, image: &TextureImage) -> Result<TextureHandle> {
        let texture = self.backend.create_texture(label, image)?;
        log::debug!("Created texture '{}' ({}x{})", label, image.width, image.height);
        Ok(TextureHandle(self.textures.insert(TextureEntry {
            texture,
            ref_count: 1,
        })))
    }

    /// Adds an owner to a live texture.
    pub fn retain_texture(&mut self, handle: TextureHandle) -> Result<()> {
        let entry = self
            .textures
            .get_mut(handle.0)
            .ok_or(RoomError::InvalidHandle)?;
        entry.ref_count += 1;
        Ok(())
    }

    pub fn texture(&self, handle: TextureHandle) -> Result<&B::Texture> {
        self.textures
            .get(handle.0)
            .map(|entry| &entry.texture)
            .ok_or(RoomError::InvalidHandle)
    }

    pub fn texture_ref_count(&self, handle: TextureHandle) -> Option<u32> {
        self.textures.get(handle.0).map(|entry| entry.ref_count)
    }

    pub fn is_live(&self, handle: impl Into<ResourceHandle>) -> bool {
        match handle.into() {
            ResourceHandle::Mesh(h) => self.mesh(h).is_ok(),
            ResourceHandle::Program(h) => self.programs.get(h.0).is_some(),
            ResourceHandle::Texture(h) => self.textures.get(h.0).is_some(),
        }
    }

    /// Drops one ownership of `handle`.
    ///
    /// Meshes and textures are destroyed once their last owner lets go;
    /// programs are destroyed immediately. Releasing a handle that no longer refers
    /// to a live resource does nothing and returns `false`.
    pub fn release(&mut self, handle: impl Into<ResourceHandle>) -> bool {
        match handle.into() {
            ResourceHandle::Mesh(h) => self.release_mesh(h),
            ResourceHandle::Program(h) => match self.programs.remove(h.0) {
                Some(program) => {
                    self.backend.destroy_program(program);
                    true
                }
                None => stale(h),
            },
            ResourceHandle::Texture(h) => self.release_texture(h),
        }
    }

    fn release_texture(&mut self, handle: TextureHandle) -> bool {
        let Some(entry) = self.textures.get_mut(handle.0) else {
            return stale(handle);
        };
        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return true;
        }
        if let Some(entry) = self.textures.remove(handle.0) {
            self.backend.destroy_texture(entry.texture);
        }
        true
    }

    fn release_mesh(&mut self, handle: MeshHandle) -> bool {
        let Some(id) = self.mesh_leases.remove(handle.0) else {
            return stale(handle);
        };
        let Some(entry) = self.meshes.get_mut(id) else {
            return stale(handle);
        };
        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return true;
        }
        if let Some(entry) = self.meshes.remove(id) {
            if let Some(key) = entry.key {
                self.shared_meshes.remove(&key);
            }
            self.backend.destroy_mesh(entry.mesh);
        }
        true
    }

    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Destroys every resource regardless of outstanding owners.
    pub fn release_all(&mut self) {
        for entry in self.meshes.drain() {
            self.backend.destroy_mesh(entry.mesh);
        }
        self.mesh_leases.drain();
        self.shared_meshes.clear();
        for program in self.programs.drain() {
            self.backend.destroy_program(program);
        }
        for entry in self.textures.drain() {
            self.backend.destroy_texture(entry.texture);
        }
    }
}

fn stale(handle: impl std::fmt::Debug) -> bool {
    log::debug!("Ignoring release of stale handle {:?}", handle);
    false
}
