//! The scene store: single owner of everything that can be drawn or picked.
//!
//! Render passes and the picker only read from [`SceneStore`]; all mutation
//! goes through its operations so that selection stays exclusive and GPU
//! resources are released exactly once.

use cgmath::{Deg, EuclideanSpace, InnerSpace, Point3, Vector3};

use crate::{
    config::RoomConfig,
    data_structures::{
        bounds::Aabb,
        furniture::{
            FurnitureFactory, FurnitureId, FurnitureInstance, FurniturePart, FurnitureType,
        },
        geometry::{WallSide, build_room_surfaces},
        instance::Instance,
    },
    error::{Result, RoomError},
    resources::{GpuBackend, MeshHandle, ResourceManager, TextureHandle},
};

/// Anything the user can select.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityId {
    Floor,
    Wall(WallSide),
    Furniture(FurnitureId),
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityId::Floor => f.write_str("floor"),
            EntityId::Wall(side) => write!(f, "{side} wall"),
            EntityId::Furniture(id) => write!(f, "{id}"),
        }
    }
}

impl From<FurnitureId> for EntityId {
    fn from(id: FurnitureId) -> Self {
        EntityId::Furniture(id)
    }
}

/// A static room surface (floor or wall).
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    pub mesh: MeshHandle,
    pub index_count: u32,
    /// World-space picking volume.
    pub bounds: Aabb,
    pub color: [f32; 4],
    pub selected: bool,
    pub texture: Option<TextureHandle>,
}

#[derive(Debug, Default)]
pub struct SceneStore {
    furniture: Vec<FurnitureInstance>,
    floor: Option<Surface>,
    walls: Vec<(WallSide, Surface)>,
    selected: Option<EntityId>,
    next_id: u64,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads the floor and the four walls, replacing any previous room.
    pub fn build_room<B: GpuBackend>(
        &mut self,
        room: &RoomConfig,
        resources: &mut ResourceManager<B>,
    ) -> Result<()> {
        let surfaces = build_room_surfaces(room.size, room.wall_height, &room.openings)?;
        self.release_room(resources);

        let half = room.size * 0.5;
        let floor_mesh = resources.upload_geometry("floor", &surfaces.floor)?;
        self.floor = Some(Surface {
            mesh: floor_mesh,
            index_count: surfaces.floor.indices.len() as u32,
            bounds: Aabb::new(
                Vector3::new(-half, -room.wall_thickness, -half),
                Vector3::new(half, 0.0, half),
            ),
            color: room.floor_color,
            selected: false,
            texture: None,
        });

        for (side, geometry) in &surfaces.walls {
            let mesh = match resources.upload_geometry(&format!("{side} wall"), geometry) {
                Ok(mesh) => mesh,
                Err(e) => {
                    self.release_room(resources);
                    return Err(e);
                }
            };
            self.walls.push((
                *side,
                Surface {
                    mesh,
                    index_count: geometry.indices.len() as u32,
                    bounds: side.bounds(room.size, room.wall_height, room.wall_thickness),
                    color: room.wall_color,
                    selected: false,
                    texture: None,
                },
            ));
        }
        log::info!(
            "Built room {}x{} m with {} opening(s)",
            room.size,
            room.wall_height,
            room.openings.len()
        );
        Ok(())
    }

    fn release_room<B: GpuBackend>(&mut self, resources: &mut ResourceManager<B>) {
        let surfaces = self
            .floor
            .take()
            .into_iter()
            .chain(self.walls.drain(..).map(|(_, surface)| surface));
        for surface in surfaces {
            resources.release(surface.mesh);
            if let Some(texture) = surface.texture {
                resources.release(texture);
            }
        }
        if matches!(self.selected, Some(EntityId::Floor | EntityId::Wall(_))) {
            self.selected = None;
        }
    }

    /// Creates a piece of furniture at the room origin.
    ///
    /// Part meshes are shared by dimensions. If any upload fails the parts
    /// acquired so far are released again and nothing is added.
    pub fn add_furniture<B: GpuBackend>(
        &mut self,
        furniture: &FurnitureType,
        factory: &dyn FurnitureFactory,
        resources: &mut ResourceManager<B>,
    ) -> Result<&FurnitureInstance> {
        let blueprint = factory.create(furniture)?;
        if blueprint.parts.is_empty() {
            return Err(RoomError::InvalidGeometry(format!(
                "{} blueprint has no parts",
                blueprint.kind
            )));
        }
        if let Some(part) = blueprint
            .parts
            .iter()
            .find(|part| !(part.size.x > 0.0 && part.size.y > 0.0 && part.size.z > 0.0))
        {
            return Err(RoomError::InvalidGeometry(format!(
                "{} part has a degenerate size {:?}",
                blueprint.kind, part.size
            )));
        }

        let mut parts: Vec<FurniturePart> = Vec::with_capacity(blueprint.parts.len());
        for part in &blueprint.parts {
            let mesh = match resources.acquire_box(part.size) {
                Ok(mesh) => mesh,
                Err(e) => {
                    for acquired in &parts {
                        resources.release(acquired.mesh);
                    }
                    return Err(e);
                }
            };
            let index_count = resources
                .mesh(mesh)
                .map(|entry| entry.index_count)
                .unwrap_or_default();
            parts.push(FurniturePart {
                mesh,
                index_count,
                size: part.size,
                local: Instance::from(part.offset),
                color: part.color,
            });
        }

        self.next_id += 1;
        let id = FurnitureId(format!("{}-{}", blueprint.kind, self.next_id));
        let mut instance = FurnitureInstance {
            id: id.clone(),
            kind: blueprint.kind,
            parts,
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation_y: Deg(0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            selected: false,
            bounding_box: Aabb::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0)),
            texture: None,
        };
        instance.recompute_bounds();
        log::info!("Added {} ({} parts)", id, instance.parts.len());
        self.furniture.push(instance);
        Ok(&self.furniture[self.furniture.len() - 1])
    }

    /// Removes a piece of furniture and releases its meshes and texture.
    pub fn remove_furniture<B: GpuBackend>(
        &mut self,
        id: &FurnitureId,
        resources: &mut ResourceManager<B>,
    ) -> Result<()> {
        let index = self
            .furniture
            .iter()
            .position(|f| &f.id == id)
            .ok_or_else(|| RoomError::UnknownEntity(id.to_string()))?;
        let removed = self.furniture.remove(index);
        for part in &removed.parts {
            resources.release(part.mesh);
        }
        if let Some(texture) = removed.texture {
            resources.release(texture);
        }
        if matches!(&self.selected, Some(EntityId::Furniture(selected)) if selected == id) {
            self.selected = None;
        }
        log::info!("Removed {}", id);
        Ok(())
    }

    pub fn contains(&self, entity: &EntityId) -> bool {
        match entity {
            EntityId::Floor => self.floor.is_some(),
            EntityId::Wall(side) => self.walls.iter().any(|(s, _)| s == side),
            EntityId::Furniture(id) => self.furniture.iter().any(|f| &f.id == id),
        }
    }

    fn selected_flag(&mut self, entity: &EntityId) -> Option<&mut bool> {
        match entity {
            EntityId::Floor => self.floor.as_mut().map(|s| &mut s.selected),
            EntityId::Wall(side) => self
                .walls
                .iter_mut()
                .find(|(s, _)| s == side)
                .map(|(_, surface)| &mut surface.selected),
            EntityId::Furniture(id) => self
                .furniture
                .iter_mut()
                .find(|f| &f.id == id)
                .map(|f| &mut f.selected),
        }
    }

    /// Makes `entity` the only selected entity, or clears the selection.
    pub fn select(&mut self, entity: Option<EntityId>) -> Result<()> {
        if let Some(entity) = &entity {
            if !self.contains(entity) {
                return Err(RoomError::UnknownEntity(entity.to_string()));
            }
        }
        if let Some(previous) = self.selected.take() {
            if let Some(flag) = self.selected_flag(&previous) {
                *flag = false;
            }
        }
        if let Some(entity) = &entity {
            if let Some(flag) = self.selected_flag(entity) {
                *flag = true;
            }
            log::info!("Selected {}", entity);
        }
        self.selected = entity;
        Ok(())
    }

    pub fn selected(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    pub fn selected_furniture(&self) -> Option<&FurnitureId> {
        match &self.selected {
            Some(EntityId::Furniture(id)) => Some(id),
            _ => None,
        }
    }

    fn furniture_mut(&mut self, id: &FurnitureId) -> Result<&mut FurnitureInstance> {
        self.furniture
            .iter_mut()
            .find(|f| &f.id == id)
            .ok_or_else(|| RoomError::UnknownEntity(id.to_string()))
    }

    /// Partial transform update; `None` leaves a field unchanged.
    pub fn apply_transform(
        &mut self,
        id: &FurnitureId,
        position: Option<Vector3<f32>>,
        rotation_y: Option<Deg<f32>>,
        scale: Option<Vector3<f32>>,
    ) -> Result<()> {
        let furniture = self.furniture_mut(id)?;
        if let Some(position) = position {
            furniture.position = position;
        }
        if let Some(rotation_y) = rotation_y {
            furniture.rotation_y = rotation_y;
        }
        if let Some(scale) = scale {
            furniture.scale = scale;
        }
        log::debug!(
            "{} now at {:?}, {:?}, scale {:?}",
            id,
            furniture.position,
            furniture.rotation_y,
            furniture.scale
        );
        Ok(())
    }

    /// Rescales a single part and refreshes the local bounding box.
    pub fn scale_part(
        &mut self,
        id: &FurnitureId,
        part_index: usize,
        scale: Vector3<f32>,
    ) -> Result<()> {
        let furniture = self.furniture_mut(id)?;
        let part_count = furniture.parts.len();
        let part = furniture.parts.get_mut(part_index).ok_or_else(|| {
            RoomError::UnknownEntity(format!("part {part_index} of {id} ({part_count} parts)"))
        })?;
        part.local.scale = scale;
        furniture.recompute_bounds();
        Ok(())
    }

    /// Assigns a texture to `entity`, returning the previous one.
    ///
    /// The store takes over the caller's reference to `texture`; the caller
    /// owns the returned handle and should release it.
    pub fn assign_texture(
        &mut self,
        entity: &EntityId,
        texture: Option<TextureHandle>,
    ) -> Result<Option<TextureHandle>> {
        let slot = match entity {
            EntityId::Floor => self.floor.as_mut().map(|s| &mut s.texture),
            EntityId::Wall(side) => self
                .walls
                .iter_mut()
                .find(|(s, _)| s == side)
                .map(|(_, surface)| &mut surface.texture),
            EntityId::Furniture(id) => self
                .furniture
                .iter_mut()
                .find(|f| &f.id == id)
                .map(|f| &mut f.texture),
        }
        .ok_or_else(|| RoomError::UnknownEntity(entity.to_string()))?;
        Ok(std::mem::replace(slot, texture))
    }

    pub fn texture_of(&self, entity: &EntityId) -> Option<TextureHandle> {
        match entity {
            EntityId::Floor => self.floor.as_ref()?.texture,
            EntityId::Wall(side) => self.walls.iter().find(|(s, _)| s == side)?.1.texture,
            EntityId::Furniture(id) => self.get(id)?.texture,
        }
    }

    pub fn furniture(&self) -> &[FurnitureInstance] {
        &self.furniture
    }

    pub fn get(&self, id: &FurnitureId) -> Option<&FurnitureInstance> {
        self.furniture.iter().find(|f| &f.id == id)
    }

    pub fn floor(&self) -> Option<&Surface> {
        self.floor.as_ref()
    }

    pub fn walls(&self) -> &[(WallSide, Surface)] {
        &self.walls
    }

    /// World-space boxes of every selectable entity: furniture in insertion
    /// order, then the floor, then the walls.
    pub fn pick_candidates(&self) -> Vec<(EntityId, Aabb)> {
        let furniture = self
            .furniture
            .iter()
            .map(|f| (EntityId::Furniture(f.id.clone()), f.world_bounds()));
        let floor = self.floor.iter().map(|s| (EntityId::Floor, s.bounds));
        let walls = self
            .walls
            .iter()
            .map(|(side, s)| (EntityId::Wall(*side), s.bounds));
        furniture.chain(floor).chain(walls).collect()
    }

    /// [`pick_candidates`](Self::pick_candidates) as seen from `viewer`.
    ///
    /// Floor and walls are drawn single-sided, so a surface whose drawn face
    /// points away from the viewer is culled on screen and left out here too.
    pub fn pick_candidates_from(&self, viewer: Point3<f32>) -> Vec<(EntityId, Aabb)> {
        self.pick_candidates()
            .into_iter()
            .filter(|(entity, bounds)| match entity {
                EntityId::Wall(side) => {
                    side.inward_normal().dot(viewer.to_vec() - bounds.center()) > 0.0
                }
                EntityId::Floor => viewer.y > bounds.max.y,
                EntityId::Furniture(_) => true,
            })
            .collect()
    }

    /// Removes all furniture and the room, releasing every resource held.
    pub fn clear<B: GpuBackend>(&mut self, resources: &mut ResourceManager<B>) {
        for furniture in self.furniture.drain(..) {
            for part in &furniture.parts {
                resources.release(part.mesh);
            }
            if let Some(texture) = furniture.texture {
                resources.release(texture);
            }
        }
        self.release_room(resources);
        self.selected = None;
    }

    pub fn len(&self) -> usize {
        self.furniture.len()
    }

    pub fn is_empty(&self) -> bool {
        self.furniture.is_empty()
    }
}
