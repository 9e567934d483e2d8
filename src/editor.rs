//! The editor: scene, camera and input handling without a surface.
//!
//! [`Editor`] owns everything the room designer mutates between frames. It is
//! generic over the [`GpuBackend`] so the whole interaction model runs
//! unchanged against the headless backend.

use std::sync::Arc;

use cgmath::{Deg, Vector2, Vector3};
use instant::Duration;
use winit::keyboard::KeyCode;

use crate::{
    camera::{CameraController, CameraRig},
    config::EngineConfig,
    data_structures::{
        furniture::{
            FurnitureFactory, FurnitureId, FurnitureKind, FurnitureType,
            StandardFurnitureFactory,
        },
        scene::{EntityId, SceneStore},
        texture::TextureImage,
    },
    error::{Result, RoomError},
    pick::{PickHit, Raycaster, ray_from_pointer},
    render::FrameDraws,
    resources::{
        GpuBackend, ResourceManager, TextureHandle,
        procedural::{Checkerboard, TextureProvider},
        texture::{TextureLoader, TextureSource},
    },
};

const PLACEHOLDER_GRAY: [u8; 4] = [128, 128, 128, 255];
const PROCEDURAL_KINDS: [&str; 3] = ["wood", "tiles", "plain"];
const PROCEDURAL_SIZE: u32 = 256;

#[derive(Clone, Debug, PartialEq)]
enum Drag {
    Idle,
    /// Moving furniture on the horizontal plane at `plane_y`.
    Furniture {
        id: FurnitureId,
        offset: Vector2<f32>,
        plane_y: f32,
    },
    Orbit {
        last: Vector2<f32>,
    },
}

pub struct Editor<B: GpuBackend> {
    config: EngineConfig,
    resources: ResourceManager<B>,
    scene: SceneStore,
    camera: CameraRig,
    controller: CameraController,
    factory: Box<dyn FurnitureFactory>,
    raycaster: Raycaster,
    loader: TextureLoader,
    texture_provider: Arc<dyn TextureProvider>,
    next_procedural: usize,
    placeholder: TextureHandle,
    viewport: [u32; 2],
    drag: Drag,
    notices: Vec<String>,
}

impl<B: GpuBackend> Editor<B> {
    /// Builds the room and the placeholder texture. Texture loads are spawned
    /// on `runtime`.
    pub fn new(backend: B, config: EngineConfig, runtime: tokio::runtime::Handle) -> Result<Self> {
        let mut resources = ResourceManager::new(backend);
        let placeholder =
            resources.create_texture("placeholder", &TextureImage::solid(1, 1, PLACEHOLDER_GRAY))?;
        let mut scene = SceneStore::new();
        scene.build_room(&config.room, &mut resources)?;
        let camera = CameraRig::new(&config.camera, config.width, config.height);
        let controller = CameraController::new(&config.camera);
        let raycaster = Raycaster {
            include_surfaces: config.room.selectable_surfaces,
        };
        Ok(Self {
            viewport: [config.width, config.height],
            config,
            resources,
            scene,
            camera,
            controller,
            factory: Box::new(StandardFurnitureFactory),
            raycaster,
            loader: TextureLoader::new(runtime),
            texture_provider: Arc::new(Checkerboard::default()),
            next_procedural: 0,
            placeholder,
            drag: Drag::Idle,
            notices: Vec::new(),
        })
    }

    pub fn with_factory(mut self, factory: Box<dyn FurnitureFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_texture_provider(mut self, provider: Arc<dyn TextureProvider>) -> Self {
        self.texture_provider = provider;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resources(&self) -> &ResourceManager<B> {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceManager<B> {
        &mut self.resources
    }

    pub fn scene(&self) -> &SceneStore {
        &self.scene
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    pub fn placeholder(&self) -> TextureHandle {
        self.placeholder
    }

    pub fn viewport(&self) -> [u32; 2] {
        self.viewport
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != Drag::Idle
    }

    pub fn add_furniture(&mut self, furniture: &FurnitureType) -> Result<FurnitureId> {
        let instance = self
            .scene
            .add_furniture(furniture, self.factory.as_ref(), &mut self.resources)?;
        Ok(instance.id.clone())
    }

    /// Removes furniture and forgets any texture still loading for it.
    pub fn remove_furniture(&mut self, id: &FurnitureId) -> Result<()> {
        self.scene.remove_furniture(id, &mut self.resources)?;
        self.loader.cancel(&EntityId::Furniture(id.clone()));
        if matches!(&self.drag, Drag::Furniture { id: dragged, .. } if dragged == id) {
            self.drag = Drag::Idle;
        }
        Ok(())
    }

    pub fn select(&mut self, entity: Option<EntityId>) -> Result<()> {
        self.scene.select(entity)
    }

    pub fn apply_transform(
        &mut self,
        id: &FurnitureId,
        position: Option<Vector3<f32>>,
        rotation_y: Option<Deg<f32>>,
        scale: Option<Vector3<f32>>,
    ) -> Result<()> {
        self.scene.apply_transform(id, position, rotation_y, scale)
    }

    pub fn scale_part(&mut self, id: &FurnitureId, part_index: usize, scale: Vector3<f32>) -> Result<()> {
        self.scene.scale_part(id, part_index, scale)
    }

    /// Rotates the selected furniture by the configured step. Returns whether
    /// anything was rotated.
    pub fn rotate_selected(&mut self) -> Result<bool> {
        let Some(id) = self.scene.selected_furniture().cloned() else {
            return Ok(false);
        };
        let current = self
            .scene
            .get(&id)
            .map(|f| f.rotation_y)
            .ok_or_else(|| RoomError::UnknownEntity(id.to_string()))?;
        let rotation = Deg((current.0 + self.config.rotate_step).rem_euclid(360.0));
        self.scene.apply_transform(&id, None, Some(rotation), None)?;
        Ok(true)
    }

    /// Starts loading a texture for `entity`. The entity shows the placeholder
    /// until [`poll_textures`](Self::poll_textures) applies the result.
    pub fn request_texture(&mut self, entity: &EntityId, source: TextureSource) -> Result<u64> {
        if !self.scene.contains(entity) {
            return Err(RoomError::UnknownEntity(entity.to_string()));
        }
        self.resources.retain_texture(self.placeholder)?;
        match self.scene.assign_texture(entity, Some(self.placeholder)) {
            Ok(Some(previous)) => {
                self.resources.release(previous);
            }
            Ok(None) => (),
            Err(e) => {
                self.resources.release(self.placeholder);
                return Err(e);
            }
        }
        Ok(self.loader.request(entity.clone(), source))
    }

    /// Requests the next procedural pattern for the selected entity.
    pub fn texture_selected(&mut self) -> Result<Option<u64>> {
        let Some(entity) = self.scene.selected().cloned() else {
            return Ok(None);
        };
        let kind = PROCEDURAL_KINDS[self.next_procedural % PROCEDURAL_KINDS.len()];
        self.next_procedural += 1;
        let source = TextureSource::Procedural {
            provider: self.texture_provider.clone(),
            kind: kind.to_string(),
            width: PROCEDURAL_SIZE,
            height: PROCEDURAL_SIZE,
        };
        self.request_texture(&entity, source).map(Some)
    }

    pub fn pending_textures(&self) -> usize {
        self.loader.pending()
    }

    /// Swaps finished texture loads in. Loads for entities that no longer
    /// exist are discarded; failures keep the placeholder and leave a notice.
    /// Returns the number of textures applied.
    pub fn poll_textures(&mut self) -> usize {
        let mut applied = 0;
        for load in self.loader.drain() {
            if !self.scene.contains(&load.entity) {
                log::debug!(
                    "Discarding texture {} for removed {}",
                    load.source_name,
                    load.entity
                );
                continue;
            }
            let created = load
                .result
                .and_then(|image| self.resources.create_texture(&load.source_name, &image));
            let handle = match created {
                Ok(handle) => handle,
                Err(e) => {
                    log::warn!("Keeping placeholder for {}: {}", load.entity, e);
                    self.notices.push(format!("Texture for {} failed: {}", load.entity, e));
                    continue;
                }
            };
            match self.scene.assign_texture(&load.entity, Some(handle)) {
                Ok(previous) => {
                    if let Some(previous) = previous {
                        self.resources.release(previous);
                    }
                    log::info!("Applied texture {} to {}", load.source_name, load.entity);
                    applied += 1;
                }
                Err(e) => {
                    log::warn!("{}", e);
                    self.resources.release(handle);
                }
            }
        }
        applied
    }

    /// User-facing messages collected since the last call.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn pick(&self, x: f32, y: f32) -> Option<PickHit> {
        self.raycaster.pick(
            &self.scene,
            x,
            y,
            self.viewport[0] as f32,
            self.viewport[1] as f32,
            &self.camera.projection_matrix(),
            &self.camera.view_matrix(),
            self.camera.eye(),
        )
    }

    /// Point on the horizontal plane at `plane_y` under the pointer.
    fn pointer_on_plane(&self, x: f32, y: f32, plane_y: f32) -> Option<Vector2<f32>> {
        let ray = ray_from_pointer(
            x,
            y,
            self.viewport[0] as f32,
            self.viewport[1] as f32,
            &self.camera.projection_matrix(),
            &self.camera.view_matrix(),
            self.camera.eye(),
        )?;
        let t = ray.intersect_plane_y(plane_y)?;
        let point = ray.at(t);
        Some(Vector2::new(point.x, point.z))
    }

    pub fn on_pointer_down(&mut self, x: f32, y: f32) {
        let hit = self.pick(x, y);
        let entity = hit.map(|hit| hit.entity);
        if let Err(e) = self.scene.select(entity.clone()) {
            log::warn!("{}", e);
            return;
        }
        self.drag = match entity {
            Some(EntityId::Furniture(id)) => self.start_furniture_drag(id, x, y),
            Some(_) => Drag::Idle,
            None => Drag::Orbit {
                last: Vector2::new(x, y),
            },
        };
    }

    fn start_furniture_drag(&self, id: FurnitureId, x: f32, y: f32) -> Drag {
        let Some(position) = self.scene.get(&id).map(|f| f.position) else {
            return Drag::Idle;
        };
        match self.pointer_on_plane(x, y, position.y) {
            Some(grab) => Drag::Furniture {
                id,
                offset: Vector2::new(position.x, position.z) - grab,
                plane_y: position.y,
            },
            None => Drag::Idle,
        }
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32) {
        match self.drag.clone() {
            Drag::Idle => (),
            Drag::Orbit { last } => {
                self.controller.process_drag(x - last.x, y - last.y);
                self.drag = Drag::Orbit {
                    last: Vector2::new(x, y),
                };
            }
            Drag::Furniture {
                id,
                offset,
                plane_y,
            } => {
                let Some(point) = self.pointer_on_plane(x, y, plane_y) else {
                    return;
                };
                let half = self.config.room.size * 0.5;
                let target = point + offset;
                let position = Vector3::new(
                    target.x.clamp(-half, half),
                    plane_y,
                    target.y.clamp(-half, half),
                );
                if let Err(e) = self.scene.apply_transform(&id, Some(position), None, None) {
                    log::warn!("{}", e);
                    self.drag = Drag::Idle;
                }
            }
        }
    }

    pub fn on_pointer_up(&mut self) {
        self.drag = Drag::Idle;
    }

    /// Returns whether the key was handled.
    pub fn on_key_down(&mut self, key: KeyCode) -> bool {
        if self.controller.process_key(key, true) {
            return true;
        }
        let result = match key {
            KeyCode::Delete | KeyCode::Backspace => match self.scene.selected_furniture().cloned() {
                Some(id) => self.remove_furniture(&id),
                None => Ok(()),
            },
            KeyCode::KeyR => self.rotate_selected().map(|_| ()),
            KeyCode::KeyT => self.texture_selected().map(|_| ()),
            KeyCode::Tab => {
                self.camera.toggle_mode();
                Ok(())
            }
            KeyCode::Escape => self.scene.select(None),
            KeyCode::Digit1 => self.add_kind(FurnitureKind::Table),
            KeyCode::Digit2 => self.add_kind(FurnitureKind::Chair),
            KeyCode::Digit3 => self.add_kind(FurnitureKind::Bookshelf),
            KeyCode::Digit4 => self.add_kind(FurnitureKind::Sofa),
            KeyCode::Digit5 => self.add_kind(FurnitureKind::Lamp),
            _ => return false,
        };
        if let Err(e) = result {
            log::warn!("{:?} failed: {}", key, e);
            self.notices.push(e.to_string());
        }
        true
    }

    fn add_kind(&mut self, kind: FurnitureKind) -> Result<()> {
        let id = self.add_furniture(&FurnitureType::from(kind))?;
        self.scene.select(Some(EntityId::Furniture(id)))
    }

    pub fn on_key_up(&mut self, key: KeyCode) -> bool {
        self.controller.process_key(key, false)
    }

    /// Positive values zoom in.
    pub fn on_scroll(&mut self, delta: f32) {
        self.controller.process_scroll(delta);
    }

    /// Advances the camera and applies finished texture loads.
    pub fn update(&mut self, dt: Duration) {
        self.controller.update(&mut self.camera, dt);
        self.poll_textures();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = [width, height];
        self.camera.resize(width, height);
    }

    pub fn frame_draws(&self) -> FrameDraws {
        FrameDraws::collect(&self.scene)
    }

    /// Releases the scene and the placeholder.
    pub fn shutdown(&mut self) {
        self.scene.clear(&mut self.resources);
        self.resources.release(self.placeholder);
        log::info!(
            "Editor shut down; {} mesh(es), {} texture(s) still live",
            self.resources.live_meshes(),
            self.resources.live_textures()
        );
    }
}
