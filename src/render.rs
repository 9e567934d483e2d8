//! Frame composition.
//!
//! Each frame the scene store is flattened into a [`FrameDraws`] list: one
//! [`DrawItem`] per furniture part or room surface, each pointing at one
//! [`InstanceRaw`] record in a shared instance buffer. The [`Renderer`] then
//! records the shadow pass and the main pass from that list, in that order.

use crate::{
    camera::{CameraResources, CameraRig},
    config::EngineConfig,
    data_structures::{
        instance::{Instance, InstanceRaw},
        scene::{EntityId, SceneStore, Surface},
    },
    editor::Editor,
    error::Result,
    pipelines::{
        light::{DirectionalLight, LightResources, LightUniform, shadow_center},
        phong::MainPass,
        shadow::ShadowPass,
    },
    resources::{MeshHandle, ResourceManager, TextureHandle, wgpu_backend::WgpuBackend},
};

/// One indexed draw.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawItem {
    pub entity: EntityId,
    pub mesh: MeshHandle,
    pub index_count: u32,
    /// Index into [`FrameDraws::instances`].
    pub instance: u32,
    pub texture: Option<TextureHandle>,
}

#[derive(Debug, Default)]
pub struct FrameDraws {
    pub items: Vec<DrawItem>,
    pub instances: Vec<InstanceRaw>,
}

impl FrameDraws {
    /// Snapshot of everything visible: floor, walls, then every furniture
    /// part in insertion order.
    pub fn collect(scene: &SceneStore) -> Self {
        let mut draws = Self::default();
        let surfaces = scene
            .floor()
            .map(|floor| (EntityId::Floor, floor))
            .into_iter()
            .chain(
                scene
                    .walls()
                    .iter()
                    .map(|(side, wall)| (EntityId::Wall(*side), wall)),
            );
        for (entity, surface) in surfaces {
            draws.push_surface(entity, surface);
        }

        for furniture in scene.furniture() {
            let entity = EntityId::Furniture(furniture.id.clone());
            for (index, part) in furniture.parts.iter().enumerate() {
                let Some(instance) = furniture.part_instance(index) else {
                    continue;
                };
                draws.push(
                    entity.clone(),
                    part.mesh,
                    part.index_count,
                    instance.to_raw(part.color, furniture.selected, furniture.texture.is_some()),
                    furniture.texture,
                );
            }
        }
        draws
    }

    fn push_surface(&mut self, entity: EntityId, surface: &Surface) {
        // room surfaces are built in world space
        let raw = Instance::new().to_raw(surface.color, surface.selected, surface.texture.is_some());
        self.push(entity, surface.mesh, surface.index_count, raw, surface.texture);
    }

    fn push(
        &mut self,
        entity: EntityId,
        mesh: MeshHandle,
        index_count: u32,
        raw: InstanceRaw,
        texture: Option<TextureHandle>,
    ) {
        let instance = self.instances.len() as u32;
        self.instances.push(raw);
        self.items.push(DrawItem {
            entity,
            mesh,
            index_count,
            instance,
            texture,
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Draws belonging to `entity`.
    pub fn for_entity<'a>(&'a self, entity: &'a EntityId) -> impl Iterator<Item = &'a DrawItem> {
        self.items.iter().filter(move |item| &item.entity == entity)
    }
}

/// Instance buffer that grows to fit the frame and never shrinks.
pub struct InstanceBuffer {
    buffer: wgpu::Buffer,
    capacity: usize,
}

impl InstanceBuffer {
    const MIN_CAPACITY: usize = 64;

    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            buffer: Self::allocate(device, Self::MIN_CAPACITY),
            capacity: Self::MIN_CAPACITY,
        }
    }

    fn allocate(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (capacity * std::mem::size_of::<InstanceRaw>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, instances: &[InstanceRaw]) {
        if instances.len() > self.capacity {
            let capacity = instances.len().next_power_of_two();
            log::debug!("Growing instance buffer to {} records", capacity);
            self.buffer.destroy();
            self.buffer = Self::allocate(device, capacity);
            self.capacity = capacity;
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances));
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Per-frame statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub shadow_draws: u32,
    pub main_draws: u32,
}

/// GPU side of the engine: uniforms, both passes and the instance buffer.
pub struct Renderer {
    pub camera: CameraResources,
    pub light: LightResources,
    directional: DirectionalLight,
    shadow: ShadowPass,
    main: MainPass,
    instances: InstanceBuffer,
}

impl Renderer {
    /// Compiles both programs. Any shader error aborts startup.
    pub fn new(
        resources: &mut ResourceManager<WgpuBackend>,
        config: &EngineConfig,
        rig: &CameraRig,
        surface_format: wgpu::TextureFormat,
        size: [u32; 2],
    ) -> Result<Self> {
        let device = resources.backend().device().clone();
        let directional = DirectionalLight::from(&config.light);
        let camera = CameraResources::new(&device, rig);
        let light = LightResources::new(&device, light_uniform(&directional, config));
        let shadow = ShadowPass::new(resources, &light, config.shadow.resolution)?;
        let main = MainPass::new(resources, surface_format, size, &camera, &light, &shadow)?;
        Ok(Self {
            camera,
            light,
            directional,
            shadow,
            main,
            instances: InstanceBuffer::new(&device),
        })
    }

    pub fn light(&self) -> &DirectionalLight {
        &self.directional
    }

    /// Replaces the light; takes effect on the next frame.
    pub fn set_light(&mut self, queue: &wgpu::Queue, light: DirectionalLight, config: &EngineConfig) {
        self.directional = light;
        self.light.update(queue, light_uniform(&self.directional, config));
    }

    /// Recreates the main depth buffer. The shadow map keeps its resolution.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.main.resize(device, width, height);
        }
    }

    /// Records and submits the shadow pass followed by the main pass.
    pub fn render(
        &mut self,
        target: &wgpu::TextureView,
        editor: &Editor<WgpuBackend>,
    ) -> FrameStats {
        let resources = editor.resources();
        let device = resources.backend().device();
        let queue = resources.backend().queue();

        self.camera.update(queue, editor.camera());
        let draws = editor.frame_draws();
        self.instances.write(device, queue, &draws.instances);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        let mut recorder = self
            .shadow
            .begin(&mut encoder, &self.light, self.instances.buffer());
        for item in &draws.items {
            match resources.mesh(item.mesh) {
                Ok(entry) => recorder.render_mesh(&entry.mesh, item.instance),
                Err(e) => log::warn!("No shadow for {}: {}", item.entity, e),
            }
        }
        let shadow_draws = recorder.end();

        let main_draws = self.main.render(
            &mut encoder,
            target,
            editor.config().clear_colour,
            &self.camera,
            &self.light,
            &draws,
            self.instances.buffer(),
            resources,
            editor.placeholder(),
        );

        queue.submit(std::iter::once(encoder.finish()));
        FrameStats {
            shadow_draws,
            main_draws,
        }
    }
}

fn light_uniform(light: &DirectionalLight, config: &EngineConfig) -> LightUniform {
    LightUniform::new(
        light,
        &config.shadow,
        &config.material,
        shadow_center(config.room.wall_height),
    )
}
