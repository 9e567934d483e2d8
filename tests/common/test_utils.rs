#![allow(dead_code)]

use std::time::{Duration, Instant};

use room_ngin::{
    camera::{CameraMode, CameraRig, Projection},
    config::{CameraConfig, EngineConfig},
    data_structures::scene::SceneStore,
    editor::Editor,
    resources::{ResourceManager, headless::HeadlessBackend},
};
use cgmath::{Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, Vector4};

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;

pub fn headless_resources() -> ResourceManager<HeadlessBackend> {
    ResourceManager::new(HeadlessBackend::new())
}

/// Scene store with the default room already built.
pub fn scene_with_room() -> (SceneStore, ResourceManager<HeadlessBackend>) {
    let mut resources = headless_resources();
    let mut scene = SceneStore::new();
    scene
        .build_room(&EngineConfig::default().room, &mut resources)
        .expect("default room builds");
    (scene, resources)
}

/// A headless editor plus the runtime its texture loads run on. The runtime
/// is declared last so it outlives the editor.
pub struct Harness {
    pub editor: Editor<HeadlessBackend>,
    pub runtime: tokio::runtime::Runtime,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default().with_size(WIDTH, HEIGHT))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("runtime");
        let editor = Editor::new(HeadlessBackend::new(), config, runtime.handle().clone())
            .expect("editor");
        Self { editor, runtime }
    }

    /// Polls until `applied` textures were swapped in or nothing is pending.
    pub fn wait_for_textures(&mut self, timeout: Duration) -> usize {
        let start = Instant::now();
        let mut applied = 0;
        while start.elapsed() < timeout {
            applied += self.editor.poll_textures();
            if self.editor.pending_textures() == 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        applied
    }
}

/// Camera that sits at `eye` and looks at `target` (orbit mode).
pub fn rig_looking_at(eye: Point3<f32>, target: Point3<f32>) -> CameraRig {
    let mut rig = CameraRig::new(&CameraConfig::default(), WIDTH, HEIGHT);
    let offset = eye - target;
    let distance = offset.magnitude();
    rig.mode = CameraMode::Orbit {
        target,
        distance,
        yaw: Rad(offset.z.atan2(offset.x)),
        pitch: Rad((offset.y / distance).asin()),
    };
    rig.projection = Projection::new(WIDTH, HEIGHT, Deg(45.0), 0.1, 100.0);
    rig
}

/// Pixel position of a world point, y pointing down.
pub fn screen_position(
    point: Point3<f32>,
    projection: &Matrix4<f32>,
    view: &Matrix4<f32>,
) -> (f32, f32) {
    let clip: Vector4<f32> = projection * view * point.to_homogeneous();
    let ndc = clip.truncate() / clip.w;
    (
        (ndc.x + 1.0) * 0.5 * WIDTH as f32,
        (1.0 - ndc.y) * 0.5 * HEIGHT as f32,
    )
}

pub fn screen_center() -> (f32, f32) {
    (WIDTH as f32 * 0.5, HEIGHT as f32 * 0.5)
}

pub fn assert_close(actual: f32, expected: f32, tolerance: f32) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}

pub fn assert_vec_close(actual: Vector3<f32>, expected: Vector3<f32>, tolerance: f32) {
    assert!(
        (actual - expected).magnitude() <= tolerance,
        "expected {expected:?}, got {actual:?}"
    );
}

pub fn origin() -> Point3<f32> {
    Point3::origin()
}

/// Copies an `Rgba8Unorm` render target of `WIDTH` x `HEIGHT` back to the CPU.
#[cfg(feature = "integration-tests")]
pub fn read_pixels(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> image::RgbaImage {
    let u32_size = std::mem::size_of::<u32>() as u32;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_row = (u32_size * WIDTH).div_ceil(align) * align;
    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback buffer"),
        size: (padded_row * HEIGHT) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(HEIGHT),
            },
        },
        wgpu::Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let (tx, rx) = std::sync::mpsc::channel();
    let buffer_slice = output_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).unwrap();
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .unwrap();
    rx.recv().unwrap().unwrap();

    let data = buffer_slice.get_mapped_range();
    let row = (u32_size * WIDTH) as usize;
    let pixels: Vec<u8> = data
        .chunks(padded_row as usize)
        .flat_map(|padded| &padded[..row])
        .copied()
        .collect();
    drop(data);
    output_buffer.unmap();
    image::RgbaImage::from_raw(WIDTH, HEIGHT, pixels).unwrap()
}
