#[cfg(feature = "integration-tests")]
use room_ngin::{
    RoomError,
    config::EngineConfig,
    context::headless_device,
    data_structures::{furniture::FurnitureKind, scene::EntityId},
    editor::Editor,
    error::ShaderStage,
    render::Renderer,
    resources::{ResourceManager, wgpu_backend::WgpuBackend},
};

#[cfg(feature = "integration-tests")]
use crate::common::test_utils::{HEIGHT, WIDTH};
#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
fn offscreen_texture(device: &wgpu::Device, format: wgpu::TextureFormat) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen target"),
        size: wgpu::Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

#[cfg(feature = "integration-tests")]
fn offscreen_target(device: &wgpu::Device) -> wgpu::TextureView {
    offscreen_texture(device, wgpu::TextureFormat::Rgba8UnormSrgb)
        .create_view(&wgpu::TextureViewDescriptor::default())
}

#[test]
#[cfg(feature = "integration-tests")]
fn both_passes_draw_every_visible_item() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (device, queue) = runtime.block_on(headless_device()).unwrap();
    let config = EngineConfig::default().with_size(WIDTH, HEIGHT);

    let mut editor = Editor::new(
        WgpuBackend::new(device.clone(), queue),
        config.clone(),
        runtime.handle().clone(),
    )
    .unwrap();
    editor.add_furniture(&FurnitureKind::Table.into()).unwrap();
    let chair = editor.add_furniture(&FurnitureKind::Chair.into()).unwrap();
    editor.select(Some(EntityId::Furniture(chair))).unwrap();

    let rig = *editor.camera();
    let mut renderer = Renderer::new(
        editor.resources_mut(),
        &config,
        &rig,
        wgpu::TextureFormat::Rgba8UnormSrgb,
        [WIDTH, HEIGHT],
    )
    .unwrap();
    let target = offscreen_target(&device);

    let expected = editor.frame_draws().len() as u32;
    let stats = renderer.render(&target, &editor);
    assert_eq!(stats.shadow_draws, expected);
    assert_eq!(stats.main_draws, expected);

    // a second frame after a resize and an edit still draws everything
    renderer.resize(&device, WIDTH, HEIGHT);
    editor.on_key_down(winit::keyboard::KeyCode::Digit4);
    let stats = renderer.render(&target, &editor);
    assert_eq!(stats.main_draws, editor.frame_draws().len() as u32);

    editor.shutdown();
}

#[test]
#[cfg(feature = "integration-tests")]
fn invalid_wgsl_is_reported_with_its_stage() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (device, queue) = runtime.block_on(headless_device()).unwrap();
    let mut resources = ResourceManager::new(WgpuBackend::new(device, queue));

    let result = resources.compile_program("broken", "@vertex fn vs_main( -> {", None);
    match result {
        Err(RoomError::ShaderCompile { stage, label, log }) => {
            assert_eq!(stage, ShaderStage::Vertex);
            assert_eq!(label, "broken");
            assert!(!log.is_empty());
        }
        other => panic!("expected a shader error, got {other:?}"),
    }
    assert_eq!(resources.live_programs(), 0);
}

/// Matte white light at 45 degrees, so the table's shadow falls beside it.
#[cfg(feature = "integration-tests")]
fn slanted_light_config() -> EngineConfig {
    use cgmath::Vector3;
    use room_ngin::config::{LightConfig, MaterialConfig};

    EngineConfig::default()
        .with_size(WIDTH, HEIGHT)
        .with_light(LightConfig {
            direction: Vector3::new(1.0, -1.0, 0.0),
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        })
        .with_material(MaterialConfig {
            specular_strength: 0.0,
            ..MaterialConfig::default()
        })
}

/// Renders one frame of `editor` into a linear target and reads it back.
#[cfg(feature = "integration-tests")]
fn render_pixels(editor: &mut Editor<WgpuBackend>) -> image::RgbaImage {
    let backend = editor.resources().backend();
    let (device, queue) = (backend.device().clone(), backend.queue().clone());
    let format = wgpu::TextureFormat::Rgba8Unorm;

    let config = editor.config().clone();
    let rig = *editor.camera();
    let mut renderer = Renderer::new(
        editor.resources_mut(),
        &config,
        &rig,
        format,
        [WIDTH, HEIGHT],
    )
    .unwrap();
    let texture = offscreen_texture(&device, format);
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    renderer.render(&view, editor);
    crate::common::test_utils::read_pixels(&device, &queue, &texture)
}

#[cfg(feature = "integration-tests")]
fn pixel_at(
    image: &image::RgbaImage,
    point: cgmath::Point3<f32>,
    editor: &Editor<WgpuBackend>,
) -> [f32; 3] {
    let camera = editor.camera();
    let (x, y) = crate::common::test_utils::screen_position(
        point,
        &camera.projection_matrix(),
        &camera.view_matrix(),
    );
    let pixel = image.get_pixel(x.round() as u32, y.round() as u32);
    [
        pixel[0] as f32 / 255.0,
        pixel[1] as f32 / 255.0,
        pixel[2] as f32 / 255.0,
    ]
}

#[test]
#[cfg(feature = "integration-tests")]
fn floor_under_the_table_shadow_keeps_thirty_percent_of_direct_light() {
    use cgmath::Point3;
    use crate::common::test_utils::{assert_close, origin, rig_looking_at};

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (device, queue) = runtime.block_on(headless_device()).unwrap();
    let config = slanted_light_config();
    let mut editor = Editor::new(
        WgpuBackend::new(device, queue),
        config.clone(),
        runtime.handle().clone(),
    )
    .unwrap();
    *editor.camera_mut() = rig_looking_at(Point3::new(0.0, 8.0, 3.0), origin());
    editor.add_furniture(&FurnitureKind::Table.into()).unwrap();
    editor.select(None).unwrap();

    let pixels = render_pixels(&mut editor);
    // the top casts its shadow 0.7 to 0.75 m towards +x
    let shadowed = pixel_at(&pixels, Point3::new(1.0, 0.0, 0.0), &editor);
    let lit = pixel_at(&pixels, Point3::new(-1.5, 0.0, 0.0), &editor);

    let ambient = config.material.ambient;
    let direct = std::f32::consts::FRAC_1_SQRT_2;
    let floor = config.room.floor_color;
    let tolerance = 3.0 / 255.0;
    for channel in 0..3 {
        assert!(shadowed[channel] < lit[channel], "channel {channel}");
        assert_close(lit[channel], (ambient + direct) * floor[channel], tolerance);
        assert_close(
            shadowed[channel],
            (ambient + (1.0 - config.shadow.max_attenuation) * direct) * floor[channel],
            tolerance,
        );
    }

    editor.shutdown();
}

#[test]
#[cfg(feature = "integration-tests")]
fn selected_part_blends_toward_the_highlight_colour() {
    use cgmath::Point3;
    use crate::common::test_utils::{assert_close, origin, rig_looking_at};

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (device, queue) = runtime.block_on(headless_device()).unwrap();
    let config = slanted_light_config();
    let mut editor = Editor::new(
        WgpuBackend::new(device, queue),
        config.clone(),
        runtime.handle().clone(),
    )
    .unwrap();
    *editor.camera_mut() = rig_looking_at(Point3::new(0.0, 8.0, 3.0), origin());
    let table = editor.add_furniture(&FurnitureKind::Table.into()).unwrap();
    let top = Point3::new(0.0, 0.75, 0.0);

    editor.select(None).unwrap();
    let plain = render_pixels(&mut editor);
    let plain = pixel_at(&plain, top, &editor);
    editor.select(Some(EntityId::Furniture(table))).unwrap();
    let highlighted = render_pixels(&mut editor);
    let highlighted = pixel_at(&highlighted, top, &editor);

    let target = config.material.highlight_color;
    let blend = config.material.highlight_blend;
    for channel in 0..3 {
        assert_close(
            highlighted[channel],
            plain[channel] + (target[channel] - plain[channel]) * blend,
            3.0 / 255.0,
        );
    }
    assert_ne!(plain, highlighted);

    editor.shutdown();
}

#[test]
#[cfg(feature = "integration-tests")]
fn mismatched_stage_interfaces_fail_to_link() {
    use room_ngin::pipelines::basic::{PipelineTarget, mk_pipeline_layout, mk_render_pipeline};

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (device, queue) = runtime.block_on(headless_device()).unwrap();
    let mut resources = ResourceManager::new(WgpuBackend::new(device.clone(), queue));

    // each stage compiles, but the fragment input is never written
    let program = resources
        .compile_program(
            "unlinked",
            "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }",
            Some(
                "@fragment fn fs_main(@location(0) tint: vec4<f32>) -> @location(0) vec4<f32> { return tint; }",
            ),
        )
        .unwrap();
    let layout = mk_pipeline_layout(&device, "unlinked layout", &[]);
    let modules = resources.program(program).unwrap();
    let result = mk_render_pipeline(
        &device,
        "unlinked",
        &layout,
        &modules.vertex,
        modules.fragment.as_ref(),
        &[],
        &PipelineTarget::color(wgpu::TextureFormat::Rgba8Unorm),
    );
    match result {
        Err(RoomError::ShaderCompile { stage, label, .. }) => {
            assert_eq!(stage, ShaderStage::Link);
            assert_eq!(label, "unlinked");
        }
        Err(other) => panic!("expected a link error, got {other:?}"),
        Ok(_) => panic!("expected a link error"),
    }
}
