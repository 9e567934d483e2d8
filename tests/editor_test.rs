use std::time::Duration;

use cgmath::{Deg, InnerSpace, Point3, Vector3};
use room_ngin::{
    RoomError,
    config::EngineConfig,
    data_structures::{
        furniture::{FurnitureBlueprint, FurnitureFactory, FurnitureKind, FurnitureType},
        geometry::WallSide,
        scene::EntityId,
    },
    resources::texture::TextureSource,
};
use winit::keyboard::KeyCode;

use crate::common::test_utils::{
    HEIGHT, Harness, WIDTH, assert_close, origin, rig_looking_at, screen_center, screen_position,
};

mod common;

/// Eye inside the room, looking down at the middle of the floor.
fn overhead(harness: &mut Harness) -> Point3<f32> {
    let eye = Point3::new(0.0, 6.0, 3.0);
    *harness.editor.camera_mut() = rig_looking_at(eye, origin());
    eye
}

fn pointer_at(harness: &Harness, point: Point3<f32>) -> (f32, f32) {
    let camera = harness.editor.camera();
    screen_position(point, &camera.projection_matrix(), &camera.view_matrix())
}

#[test]
fn adding_with_a_key_selects_the_new_furniture() {
    let mut harness = Harness::new();
    assert!(harness.editor.on_key_down(KeyCode::Digit1));

    let scene = harness.editor.scene();
    assert_eq!(scene.len(), 1);
    let table = &scene.furniture()[0];
    assert_eq!(table.kind, FurnitureKind::Table);
    assert_eq!(table.position, Vector3::new(0.0, 0.0, 0.0));
    assert_eq!(scene.selected_furniture(), Some(&table.id));

    let draws = harness.editor.frame_draws();
    // floor, four walls and five table parts
    assert_eq!(draws.len(), 10);
    let entity = EntityId::Furniture(table.id.clone());
    let parts: Vec<_> = draws.for_entity(&entity).collect();
    assert_eq!(parts.len(), 5);
    for item in parts {
        assert_eq!(draws.instances[item.instance as usize].flags[0], 1.0);
    }
    for item in draws.for_entity(&EntityId::Floor) {
        assert_eq!(draws.instances[item.instance as usize].flags, [0.0; 4]);
    }
}

#[test]
fn clicking_furniture_selects_it_and_moving_it_moves_the_pick_volume() {
    let mut harness = Harness::new();
    overhead(&mut harness);
    let id = harness
        .editor
        .add_furniture(&FurnitureKind::Table.into())
        .unwrap();

    let (x, y) = pointer_at(&harness, Point3::new(0.0, 0.75, 0.0));
    let hit = harness.editor.pick(x, y).unwrap();
    assert_eq!(hit.entity, EntityId::Furniture(id.clone()));

    harness.editor.on_pointer_down(x, y);
    harness.editor.on_pointer_up();
    assert_eq!(harness.editor.scene().selected_furniture(), Some(&id));

    harness
        .editor
        .apply_transform(&id, Some(Vector3::new(3.0, 0.0, 3.0)), None, None)
        .unwrap();
    let old = harness.editor.pick(x, y).map(|h| h.entity);
    assert_ne!(old, Some(EntityId::Furniture(id.clone())));

    let (x, y) = pointer_at(&harness, Point3::new(3.0, 0.4, 3.0));
    let hit = harness.editor.pick(x, y).unwrap();
    assert_eq!(hit.entity, EntityId::Furniture(id));
}

#[test]
fn default_camera_picks_furniture_behind_the_culled_front_wall() {
    let mut harness = Harness::new();
    assert!(harness.editor.camera().eye().z > 5.0);
    let id = harness
        .editor
        .add_furniture(&FurnitureKind::Table.into())
        .unwrap();
    harness
        .editor
        .apply_transform(&id, Some(Vector3::new(0.0, 0.0, 4.0)), None, None)
        .unwrap();
    harness.editor.select(None).unwrap();

    let (x, y) = pointer_at(&harness, Point3::new(0.0, 0.75, 4.0));
    let hit = harness.editor.pick(x, y).unwrap();
    assert_eq!(hit.entity, EntityId::Furniture(id.clone()));

    harness.editor.on_pointer_down(x, y);
    assert!(harness.editor.is_dragging());
    harness.editor.on_pointer_up();
    assert_eq!(harness.editor.scene().selected_furniture(), Some(&id));

    // the far wall faces the camera and stays pickable
    let (x, y) = pointer_at(&harness, Point3::new(0.0, 2.5, -5.0));
    let hit = harness.editor.pick(x, y).unwrap();
    assert_eq!(hit.entity, EntityId::Wall(WallSide::North));
}

#[test]
fn surfaces_can_be_made_unselectable() {
    let mut config = EngineConfig::default().with_size(WIDTH, HEIGHT);
    config.room.selectable_surfaces = false;
    let mut harness = Harness::with_config(config);
    overhead(&mut harness);

    let (x, y) = pointer_at(&harness, Point3::new(3.0, 0.0, 1.0));
    assert!(harness.editor.pick(x, y).is_none());
    harness.editor.on_pointer_down(x, y);
    assert_eq!(harness.editor.scene().selected(), None);
    harness.editor.on_pointer_up();

    let id = harness
        .editor
        .add_furniture(&FurnitureKind::Table.into())
        .unwrap();
    let (x, y) = pointer_at(&harness, Point3::new(0.0, 0.75, 0.0));
    assert_eq!(
        harness.editor.pick(x, y).map(|hit| hit.entity),
        Some(EntityId::Furniture(id))
    );
}

#[test]
fn dragging_moves_furniture_on_the_floor_plane() {
    let mut harness = Harness::new();
    let eye = overhead(&mut harness);
    let id = harness
        .editor
        .add_furniture(&FurnitureKind::Table.into())
        .unwrap();

    let top = Point3::new(0.0, 0.75, 0.0);
    let (x, y) = pointer_at(&harness, top);
    harness.editor.on_pointer_down(x, y);
    assert!(harness.editor.is_dragging());

    // where the grab ray meets the floor
    let grab = eye + (top - eye) * (eye.y / (eye.y - top.y));
    let (x, y) = pointer_at(&harness, grab + Vector3::new(1.0, 0.0, 1.0));
    harness.editor.on_pointer_move(x, y);
    let position = harness.editor.scene().get(&id).unwrap().position;
    assert_close(position.x, 1.0, 1e-3);
    assert_close(position.y, 0.0, 1e-6);
    assert_close(position.z, 1.0, 1e-3);

    // dragged past the east wall the table stops at the boundary
    let (x, y) = pointer_at(&harness, grab + Vector3::new(8.0, 0.0, 1.0));
    harness.editor.on_pointer_move(x, y);
    let position = harness.editor.scene().get(&id).unwrap().position;
    assert_close(position.x, 5.0, 1e-6);
    assert_close(position.z, 1.0, 1e-3);

    harness.editor.on_pointer_up();
    assert!(!harness.editor.is_dragging());
    let (x, y) = pointer_at(&harness, grab);
    harness.editor.on_pointer_move(x, y);
    assert_close(harness.editor.scene().get(&id).unwrap().position.x, 5.0, 1e-6);
}

#[test]
fn clicking_empty_space_orbits_the_camera() {
    let mut harness = Harness::new();
    // looking up out of the open top of the room
    *harness.editor.camera_mut() =
        rig_looking_at(Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 5.0, -1.0));
    harness.editor.on_key_down(KeyCode::Digit2);

    let (x, y) = screen_center();
    assert!(harness.editor.pick(x, y).is_none());
    harness.editor.on_pointer_down(x, y);
    assert!(harness.editor.is_dragging());
    assert_eq!(harness.editor.scene().selected(), None);

    let before = harness.editor.camera().eye();
    harness.editor.on_pointer_move(x + 20.0, y);
    harness.editor.update(Duration::from_millis(16));
    let after = harness.editor.camera().eye();
    assert!((after - before).magnitude() > 1e-3);
    harness.editor.on_pointer_up();
}

#[test]
fn clicking_a_wall_selects_it_without_dragging() {
    let mut harness = Harness::new();
    *harness.editor.camera_mut() =
        rig_looking_at(Point3::new(0.0, 1.5, 0.0), Point3::new(0.0, 1.5, -4.0));
    let (x, y) = pointer_at(&harness, Point3::new(-2.0, 1.5, -5.0));
    harness.editor.on_pointer_down(x, y);
    assert!(!harness.editor.is_dragging());
    assert!(matches!(
        harness.editor.scene().selected(),
        Some(EntityId::Wall(_))
    ));
}

#[test]
fn rotate_key_steps_and_wraps() {
    let mut harness = Harness::new();
    harness.editor.on_key_down(KeyCode::Digit4);
    let id = harness.editor.scene().selected_furniture().unwrap().clone();

    assert!(harness.editor.on_key_down(KeyCode::KeyR));
    assert_eq!(harness.editor.scene().get(&id).unwrap().rotation_y, Deg(15.0));
    for _ in 0..23 {
        harness.editor.on_key_down(KeyCode::KeyR);
    }
    assert_close(harness.editor.scene().get(&id).unwrap().rotation_y.0, 0.0, 1e-3);

    harness.editor.select(None).unwrap();
    assert!(!harness.editor.rotate_selected().unwrap());
}

#[test]
fn delete_and_escape_act_on_the_selection() {
    let mut harness = Harness::new();
    harness.editor.on_key_down(KeyCode::Digit3);
    harness.editor.on_key_down(KeyCode::Digit5);
    assert_eq!(harness.editor.scene().len(), 2);

    assert!(harness.editor.on_key_down(KeyCode::Delete));
    let remaining = harness.editor.scene().furniture();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].kind, FurnitureKind::Bookshelf);
    let id = remaining[0].id.clone();
    assert_eq!(harness.editor.scene().selected(), None);

    // nothing selected: delete is a no-op
    harness.editor.on_key_down(KeyCode::Backspace);
    assert_eq!(harness.editor.scene().len(), 1);

    harness
        .editor
        .select(Some(EntityId::Furniture(id)))
        .unwrap();
    harness.editor.on_key_down(KeyCode::Escape);
    assert_eq!(harness.editor.scene().selected(), None);
    assert!(harness.editor.take_notices().is_empty());
}

#[test]
fn tab_switches_camera_mode_in_place() {
    let mut harness = Harness::new();
    let eye = harness.editor.camera().eye();
    assert!(harness.editor.camera().is_orbit());

    assert!(harness.editor.on_key_down(KeyCode::Tab));
    assert!(!harness.editor.camera().is_orbit());
    assert!((harness.editor.camera().eye() - eye).magnitude() < 1e-4);

    harness.editor.on_key_down(KeyCode::Tab);
    assert!(harness.editor.camera().is_orbit());
    assert!((harness.editor.camera().eye() - eye).magnitude() < 1e-3);
}

#[test]
fn unbound_keys_are_not_handled() {
    let mut harness = Harness::new();
    assert!(!harness.editor.on_key_down(KeyCode::KeyZ));
    assert!(harness.editor.on_key_down(KeyCode::KeyW));
    assert!(harness.editor.on_key_up(KeyCode::KeyW));
}

#[test]
fn every_kind_can_be_added() {
    let mut harness = Harness::new();
    for key in [
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
    ] {
        harness.editor.on_key_down(key);
    }
    let kinds: Vec<_> = harness
        .editor
        .scene()
        .furniture()
        .iter()
        .map(|f| f.kind)
        .collect();
    assert_eq!(kinds, FurnitureKind::ALL);
    let selected = harness.editor.scene().selected_furniture().unwrap();
    assert_eq!(selected.as_str(), "lamp-5");
}

struct Broken;

impl FurnitureFactory for Broken {
    fn create(&self, furniture: &FurnitureType) -> room_ngin::Result<FurnitureBlueprint> {
        Err(RoomError::InvalidGeometry(format!(
            "{} is out of stock",
            furniture.kind()
        )))
    }
}

#[test]
fn failing_commands_leave_a_notice() {
    let Harness { editor, runtime } = Harness::new();
    let mut harness = Harness {
        editor: editor.with_factory(Box::new(Broken)),
        runtime,
    };
    assert!(harness.editor.on_key_down(KeyCode::Digit1));
    assert!(harness.editor.scene().is_empty());
    let notices = harness.editor.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("out of stock"));
    assert!(harness.editor.take_notices().is_empty());
}

#[test]
fn textured_surfaces_are_flagged_for_the_shader() {
    let mut harness = Harness::new();
    harness
        .editor
        .request_texture(
            &EntityId::Floor,
            TextureSource::Bytes {
                name: "garbage".to_string(),
                bytes: vec![1, 2, 3],
            },
        )
        .unwrap();
    let draws = harness.editor.frame_draws();
    let floor = draws.for_entity(&EntityId::Floor).next().unwrap();
    assert_eq!(floor.texture, Some(harness.editor.placeholder()));
    assert_eq!(draws.instances[floor.instance as usize].flags[1], 1.0);
    let wall = draws
        .items
        .iter()
        .find(|item| matches!(item.entity, EntityId::Wall(_)))
        .unwrap();
    assert_eq!(wall.texture, None);
    assert_eq!(draws.instances[wall.instance as usize].flags[1], 0.0);
}

#[test]
fn zero_sized_resize_is_ignored() {
    let mut harness = Harness::new();
    harness.editor.resize(0, 300);
    assert_eq!(harness.editor.viewport(), [800, 600]);
    harness.editor.resize(1024, 768);
    assert_eq!(harness.editor.viewport(), [1024, 768]);
}

#[test]
fn shutdown_frees_all_gpu_memory() {
    let mut harness = Harness::new();
    harness.editor.on_key_down(KeyCode::Digit1);
    harness.editor.on_key_down(KeyCode::Digit4);
    harness.editor.on_key_down(KeyCode::KeyT);
    harness.wait_for_textures(Duration::from_secs(5));

    harness.editor.shutdown();
    let resources = harness.editor.resources();
    assert_eq!(resources.live_meshes(), 0);
    assert_eq!(resources.live_textures(), 0);
    assert_eq!(resources.backend().allocated_bytes(), 0);
}
