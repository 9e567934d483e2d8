use cgmath::{Deg, Point3, Vector3};
use room_ngin::{
    data_structures::{
        bounds::Aabb,
        furniture::{FurnitureKind, StandardFurnitureFactory},
        scene::EntityId,
    },
    pick::{Ray, Raycaster, nearest_hit, pointer_to_ndc, ray_from_pointer},
};

use crate::common::test_utils::{
    HEIGHT, WIDTH, assert_close, origin, rig_looking_at, scene_with_room, screen_center,
    screen_position,
};

mod common;

fn unit_box() -> Aabb {
    Aabb::new(Vector3::new(-0.5, 0.0, -0.5), Vector3::new(0.5, 1.0, 0.5))
}

/// Ids are only minted by a store, so borrow one from a throwaway scene.
fn furniture(kind: FurnitureKind) -> EntityId {
    let (mut scene, mut resources) = scene_with_room();
    let id = scene
        .add_furniture(
            &kind.into(),
            &StandardFurnitureFactory,
            &mut resources,
        )
        .unwrap()
        .id
        .clone();
    EntityId::Furniture(id)
}

#[test]
fn center_ray_hits_box_at_the_origin() {
    let rig = rig_looking_at(Point3::new(0.0, 5.0, 5.0), origin());
    let (x, y) = screen_center();
    let ray = ray_from_pointer(
        x,
        y,
        WIDTH as f32,
        HEIGHT as f32,
        &rig.projection_matrix(),
        &rig.view_matrix(),
        rig.eye(),
    )
    .unwrap();

    let world = unit_box().transformed(Vector3::new(0.0, 0.0, 0.0), Deg(0.0), Vector3::new(1.0, 1.0, 1.0));
    let hit = nearest_hit(&ray, [(EntityId::Floor, world)]).unwrap();
    assert_eq!(hit.entity, EntityId::Floor);
    assert!(hit.distance > 0.0);
    // the eye is about 7.07 away from the origin and the box top is at y = 1
    assert!(hit.distance < 7.08);
}

#[test]
fn ray_misses_a_box_far_to_the_side() {
    let rig = rig_looking_at(Point3::new(0.0, 5.0, 5.0), origin());
    let (x, y) = screen_center();
    let ray = ray_from_pointer(
        x,
        y,
        WIDTH as f32,
        HEIGHT as f32,
        &rig.projection_matrix(),
        &rig.view_matrix(),
        rig.eye(),
    )
    .unwrap();
    let far = unit_box().transformed(Vector3::new(1000.0, 0.0, 0.0), Deg(0.0), Vector3::new(1.0, 1.0, 1.0));
    assert!(nearest_hit(&ray, [(EntityId::Floor, far)]).is_none());
}

#[test]
fn off_center_pointer_hits_the_projected_box() {
    let rig = rig_looking_at(Point3::new(0.0, 5.0, 5.0), origin());
    let center = Point3::new(2.0, 0.5, -1.0);
    let (x, y) = screen_position(center, &rig.projection_matrix(), &rig.view_matrix());
    let ray = ray_from_pointer(
        x,
        y,
        WIDTH as f32,
        HEIGHT as f32,
        &rig.projection_matrix(),
        &rig.view_matrix(),
        rig.eye(),
    )
    .unwrap();
    let world = unit_box().transformed(Vector3::new(2.0, 0.0, -1.0), Deg(0.0), Vector3::new(1.0, 1.0, 1.0));
    assert!(ray.intersect_aabb(&world).is_some());
}

#[test]
fn axis_parallel_ray_respects_the_slab() {
    let inside = Ray::new(Point3::new(0.0, 0.5, 5.0), Vector3::new(0.0, 0.0, -1.0));
    assert_close(inside.intersect_aabb(&unit_box()).unwrap(), 4.5, 1e-5);

    let above = Ray::new(Point3::new(0.0, 2.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
    assert!(above.intersect_aabb(&unit_box()).is_none());
}

#[test]
fn origin_inside_the_box_reports_the_exit() {
    let ray = Ray::new(Point3::new(0.0, 0.5, 0.0), Vector3::new(1.0, 0.0, 0.0));
    assert_close(ray.intersect_aabb(&unit_box()).unwrap(), 0.5, 1e-5);
}

#[test]
fn box_behind_the_ray_is_missed() {
    let ray = Ray::new(Point3::new(0.0, 0.5, 5.0), Vector3::new(0.0, 0.0, 1.0));
    assert!(ray.intersect_aabb(&unit_box()).is_none());
}

#[test]
fn pointer_corners_map_to_ndc_corners() {
    assert_eq!(pointer_to_ndc(0.0, 0.0, 800.0, 600.0), (-1.0, 1.0));
    assert_eq!(pointer_to_ndc(800.0, 600.0, 800.0, 600.0), (1.0, -1.0));
    assert_eq!(pointer_to_ndc(400.0, 300.0, 800.0, 600.0), (0.0, 0.0));
}

#[test]
fn empty_viewport_has_no_ray() {
    let rig = rig_looking_at(Point3::new(0.0, 5.0, 5.0), origin());
    assert!(
        ray_from_pointer(
            0.0,
            0.0,
            0.0,
            HEIGHT as f32,
            &rig.projection_matrix(),
            &rig.view_matrix(),
            rig.eye(),
        )
        .is_none()
    );
}

#[test]
fn nearest_of_two_stacked_boxes_wins() {
    let ray = Ray::new(Point3::new(0.0, 0.5, 10.0), Vector3::new(0.0, 0.0, -1.0));
    let near = unit_box().transformed(Vector3::new(0.0, 0.0, 3.0), Deg(0.0), Vector3::new(1.0, 1.0, 1.0));
    let far = unit_box();
    let near_id = furniture(FurnitureKind::Table);
    let far_id = furniture(FurnitureKind::Chair);

    let hit = nearest_hit(&ray, [(far_id.clone(), far), (near_id.clone(), near)]).unwrap();
    assert_eq!(hit.entity, near_id);
    assert_close(hit.distance, 6.5, 1e-5);

    let hit = nearest_hit(&ray, [(near_id.clone(), near), (far_id, far)]).unwrap();
    assert_eq!(hit.entity, near_id);
}

#[test]
fn raycaster_prefers_furniture_in_front_of_the_floor() {
    let (mut scene, mut resources) = scene_with_room();
    let id = scene
        .add_furniture(
            &FurnitureKind::Table.into(),
            &StandardFurnitureFactory,
            &mut resources,
        )
        .unwrap()
        .id
        .clone();
    let rig = rig_looking_at(Point3::new(0.0, 6.0, 3.0), origin());
    let (x, y) = screen_position(
        Point3::new(0.0, 0.75, 0.0),
        &rig.projection_matrix(),
        &rig.view_matrix(),
    );
    let hit = Raycaster::default()
        .pick(
            &scene,
            x,
            y,
            WIDTH as f32,
            HEIGHT as f32,
            &rig.projection_matrix(),
            &rig.view_matrix(),
            rig.eye(),
        )
        .unwrap();
    assert_eq!(hit.entity, EntityId::Furniture(id));

    // a pointer at the floor far from the table hits the floor only
    let (x, y) = screen_position(
        Point3::new(3.0, 0.0, 1.0),
        &rig.projection_matrix(),
        &rig.view_matrix(),
    );
    let hit = Raycaster::default().pick(
        &scene,
        x,
        y,
        WIDTH as f32,
        HEIGHT as f32,
        &rig.projection_matrix(),
        &rig.view_matrix(),
        rig.eye(),
    );
    assert_eq!(hit.map(|h| h.entity), Some(EntityId::Floor));

    let furniture_only = Raycaster {
        include_surfaces: false,
    };
    assert!(
        furniture_only
            .pick(
                &scene,
                x,
                y,
                WIDTH as f32,
                HEIGHT as f32,
                &rig.projection_matrix(),
                &rig.view_matrix(),
                rig.eye(),
            )
            .is_none()
    );
}
