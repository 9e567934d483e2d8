//! Ray-cast picking.
//!
//! A pointer position is unprojected through the inverse of `projection *
//! view` into a world-space ray, which is then tested against the world-space
//! bounding box of every selectable entity. The nearest hit in front of the
//! camera wins.
//!
//! Matrices are expected in the OpenGL clip convention, i.e. the near and far
//! planes map to NDC depth -1 and +1.

use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Vector3, Vector4};

use crate::data_structures::{bounds::Aabb, scene::EntityId, scene::SceneStore};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Unit length.
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Slab test. Returns the distance to the entry point, or to the exit
    /// point when the origin lies inside the box; `None` if the box is missed
    /// or lies behind the origin.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            let (min, max) = (aabb.min[axis], aabb.max[axis]);
            if direction == 0.0 {
                // Parallel to the slab: no constraint unless the origin is outside it
                if origin < min || origin > max {
                    return None;
                }
                continue;
            }
            let inverse = 1.0 / direction;
            let mut t0 = (min - origin) * inverse;
            let mut t1 = (max - origin) * inverse;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        if t_min > 0.0 {
            Some(t_min)
        } else if t_max > 0.0 {
            Some(t_max)
        } else {
            None
        }
    }

    /// Distance to the horizontal plane at height `y`, if it lies ahead.
    pub fn intersect_plane_y(&self, y: f32) -> Option<f32> {
        if self.direction.y.abs() < 1e-6 {
            return None;
        }
        let t = (y - self.origin.y) / self.direction.y;
        (t > 0.0).then_some(t)
    }
}

/// Pointer coordinates (pixels, y down) to normalized device coordinates.
pub fn pointer_to_ndc(x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
    ((x / width) * 2.0 - 1.0, -(y / height) * 2.0 + 1.0)
}

fn unproject(inverse: &Matrix4<f32>, ndc_x: f32, ndc_y: f32, ndc_z: f32) -> Option<Point3<f32>> {
    let world = inverse * Vector4::new(ndc_x, ndc_y, ndc_z, 1.0);
    if world.w.abs() < f32::EPSILON {
        return None;
    }
    Some(Point3::from_homogeneous(world))
}

/// World-space ray through the pointer. `None` for an empty viewport or a
/// singular view-projection matrix.
pub fn ray_from_pointer(
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    projection: &Matrix4<f32>,
    view: &Matrix4<f32>,
    camera_position: Point3<f32>,
) -> Option<Ray> {
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    let (ndc_x, ndc_y) = pointer_to_ndc(x, y, width, height);
    let inverse = (projection * view).invert()?;
    let near = unproject(&inverse, ndc_x, ndc_y, -1.0)?;
    let far = unproject(&inverse, ndc_x, ndc_y, 1.0)?;
    let direction = far - near;
    if direction.magnitude2() == 0.0 {
        return None;
    }
    Some(Ray::new(camera_position, direction))
}

#[derive(Clone, Debug, PartialEq)]
pub struct PickHit {
    pub entity: EntityId,
    pub distance: f32,
}

/// Nearest candidate hit by `ray`. Ties go to the earlier candidate.
pub fn nearest_hit<I>(ray: &Ray, candidates: I) -> Option<PickHit>
where
    I: IntoIterator<Item = (EntityId, Aabb)>,
{
    let mut best: Option<PickHit> = None;
    for (entity, aabb) in candidates {
        let Some(distance) = ray.intersect_aabb(&aabb) else {
            continue;
        };
        if best.as_ref().is_none_or(|hit| distance < hit.distance) {
            best = Some(PickHit { entity, distance });
        }
    }
    best
}

#[derive(Clone, Copy, Debug)]
pub struct Raycaster {
    /// Whether floor and walls can be picked besides furniture.
    pub include_surfaces: bool,
}

impl Default for Raycaster {
    fn default() -> Self {
        Self {
            include_surfaces: true,
        }
    }
}

impl Raycaster {
    #[allow(clippy::too_many_arguments)]
    pub fn pick(
        &self,
        scene: &SceneStore,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        projection: &Matrix4<f32>,
        view: &Matrix4<f32>,
        camera_position: Point3<f32>,
    ) -> Option<PickHit> {
        let ray = ray_from_pointer(x, y, width, height, projection, view, camera_position)?;
        let hit = nearest_hit(
            &ray,
            scene
                .pick_candidates_from(ray.origin)
                .into_iter()
                .filter(|(entity, _)| {
                    self.include_surfaces || matches!(entity, EntityId::Furniture(_))
                }),
        );
        match &hit {
            Some(hit) => log::debug!("Pick hit {} at {:.3}", hit.entity, hit.distance),
            None => log::debug!("Pick missed at ({x}, {y})"),
        }
        hit
    }
}
