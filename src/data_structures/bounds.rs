//! Axis-aligned bounding boxes.

use cgmath::{Deg, Matrix3, Vector3};

/// Min/max corner box along the axes of whatever space it is expressed in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Box of the given size centered on `center`.
    pub fn from_center_size(center: Vector3<f32>, size: Vector3<f32>) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Envelope of a set of points, `None` for an empty set.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vector3<f32>>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |acc, p| acc.including(p)))
    }

    pub fn including(self, p: Vector3<f32>) -> Self {
        Self {
            min: Vector3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            max: Vector3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        }
    }

    pub fn union(self, other: Aabb) -> Self {
        self.including(other.min).including(other.max)
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn contains(&self, p: Vector3<f32>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn corners(&self) -> [Vector3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vector3::new(a.x, a.y, a.z),
            Vector3::new(b.x, a.y, a.z),
            Vector3::new(a.x, b.y, a.z),
            Vector3::new(b.x, b.y, a.z),
            Vector3::new(a.x, a.y, b.z),
            Vector3::new(b.x, a.y, b.z),
            Vector3::new(a.x, b.y, b.z),
            Vector3::new(b.x, b.y, b.z),
        ]
    }

    /// World-space envelope of a local box under scale, Y rotation and translation.
    ///
    /// The corners are scaled, rotated about Y and then re-enveloped, so the
    /// result overestimates the true oriented box whenever the rotation is not a
    /// multiple of 90 degrees.
    pub fn transformed(
        &self,
        position: Vector3<f32>,
        rotation_y: Deg<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        let rotation = Matrix3::from_angle_y(rotation_y);
        let rotated = self.corners().map(|corner| {
            let scaled = Vector3::new(corner.x * scale.x, corner.y * scale.y, corner.z * scale.z);
            rotation * scaled
        });
        let mut envelope = Self::new(rotated[0], rotated[0]);
        for corner in &rotated[1..] {
            envelope = envelope.including(*corner);
        }
        Self {
            min: envelope.min + position,
            max: envelope.max + position,
        }
    }
}
