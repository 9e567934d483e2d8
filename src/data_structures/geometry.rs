//! Procedural geometry: boxes for furniture parts and the room shell.
//!
//! Everything here is plain CPU data. [`GeometryData`] is what gets handed to
//! the resource manager for upload; its vertex layout is fixed by
//! [`ModelVertex::desc`] and must match the shaders' `@location`s.

use cgmath::{InnerSpace, Vector3};

use crate::{
    data_structures::bounds::Aabb,
    error::{Result, RoomError},
};

/// Largest vertex count addressable with `u16` indices.
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

/// World units covered by one repetition of a surface texture.
const TEXTURE_TILE: f32 = 1.0;

/// Describes how a vertex type is laid out in a vertex buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Indexed triangle list with 16-bit indices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u16>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Appends `other`, rebasing its indices.
    pub fn append(&mut self, other: &GeometryData) -> Result<()> {
        let base = self.vertices.len();
        let total = base + other.vertices.len();
        if total > MAX_VERTICES {
            return Err(RoomError::IndexOverflow { vertices: total });
        }
        self.vertices.extend_from_slice(&other.vertices);
        self.indices
            .extend(other.indices.iter().map(|i| (base + *i as usize) as u16));
        Ok(())
    }

    /// Appends one quad spanning `rect` in the plane of `axes`.
    ///
    /// `u × v` must equal `normal`, then the two triangles are counter-clockwise
    /// when seen from the side the normal points to.
    fn push_quad(&mut self, axes: &QuadAxes, rect: Rect) -> Result<()> {
        let base = self.vertices.len();
        if base + 4 > MAX_VERTICES {
            return Err(RoomError::IndexOverflow {
                vertices: base + 4,
            });
        }
        let corners = [
            (rect.u0, rect.v0),
            (rect.u1, rect.v0),
            (rect.u1, rect.v1),
            (rect.u0, rect.v1),
        ];
        for (u, v) in corners {
            let position = axes.origin + axes.u * u + axes.v * v;
            self.vertices.push(ModelVertex {
                position: position.into(),
                normal: axes.normal.into(),
                tex_coords: [u / TEXTURE_TILE, -v / TEXTURE_TILE],
            });
        }
        let base = base as u16;
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        Ok(())
    }

    /// Envelope of all vertex positions.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().map(|v| Vector3::from(v.position)))
    }
}

/// Orthonormal frame of a planar quad: `origin + u * s + v * t`.
struct QuadAxes {
    origin: Vector3<f32>,
    u: Vector3<f32>,
    v: Vector3<f32>,
    normal: Vector3<f32>,
}

/// Rectangle in a quad's (u, v) plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub u0: f32,
    pub u1: f32,
    pub v0: f32,
    pub v1: f32,
}

impl Rect {
    pub fn new(u0: f32, u1: f32, v0: f32, v1: f32) -> Self {
        Self { u0, u1, v0, v1 }
    }

    pub fn area(&self) -> f32 {
        (self.u1 - self.u0).max(0.0) * (self.v1 - self.v0).max(0.0)
    }

    fn is_degenerate(&self) -> bool {
        self.u1 - self.u0 <= f32::EPSILON || self.v1 - self.v0 <= f32::EPSILON
    }

    fn intersection(&self, other: &Rect) -> Option<Rect> {
        let clipped = Rect {
            u0: self.u0.max(other.u0),
            u1: self.u1.min(other.u1),
            v0: self.v0.max(other.v0),
            v1: self.v1.min(other.v1),
        };
        (!clipped.is_degenerate()).then_some(clipped)
    }

    /// Splits `self` around `hole` into at most four pieces (left, right, below,
    /// above). The pieces share edges with each other and with the hole, so
    /// together with the hole they tile `self` exactly.
    pub fn subtract(&self, hole: &Rect) -> Vec<Rect> {
        let Some(hole) = self.intersection(hole) else {
            return vec![*self];
        };
        [
            Rect::new(self.u0, hole.u0, self.v0, self.v1),
            Rect::new(hole.u1, self.u1, self.v0, self.v1),
            Rect::new(hole.u0, hole.u1, self.v0, hole.v0),
            Rect::new(hole.u0, hole.u1, hole.v1, self.v1),
        ]
        .into_iter()
        .filter(|piece| !piece.is_degenerate())
        .collect()
    }
}

/// The four walls of the room, named by the side of the floor they stand on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WallSide {
    /// z = -size/2
    North,
    /// z = +size/2
    South,
    /// x = +size/2
    East,
    /// x = -size/2
    West,
}

impl WallSide {
    pub const ALL: [WallSide; 4] = [
        WallSide::North,
        WallSide::South,
        WallSide::East,
        WallSide::West,
    ];

    /// Frame of the wall's inner face. `u` runs along the wall through
    /// [-size/2, size/2], `v` is the height above the floor.
    fn axes(&self, size: f32) -> QuadAxes {
        let half = size * 0.5;
        let up = Vector3::unit_y();
        let (origin, u) = match self {
            WallSide::North => (Vector3::new(0.0, 0.0, -half), Vector3::unit_x()),
            WallSide::South => (Vector3::new(0.0, 0.0, half), -Vector3::unit_x()),
            WallSide::East => (Vector3::new(half, 0.0, 0.0), Vector3::unit_z()),
            WallSide::West => (Vector3::new(-half, 0.0, 0.0), -Vector3::unit_z()),
        };
        QuadAxes {
            origin,
            u,
            v: up,
            normal: self.inward_normal(),
        }
    }

    /// Normal of the wall's drawn face. Walls are single-sided and point
    /// into the room.
    pub fn inward_normal(&self) -> Vector3<f32> {
        match self {
            WallSide::North => Vector3::unit_z(),
            WallSide::South => -Vector3::unit_z(),
            WallSide::East => -Vector3::unit_x(),
            WallSide::West => Vector3::unit_x(),
        }
    }

    /// Thin slab enclosing the wall, used as its picking volume.
    pub fn bounds(&self, size: f32, height: f32, thickness: f32) -> Aabb {
        let half = size * 0.5;
        let t = thickness * 0.5;
        match self {
            WallSide::North => Aabb::new(
                Vector3::new(-half, 0.0, -half - t),
                Vector3::new(half, height, -half + t),
            ),
            WallSide::South => Aabb::new(
                Vector3::new(-half, 0.0, half - t),
                Vector3::new(half, height, half + t),
            ),
            WallSide::East => Aabb::new(
                Vector3::new(half - t, 0.0, -half),
                Vector3::new(half + t, height, half),
            ),
            WallSide::West => Aabb::new(
                Vector3::new(-half - t, 0.0, -half),
                Vector3::new(-half + t, height, half),
            ),
        }
    }
}

impl std::fmt::Display for WallSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WallSide::North => "north",
            WallSide::South => "south",
            WallSide::East => "east",
            WallSide::West => "west",
        };
        f.write_str(name)
    }
}

/// A rectangular door or window cut-out, declared in wall coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallOpening {
    pub wall: WallSide,
    /// Position of the opening's center along the wall, 0 being the wall's middle.
    pub center_u: f32,
    /// Height of the opening's center above the floor.
    pub center_v: f32,
    pub width: f32,
    pub height: f32,
}

impl WallOpening {
    /// A door of the given size standing on the floor.
    pub fn door(wall: WallSide, center_u: f32, width: f32, height: f32) -> Self {
        Self {
            wall,
            center_u,
            center_v: height * 0.5,
            width,
            height,
        }
    }

    pub fn window(wall: WallSide, center_u: f32, sill: f32, width: f32, height: f32) -> Self {
        Self {
            wall,
            center_u,
            center_v: sill + height * 0.5,
            width,
            height,
        }
    }

    fn rect(&self) -> Rect {
        Rect::new(
            self.center_u - self.width * 0.5,
            self.center_u + self.width * 0.5,
            self.center_v - self.height * 0.5,
            self.center_v + self.height * 0.5,
        )
    }
}

/// Floor and walls as separate meshes so each can be selected and textured.
#[derive(Clone, Debug, Default)]
pub struct RoomSurfaces {
    pub floor: GeometryData,
    pub walls: Vec<(WallSide, GeometryData)>,
}

impl RoomSurfaces {
    /// All surfaces merged into one buffer.
    pub fn merged(&self) -> Result<GeometryData> {
        let mut merged = self.floor.clone();
        for (_, wall) in &self.walls {
            merged.append(wall)?;
        }
        Ok(merged)
    }
}

/// Box of the given dimensions centered at the origin.
///
/// 24 vertices (four per face so every face keeps its own normal) and 36
/// indices, counter-clockwise when seen from outside.
pub fn build_box(width: f32, height: f32, depth: f32) -> GeometryData {
    let half = Vector3::new(width * 0.5, height * 0.5, depth * 0.5);
    // (normal, u, v) with u × v = normal
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let mut geometry = GeometryData {
        vertices: Vec::with_capacity(24),
        indices: Vec::with_capacity(36),
    };
    for (normal, u, v) in faces {
        let (n, u, v) = (Vector3::from(normal), Vector3::from(u), Vector3::from(v));
        let base = geometry.vertices.len() as u16;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let corner = n + u * su + v * sv;
            let position = Vector3::new(corner.x * half.x, corner.y * half.y, corner.z * half.z);
            geometry.vertices.push(ModelVertex {
                position: position.into(),
                normal,
                tex_coords: [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
            });
        }
        geometry
            .indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    geometry
}

/// Floor and four inward-facing walls of a square room of side `size`.
pub fn build_room_surfaces(
    size: f32,
    height: f32,
    openings: &[WallOpening],
) -> Result<RoomSurfaces> {
    if size <= 0.0 || height <= 0.0 {
        return Err(RoomError::InvalidGeometry(format!(
            "room must have positive size and height, got {size} x {height}"
        )));
    }
    let half = size * 0.5;

    let mut floor = GeometryData::new();
    let floor_axes = QuadAxes {
        origin: Vector3::new(0.0, 0.0, 0.0),
        u: Vector3::unit_x(),
        v: -Vector3::unit_z(),
        normal: Vector3::unit_y(),
    };
    floor.push_quad(&floor_axes, Rect::new(-half, half, -half, half))?;

    let mut walls = Vec::with_capacity(WallSide::ALL.len());
    for side in WallSide::ALL {
        let wall_rect = Rect::new(-half, half, 0.0, height);
        let mut pieces = vec![wall_rect];
        for opening in openings.iter().filter(|o| o.wall == side) {
            if opening.width <= 0.0 || opening.height <= 0.0 {
                return Err(RoomError::InvalidGeometry(format!(
                    "opening on the {side} wall has a non-positive size"
                )));
            }
            if wall_rect.intersection(&opening.rect()).is_none() {
                return Err(RoomError::InvalidGeometry(format!(
                    "opening at u={} v={} lies outside the {side} wall",
                    opening.center_u, opening.center_v
                )));
            }
            pieces = pieces
                .iter()
                .flat_map(|piece| piece.subtract(&opening.rect()))
                .collect();
        }
        let axes = side.axes(size);
        debug_assert!((axes.u.cross(axes.v) - axes.normal).magnitude() < 1e-6);
        let mut wall = GeometryData::new();
        for piece in pieces {
            wall.push_quad(&axes, piece)?;
        }
        walls.push((side, wall));
    }

    Ok(RoomSurfaces { floor, walls })
}

/// Floor and walls merged into a single buffer.
pub fn build_room_shell(size: f32, height: f32, openings: &[WallOpening]) -> Result<GeometryData> {
    build_room_surfaces(size, height, openings)?.merged()
}
