//! Furniture types, blueprints and placed instances.
//!
//! A [`FurnitureFactory`] describes a piece of furniture as a list of boxes
//! ([`FurnitureBlueprint`]). The scene store turns each box into a
//! [`FurniturePart`] backed by a shared mesh and keeps the result as a
//! [`FurnitureInstance`].

use cgmath::{Deg, Quaternion, Rotation3, Vector3};

use crate::{
    data_structures::{bounds::Aabb, instance::Instance},
    error::{Result, RoomError},
    resources::{MeshHandle, TextureHandle},
};

/// The closed set of furniture kinds, without dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FurnitureKind {
    Table,
    Chair,
    Bookshelf,
    Sofa,
    Lamp,
}

impl FurnitureKind {
    pub const ALL: [FurnitureKind; 5] = [
        FurnitureKind::Table,
        FurnitureKind::Chair,
        FurnitureKind::Bookshelf,
        FurnitureKind::Sofa,
        FurnitureKind::Lamp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FurnitureKind::Table => "table",
            FurnitureKind::Chair => "chair",
            FurnitureKind::Bookshelf => "bookshelf",
            FurnitureKind::Sofa => "sofa",
            FurnitureKind::Lamp => "lamp",
        }
    }
}

impl std::fmt::Display for FurnitureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A furniture kind together with its parameters, all in metres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FurnitureType {
    Table { width: f32, depth: f32, height: f32 },
    Chair { seat_height: f32 },
    Bookshelf { shelves: u32 },
    Sofa { seats: u32 },
    Lamp { height: f32 },
}

impl FurnitureType {
    pub fn kind(&self) -> FurnitureKind {
        match self {
            FurnitureType::Table { .. } => FurnitureKind::Table,
            FurnitureType::Chair { .. } => FurnitureKind::Chair,
            FurnitureType::Bookshelf { .. } => FurnitureKind::Bookshelf,
            FurnitureType::Sofa { .. } => FurnitureKind::Sofa,
            FurnitureType::Lamp { .. } => FurnitureKind::Lamp,
        }
    }
}

impl From<FurnitureKind> for FurnitureType {
    fn from(kind: FurnitureKind) -> Self {
        match kind {
            FurnitureKind::Table => FurnitureType::Table {
                width: 1.2,
                depth: 0.8,
                height: 0.75,
            },
            FurnitureKind::Chair => FurnitureType::Chair { seat_height: 0.45 },
            FurnitureKind::Bookshelf => FurnitureType::Bookshelf { shelves: 4 },
            FurnitureKind::Sofa => FurnitureType::Sofa { seats: 3 },
            FurnitureKind::Lamp => FurnitureType::Lamp { height: 1.6 },
        }
    }
}

/// One box of a blueprint: dimensions, center relative to the furniture
/// origin and flat colour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartBlueprint {
    pub size: Vector3<f32>,
    pub offset: Vector3<f32>,
    pub color: [f32; 4],
}

impl PartBlueprint {
    pub fn new(size: [f32; 3], offset: [f32; 3], color: [f32; 4]) -> Self {
        Self {
            size: size.into(),
            offset: offset.into(),
            color,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.offset, self.size)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FurnitureBlueprint {
    pub kind: FurnitureKind,
    pub parts: Vec<PartBlueprint>,
}

impl FurnitureBlueprint {
    /// Local bounding box of all parts, `None` for an empty blueprint.
    pub fn bounds(&self) -> Option<Aabb> {
        let mut parts = self.parts.iter();
        let first = parts.next()?.bounds();
        Some(parts.fold(first, |acc, part| acc.union(part.bounds())))
    }
}

/// Produces the static geometry description of a furniture type.
pub trait FurnitureFactory {
    fn create(&self, furniture: &FurnitureType) -> Result<FurnitureBlueprint>;
}

/// Builds every furniture type out of boxes standing on y = 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardFurnitureFactory;

const WOOD: [f32; 4] = [0.55, 0.38, 0.24, 1.0];
const DARK_WOOD: [f32; 4] = [0.36, 0.24, 0.15, 1.0];
const FABRIC: [f32; 4] = [0.30, 0.42, 0.58, 1.0];
const METAL: [f32; 4] = [0.25, 0.25, 0.27, 1.0];
const SHADE: [f32; 4] = [0.96, 0.92, 0.80, 1.0];

fn positive(name: &str, value: f32) -> Result<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(RoomError::InvalidGeometry(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

fn table(width: f32, depth: f32, height: f32) -> Result<Vec<PartBlueprint>> {
    let (width, depth, height) = (
        positive("table width", width)?,
        positive("table depth", depth)?,
        positive("table height", height)?,
    );
    let top = 0.05_f32.min(height * 0.5);
    let leg = 0.06_f32.min(width * 0.25).min(depth * 0.25);
    let leg_height = height - top;
    let lx = width * 0.5 - leg * 0.5;
    let lz = depth * 0.5 - leg * 0.5;
    let mut parts = vec![PartBlueprint::new(
        [width, top, depth],
        [0.0, height - top * 0.5, 0.0],
        WOOD,
    )];
    for (x, z) in [(-lx, -lz), (lx, -lz), (-lx, lz), (lx, lz)] {
        parts.push(PartBlueprint::new(
            [leg, leg_height, leg],
            [x, leg_height * 0.5, z],
            DARK_WOOD,
        ));
    }
    Ok(parts)
}

fn chair(seat_height: f32) -> Result<Vec<PartBlueprint>> {
    let seat_height = positive("seat height", seat_height)?;
    let (width, seat) = (0.45, 0.05);
    let leg = 0.04;
    let leg_height = seat_height - seat;
    if leg_height <= 0.0 {
        return Err(RoomError::InvalidGeometry(format!(
            "seat height {seat_height} leaves no room for the legs"
        )));
    }
    let back_height = 0.45;
    let offset = width * 0.5 - leg * 0.5;
    let mut parts = vec![
        PartBlueprint::new(
            [width, seat, width],
            [0.0, seat_height - seat * 0.5, 0.0],
            WOOD,
        ),
        PartBlueprint::new(
            [width, back_height, leg],
            [0.0, seat_height + back_height * 0.5, -offset],
            WOOD,
        ),
    ];
    for (x, z) in [
        (-offset, -offset),
        (offset, -offset),
        (-offset, offset),
        (offset, offset),
    ] {
        parts.push(PartBlueprint::new(
            [leg, leg_height, leg],
            [x, leg_height * 0.5, z],
            DARK_WOOD,
        ));
    }
    Ok(parts)
}

fn bookshelf(shelves: u32) -> Result<Vec<PartBlueprint>> {
    if shelves == 0 {
        return Err(RoomError::InvalidGeometry(
            "a bookshelf needs at least one shelf".to_string(),
        ));
    }
    let (width, depth, board) = (0.9, 0.3, 0.03);
    let spacing = 0.35;
    let height = shelves as f32 * spacing + board;
    let side_x = width * 0.5 - board * 0.5;
    let inner = width - 2.0 * board;
    let mut parts = vec![
        PartBlueprint::new([board, height, depth], [-side_x, height * 0.5, 0.0], WOOD),
        PartBlueprint::new([board, height, depth], [side_x, height * 0.5, 0.0], WOOD),
        PartBlueprint::new(
            [inner, height, board],
            [0.0, height * 0.5, -depth * 0.5 + board * 0.5],
            DARK_WOOD,
        ),
    ];
    // bottom board plus one per shelf, all identical
    for level in 0..=shelves {
        parts.push(PartBlueprint::new(
            [inner, board, depth - board],
            [0.0, level as f32 * spacing + board * 0.5, board * 0.5],
            WOOD,
        ));
    }
    Ok(parts)
}

fn sofa(seats: u32) -> Result<Vec<PartBlueprint>> {
    if seats == 0 {
        return Err(RoomError::InvalidGeometry(
            "a sofa needs at least one seat".to_string(),
        ));
    }
    let seat_width = 0.6;
    let (depth, base_height, arm) = (0.85, 0.42, 0.18);
    let width = seats as f32 * seat_width;
    let back_height = 0.4;
    let back_depth = 0.2;
    let mut parts = vec![
        PartBlueprint::new(
            [width, base_height, depth],
            [0.0, base_height * 0.5, 0.0],
            FABRIC,
        ),
        PartBlueprint::new(
            [width, back_height, back_depth],
            [
                0.0,
                base_height + back_height * 0.5,
                -depth * 0.5 + back_depth * 0.5,
            ],
            FABRIC,
        ),
    ];
    let arm_height = base_height + 0.2;
    for x in [-(width + arm) * 0.5, (width + arm) * 0.5] {
        parts.push(PartBlueprint::new(
            [arm, arm_height, depth],
            [x, arm_height * 0.5, 0.0],
            FABRIC,
        ));
    }
    Ok(parts)
}

fn lamp(height: f32) -> Result<Vec<PartBlueprint>> {
    let height = positive("lamp height", height)?;
    let base = 0.04_f32.min(height * 0.1);
    let shade = 0.3_f32.min(height * 0.3);
    let pole = height - base - shade;
    if pole <= 0.0 {
        return Err(RoomError::InvalidGeometry(format!(
            "lamp height {height} leaves no room for the pole"
        )));
    }
    Ok(vec![
        PartBlueprint::new([0.3, base, 0.3], [0.0, base * 0.5, 0.0], METAL),
        PartBlueprint::new([0.03, pole, 0.03], [0.0, base + pole * 0.5, 0.0], METAL),
        PartBlueprint::new(
            [0.35, shade, 0.35],
            [0.0, height - shade * 0.5, 0.0],
            SHADE,
        ),
    ])
}

impl FurnitureFactory for StandardFurnitureFactory {
    fn create(&self, furniture: &FurnitureType) -> Result<FurnitureBlueprint> {
        let parts = match *furniture {
            FurnitureType::Table {
                width,
                depth,
                height,
            } => table(width, depth, height)?,
            FurnitureType::Chair { seat_height } => chair(seat_height)?,
            FurnitureType::Bookshelf { shelves } => bookshelf(shelves)?,
            FurnitureType::Sofa { seats } => sofa(seats)?,
            FurnitureType::Lamp { height } => lamp(height)?,
        };
        Ok(FurnitureBlueprint {
            kind: furniture.kind(),
            parts,
        })
    }
}

/// Opaque furniture identity, `"<kind>-<n>"`. Never reused within a store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FurnitureId(pub(crate) String);

impl FurnitureId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FurnitureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A box of a placed piece of furniture.
#[derive(Clone, Debug, PartialEq)]
pub struct FurniturePart {
    pub mesh: MeshHandle,
    pub index_count: u32,
    /// Dimensions the mesh was built with.
    pub size: Vector3<f32>,
    /// Transform relative to the furniture's origin.
    pub local: Instance,
    pub color: [f32; 4],
}

impl FurniturePart {
    /// Extent of the part in furniture space.
    pub fn bounds(&self) -> Aabb {
        let local = Aabb::from_center_size(Vector3::new(0.0, 0.0, 0.0), self.size);
        let corners = local.corners().map(|corner| {
            let scaled = Vector3::new(
                corner.x * self.local.scale.x,
                corner.y * self.local.scale.y,
                corner.z * self.local.scale.z,
            );
            self.local.rotation * scaled + self.local.position
        });
        // corners() is never empty
        Aabb::from_points(corners).unwrap_or(local)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FurnitureInstance {
    pub id: FurnitureId,
    pub kind: FurnitureKind,
    pub parts: Vec<FurniturePart>,
    pub position: Vector3<f32>,
    pub rotation_y: Deg<f32>,
    pub scale: Vector3<f32>,
    pub selected: bool,
    /// Local-space envelope of all parts at unit scale.
    pub bounding_box: Aabb,
    pub texture: Option<TextureHandle>,
}

impl FurnitureInstance {
    pub fn world_instance(&self) -> Instance {
        Instance {
            position: self.position,
            rotation: Quaternion::from_angle_y(self.rotation_y),
            scale: self.scale,
        }
    }

    /// World transform of part `index`.
    pub fn part_instance(&self, index: usize) -> Option<Instance> {
        let part = self.parts.get(index)?;
        Some(self.world_instance() * part.local)
    }

    pub fn world_bounds(&self) -> Aabb {
        self.bounding_box
            .transformed(self.position, self.rotation_y, self.scale)
    }

    pub fn recompute_bounds(&mut self) {
        let mut parts = self.parts.iter();
        if let Some(first) = parts.next() {
            self.bounding_box = parts.fold(first.bounds(), |acc, part| acc.union(part.bounds()));
        }
    }
}
