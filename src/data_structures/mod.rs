//! Engine data structures: geometry, furniture, the scene store and textures.
//!
//! - `bounds` has the axis-aligned boxes used for picking
//! - `geometry` builds boxes and the room shell with door and window cut-outs
//! - `furniture` describes furniture types and how they are assembled from boxes
//! - `scene` owns every placed entity and the selection
//! - `instance` holds per-draw transformation data
//! - `texture` contains CPU images and GPU texture wrappers

pub mod bounds;
pub mod furniture;
pub mod geometry;
pub mod instance;
pub mod scene;
pub mod texture;
