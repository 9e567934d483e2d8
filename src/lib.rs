//! room-ngin
//!
//! An interactive room-design engine built on wgpu. Furniture made of boxes is
//! placed inside a room shell, lit by a directional light with shadow-mapped
//! Phong shading, and selected by casting rays from the pointer.
//!
//! High-level modules
//! - `app`: winit event loop driving a [`engine::RoomEngine`]
//! - `camera`: orbit/fly camera rig, projection, controller and uniforms
//! - `config`: engine configuration with defaults
//! - `context`: window surface and device setup
//! - `data_structures`: geometry, furniture, scene store, instances, textures
//! - `editor`: the surface-independent engine context and input handling
//! - `pick`: ray construction and ray/box intersection
//! - `pipelines`: shadow and main passes and their light uniforms
//! - `render`: per-frame draw lists and pass sequencing
//! - `resources`: GPU resource manager, backends and texture loading
//!

pub mod app;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod editor;
pub mod engine;
pub mod error;
pub mod pick;
pub mod pipelines;
pub mod render;
pub mod resources;

pub use error::{Result, RoomError};
