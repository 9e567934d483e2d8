//! Render passes.
//!
//! - `basic` holds the shared pipeline builders
//! - `light` has the directional light, its uniform and the CPU shading mirror
//! - `shadow` renders depth from the light into the shadow map
//! - `phong` shades the scene from the camera using that shadow map

pub mod basic;
pub mod light;
pub mod phong;
pub mod shadow;
