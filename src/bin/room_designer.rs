//! Opens the room designer.
//!
//! Keys: 1-5 add a table, chair, bookshelf, sofa or lamp; R rotates and
//! Delete removes the selection; T cycles procedural textures on it; Tab
//! switches between orbit and fly camera; Escape clears the selection.

use room_ngin::{app, config::EngineConfig};

fn main() -> anyhow::Result<()> {
    app::run(EngineConfig::default())
}
