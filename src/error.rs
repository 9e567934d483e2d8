//! Error taxonomy of the engine.
//!
//! Startup failures ([`RoomError::ShaderCompile`], adapter/surface problems
//! surfaced through `anyhow`) abort initialization. Everything raised while the
//! frame loop is running is caught at the operation boundary and degrades: a
//! failed upload skips the draw, a failed texture load keeps the placeholder.
//! A pick that hits nothing is not an error at all and is returned as `None`.

use std::fmt;

/// Shader stage named in a [`RoomError::ShaderCompile`] report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Link,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
            ShaderStage::Link => f.write_str("link"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("{stage} stage of program '{label}' failed to compile: {log}")]
    ShaderCompile {
        stage: ShaderStage,
        label: String,
        log: String,
    },
    #[error("could not allocate {resource}: {detail}")]
    ResourceExhaustion { resource: String, detail: String },
    #[error("texture '{source_name}' could not be loaded: {reason}")]
    TextureLoad { source_name: String, reason: String },
    #[error("handle does not refer to a live resource")]
    InvalidHandle,
    #[error("{vertices} vertices do not fit into 16-bit indices")]
    IndexOverflow { vertices: usize },
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("no entity with id '{0}'")]
    UnknownEntity(String),
}

impl RoomError {
    /// Whether the frame loop may carry on after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RoomError::ShaderCompile { .. })
    }
}

pub type Result<T> = std::result::Result<T, RoomError>;
