//! Asynchronous texture loading.
//!
//! Fetching and decoding happen on the tokio runtime; the frame loop only ever
//! sees finished [`TextureImage`]s, drained without blocking through
//! [`TextureLoader::drain`]. Until a load lands, the requesting entity renders
//! with the placeholder texture. Each request carries a token so a load that
//! was superseded by a newer request for the same entity is dropped instead of
//! overwriting the newer result.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::sync::mpsc;

use crate::{
    data_structures::{scene::EntityId, texture::TextureImage},
    error::{Result, RoomError},
    resources::procedural::TextureProvider,
};

/// Where the pixels of a texture come from.
#[derive(Clone)]
pub enum TextureSource {
    File(PathBuf),
    Bytes {
        name: String,
        bytes: Vec<u8>,
    },
    Procedural {
        provider: Arc<dyn TextureProvider>,
        kind: String,
        width: u32,
        height: u32,
    },
}

impl TextureSource {
    pub fn name(&self) -> String {
        match self {
            TextureSource::File(path) => path.display().to_string(),
            TextureSource::Bytes { name, .. } => name.clone(),
            TextureSource::Procedural {
                kind,
                width,
                height,
                ..
            } => format!("procedural:{kind}@{width}x{height}"),
        }
    }
}

impl std::fmt::Debug for TextureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TextureSource").field(&self.name()).finish()
    }
}

pub async fn load_binary(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| RoomError::TextureLoad {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Fetches and decodes `source`. Decoding and generation run on the blocking
/// pool so they never stall the runtime's reactor.
pub async fn fetch_texture(source: TextureSource) -> Result<TextureImage> {
    let name = source.name();
    let job = match source {
        TextureSource::File(path) => {
            let bytes = load_binary(&path).await?;
            tokio::task::spawn_blocking(move || TextureImage::decode(&bytes, &name))
        }
        TextureSource::Bytes { name, bytes } => {
            tokio::task::spawn_blocking(move || TextureImage::decode(&bytes, &name))
        }
        TextureSource::Procedural {
            provider,
            kind,
            width,
            height,
        } => tokio::task::spawn_blocking(move || {
            let rgba = provider.generate(&kind, width, height);
            TextureImage::new(width, height, rgba, &name)
        }),
    };
    job.await.map_err(|e| RoomError::TextureLoad {
        source_name: "texture task".to_string(),
        reason: e.to_string(),
    })?
}

/// A finished load, successful or not.
#[derive(Debug)]
pub struct CompletedLoad {
    pub entity: EntityId,
    pub token: u64,
    pub source_name: String,
    pub result: Result<TextureImage>,
}

pub struct TextureLoader {
    runtime: tokio::runtime::Handle,
    sender: mpsc::UnboundedSender<CompletedLoad>,
    receiver: mpsc::UnboundedReceiver<CompletedLoad>,
    latest: HashMap<EntityId, u64>,
    next_token: u64,
}

impl TextureLoader {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            runtime,
            sender,
            receiver,
            latest: HashMap::new(),
            next_token: 0,
        }
    }

    /// Starts loading `source` for `entity` and returns immediately.
    pub fn request(&mut self, entity: EntityId, source: TextureSource) -> u64 {
        self.next_token += 1;
        let token = self.next_token;
        self.latest.insert(entity.clone(), token);
        let sender = self.sender.clone();
        let source_name = source.name();
        log::debug!("Loading texture {} for {}", source_name, entity);
        self.runtime.spawn(async move {
            let result = fetch_texture(source).await;
            // The receiver is gone only when the loader was dropped
            let _ = sender.send(CompletedLoad {
                entity,
                token,
                source_name,
                result,
            });
        });
        token
    }

    /// Forgets outstanding requests for `entity`; their results will be dropped.
    pub fn cancel(&mut self, entity: &EntityId) {
        self.latest.remove(entity);
    }

    pub fn pending(&self) -> usize {
        self.latest.len()
    }

    pub fn is_pending(&self, entity: &EntityId) -> bool {
        self.latest.contains_key(entity)
    }

    /// Returns every load that finished since the last call and is still the
    /// most recent request for its entity.
    pub fn drain(&mut self) -> Vec<CompletedLoad> {
        let mut completed = Vec::new();
        while let Ok(load) = self.receiver.try_recv() {
            match self.latest.get(&load.entity) {
                Some(token) if *token == load.token => {
                    self.latest.remove(&load.entity);
                    completed.push(load);
                }
                _ => log::debug!(
                    "Dropping superseded texture {} for {}",
                    load.source_name,
                    load.entity
                ),
            }
        }
        completed
    }
}
