use axum::extract::FromRef;

use crate::album_store::AlbumStore;
use crate::pipeline::UploadPipeline;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedAlbumStore = Arc<dyn AlbumStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub pipeline: UploadPipeline,
    pub album_store: GuardedAlbumStore,
}

impl ServerState {
    pub fn new(config: ServerConfig, pipeline: UploadPipeline) -> Self {
        let album_store = pipeline.album_store().clone();
        ServerState {
            config,
            start_time: Instant::now(),
            pipeline,
            album_store,
        }
    }
}

impl FromRef<ServerState> for GuardedAlbumStore {
    fn from_ref(input: &ServerState) -> Self {
        input.album_store.clone()
    }
}

impl FromRef<ServerState> for UploadPipeline {
    fn from_ref(input: &ServerState) -> Self {
        input.pipeline.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
