//! Verification photo store, content-addressed by SHA-256

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::{Photo, PhotoRef};

#[derive(Clone, Default)]
pub struct PhotoRepository {
    blobs: Arc<RwLock<HashMap<String, Photo>>>,
}

impl PhotoRepository {
    /// Store the payload as-is; identical uploads share one entry
    pub async fn store(&self, photo: &Photo) -> PhotoRef {
        let photo_ref = photo.to_ref();
        self.blobs
            .write()
            .await
            .entry(photo_ref.sha256.clone())
            .or_insert_with(|| photo.clone());
        photo_ref
    }

    pub async fn get(&self, sha256: &str) -> Option<Photo> {
        self.blobs.read().await.get(sha256).cloned()
    }

    pub async fn count(&self) -> usize {
        self.blobs.read().await.len()
    }
}
