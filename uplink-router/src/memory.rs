use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::RwLock;
use uplink_core::UploadResult;
use uuid::Uuid;

use crate::store::{ObjectStore, SignedPut};

/// In-memory object store for tests and local development.
///
/// There is no real storage behind it; `mark_uploaded` simulates the direct
/// transfer so `exists` flips from false to true the way a real bucket
/// would after a successful PUT.
pub struct MemoryObjectStore {
    base_url: String,
    objects: RwLock<HashSet<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::with_base_url("memory://bucket")
    }

    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashSet::new()),
        }
    }

    /// Simulate a completed direct transfer.
    pub fn mark_uploaded(&self, key: &str) {
        self.objects.write().insert(key.to_string());
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn sign_put(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        expires_in_secs: u64,
    ) -> UploadResult<SignedPut> {
        let signature = Uuid::new_v4().simple().to_string();
        let url = format!(
            "{}/{key}?signature={signature}&contentType={content_type}&contentLength={content_length}&expiresIn={expires_in_secs}",
            self.base_url
        );
        Ok(SignedPut {
            url,
            key: key.to_string(),
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }

    async fn exists(&self, key: &str) -> UploadResult<bool> {
        Ok(self.objects.read().contains(key))
    }
}
