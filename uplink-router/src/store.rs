use async_trait::async_trait;
use uplink_core::UploadResult;

/// Storage collaborator contract.
///
/// The router only ever needs three operations from object storage: sign a
/// single-use write, resolve a public URL, and check existence. Credentials
/// stay on this side of the trait; clients only ever see signed URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Produce a time-boxed signed PUT for exactly one object.
    async fn sign_put(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        expires_in_secs: u64,
    ) -> UploadResult<SignedPut>;

    /// Public (unsigned) URL for a stored object.
    fn public_url(&self, key: &str) -> String;

    /// Whether an object exists at `key`.
    async fn exists(&self, key: &str) -> UploadResult<bool>;
}

/// A signed write permission for one object.
#[derive(Debug, Clone)]
pub struct SignedPut {
    pub url: String,
    pub key: String,
}
