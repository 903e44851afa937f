//! Configuration for upload operations.
//!
//! An explicit value injected into router and store constructors, so a
//! process can run several independent instances (the test suites rely on
//! this). There is no global state anywhere in the workspace.

/// Configuration shared by the router and the grant generator.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// How long an authorization grant stays valid, in seconds.
    pub url_expiry_secs: u64,

    /// Keep the original filename extension on generated object keys.
    pub preserve_extension: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            url_expiry_secs: 3600,
            preserve_extension: true,
        }
    }
}

impl UploadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grant expiry window.
    pub fn with_url_expiry_secs(mut self, secs: u64) -> Self {
        self.url_expiry_secs = secs;
        self
    }

    /// Drop original extensions from generated keys.
    pub fn without_extension_preservation(mut self) -> Self {
        self.preserve_extension = false;
        self
    }
}
