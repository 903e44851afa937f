//! Object key generation.
//!
//! Keys are built from the route name, an optional middleware-derived
//! identity, a timestamp, a random disambiguator, and the sanitized
//! original filename: `route/identity/ts-rand-name`.

use uplink_core::{FileDescriptor, UploadConfig};
use uuid::Uuid;

use crate::route::Metadata;

/// Metadata keys consulted for the identity segment, in order.
const IDENTITY_KEYS: [&str; 2] = ["userId", "identity"];

/// Policy for turning a validated descriptor into an object key.
#[derive(Debug, Clone)]
pub struct ObjectKeyPolicy {
    pub preserve_extension: bool,
}

impl Default for ObjectKeyPolicy {
    fn default() -> Self {
        Self {
            preserve_extension: true,
        }
    }
}

impl ObjectKeyPolicy {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            preserve_extension: config.preserve_extension,
        }
    }

    /// Build a unique object key for one authorized file.
    pub fn object_key(
        &self,
        route: &str,
        metadata: &Metadata,
        descriptor: &FileDescriptor,
        timestamp: i64,
    ) -> String {
        let rand = Uuid::new_v4().simple().to_string();
        let name = self.sanitized_name(descriptor);

        let mut segments = vec![sanitize(route)];
        if let Some(identity) = identity_from(metadata) {
            segments.push(sanitize(&identity));
        }
        segments.push(format!("{timestamp}-{}-{name}", &rand[..8]));
        segments.join("/")
    }

    fn sanitized_name(&self, descriptor: &FileDescriptor) -> String {
        match descriptor.extension() {
            Some(ext) if self.preserve_extension => {
                let stem_len = descriptor.name.len() - ext.len() - 1;
                let stem = sanitize(&descriptor.name[..stem_len]);
                format!("{stem}.{}", sanitize(&ext))
            }
            Some(ext) => {
                // Drop the extension entirely when the policy says so.
                let stem_len = descriptor.name.len() - ext.len() - 1;
                sanitize(&descriptor.name[..stem_len])
            }
            None => sanitize(descriptor.name.trim_end_matches('.')),
        }
    }
}

fn identity_from(metadata: &Metadata) -> Option<String> {
    IDENTITY_KEYS
        .iter()
        .find_map(|k| metadata.get(*k))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Strip every character outside `[A-Za-z0-9.-]`.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
        .collect()
}
