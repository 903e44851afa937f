//! uplink-router: named upload routes dispatched against object storage.
//!
//! A [`Route`] binds one validation schema to an ordered middleware chain
//! and optional lifecycle hooks. A [`Router`] is a name → route registry
//! exposing the two batch operations of the wire contract:
//!
//! - `authorize`: validate file metadata, fold middleware into per-file
//!   metadata, and issue time-boxed signed PUT grants
//! - `complete`: confirm finished direct transfers and resolve public URLs
//!
//! Both operations have partial-failure semantics: one file's failure never
//! affects a sibling's result. Configuration problems (missing bucket or
//! credentials) are the exception and abort the whole call.
//!
//! The storage collaborator is the [`ObjectStore`] trait; `S3ObjectStore`
//! signs against any S3-compatible endpoint and `MemoryObjectStore` backs
//! the test suites.

pub mod keys;
mod memory;
pub mod route;
pub mod router;
mod s3;
pub mod store;

pub use keys::ObjectKeyPolicy;
pub use memory::MemoryObjectStore;
pub use route::{middleware_fn, Metadata, Middleware, Route, RouteBuilder, RouteHooks};
pub use route::{UploadCompleted, UploadFailure, UploadStarted};
pub use router::Router;
pub use s3::{S3Config, S3ObjectStore};
pub use store::{ObjectStore, SignedPut};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        middleware_fn, MemoryObjectStore, Metadata, Middleware, ObjectStore, Route, RouteHooks,
        Router, S3Config, S3ObjectStore,
    };
    pub use uplink_core::{UploadConfig, UploadError, UploadResult};
    pub use uplink_schema::{array_of, file, image, object_of, Schema};
}
