//! uplink-core: transport-agnostic contract for the Uplink upload toolkit.
//!
//! Everything a server router and a browser-side orchestrator must agree on
//! lives here: the wire protocol for the authorize → direct-transfer →
//! complete handshake, the structured error kinds, the generic HTTP shapes
//! the host framework adapts to, and the injected configuration value.
//!
//! Nothing in this crate talks to a network or an object store.

pub mod config;
pub mod errors;
pub mod http;
pub mod wire;

pub use config::UploadConfig;
pub use errors::{ErrorDetail, UploadError, UploadResult};
pub use http::{HttpRequest, HttpResponse};
pub use wire::{
    AuthorizationGrant, AuthorizeOutcome, AuthorizeRequest, AuthorizeResponse, CompleteOutcome,
    CompleteRequest, CompleteResponse, CompletionEntry, FileDescriptor, UploadAction,
};
