//! uplink-client: the uploading half of the wire contract.
//!
//! An [`Uploader`] drives a batch of files through authorize, concurrent
//! direct PUTs against signed storage URLs, and complete. Every file gets
//! an [`UploadTask`] on a shared [`UploadSession`]; tasks move through a
//! monotonic Pending → Uploading → Success/Error state machine and carry
//! live progress, transfer speed, and ETA while bytes are in flight.
//!
//! The network seams live behind the [`Transport`] trait. [`HttpTransport`]
//! speaks real HTTP via reqwest; tests substitute their own.

mod progress;
mod session;
mod task;
mod transport;
mod uploader;

pub use progress::{ProgressEvent, ProgressSample, SpeedEstimator};
pub use session::UploadSession;
pub use task::{UploadStatus, UploadTask};
pub use transport::{HttpTransport, ProgressSink, Transport};
pub use uploader::{FilePayload, Uploader};
