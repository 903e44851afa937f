//! uplink-schema: composable validators for file-like values.
//!
//! A [`Schema`] is an immutable value describing what a route accepts: a
//! single file, an image-specialized file, an array of schemas, or an
//! object of named schemas. Constraint chainers (`max_size`, `accept`,
//! `refine`, ...) never mutate in place; every call clones into a new
//! `Schema`, so schemas can be shared across concurrent requests and
//! exported as analyzable values.
//!
//! ```
//! use uplink_schema::{image, array_of};
//!
//! let avatars = array_of(image().max_size("4MB").extensions(["png", "jpg"]))
//!     .max_items(3);
//! ```
//!
//! Validation runs a fixed pipeline: optional short-circuit, kind-specific
//! constraint check, ordered refinements (first failure wins), ordered
//! transforms. Failures carry `{code, message, path}` with child paths
//! prefixed `[index]` / `.field`.

mod batch;
mod constraints;
mod issue;
mod schema;
mod size;
mod value;

pub use constraints::FileConstraints;
pub use issue::{codes, SchemaIssue};
pub use schema::{array_of, file, image, object_of, Kind, Refinement, Schema, Transform};
pub use size::{parse_size, SizeSpec};
pub use value::{FileValue, RefineContext};
