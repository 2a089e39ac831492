// src/cache/mod.rs

//! Cache placement and the artifact store.
//!
//! - [`location`] validates and creates the cache root for a request.
//! - [`store`] maps `(node, input-state key)` to the artifact record.
//! - [`hash`] holds the blake3 helpers behind key derivation.

pub mod hash;
pub mod location;
pub mod store;

pub use location::CacheLocation;
pub use store::{ARTIFACT_FILE, Artifact, ArtifactKind, Cache};
