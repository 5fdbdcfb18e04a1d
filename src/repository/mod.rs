//! Generic cache-aside repository shared by every console resource.
//!
//! This module provides one implementation of the read-through/write-through
//! pattern:
//! - Lists are served from the cache until explicitly refreshed
//! - Single records are looked up in the cached list before the network
//! - Mutations hit the server first and patch the cache only on success
//! - A single fallback policy decides whether failed refreshes serve stale data

mod layer;
mod traits;

pub use layer::{CacheAsideRepository, FallbackPolicy};
pub use traits::{CacheSource, Resource, ResourceDescriptor};
