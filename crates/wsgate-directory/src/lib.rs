//! # wsgate-directory
//!
//! Externalized session ownership with bounded lifetime.
//!
//! - [`Instance`]: identity of a gateway process
//! - [`SessionRecord`]: who owns a session and since when
//! - [`DirectoryStore`]: key/value capability with TTLs (Redis or in-memory)
//! - [`SessionDirectory`]: record shape, key namespace, TTL policy, not-found semantics
//!
//! TTL expiry is the only thing that reclaims records left behind by an
//! instance that crashed without deregistering; every successful delivery
//! refreshes the TTL so a session stays listed while it is in use.

#![deny(unsafe_code)]

pub mod directory;
pub mod errors;
pub mod instance;
pub mod memory;
pub mod record;
pub mod redis_store;
pub mod store;

pub use directory::{SessionDirectory, session_key};
pub use errors::{DirectoryError, Result};
pub use instance::Instance;
pub use memory::MemoryStore;
pub use record::SessionRecord;
pub use redis_store::RedisStore;
pub use store::DirectoryStore;
