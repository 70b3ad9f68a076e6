//! Caching subsystem.
//!
//! # Data Flow
//! ```text
//! hostname ──→ resolution.rs ──→ cached context / redirect  (TTL 72h)
//! context  ──→ response.rs  ──→ fingerprint ──→ headers + content records
//! both     ──→ store.rs     ──→ memory or Redis backend
//! ```
//!
//! # Design Decisions
//! - Both caches share one injected byte-store; neither owns connections
//! - Cache failures degrade to miss/skip, they are never request-fatal
//! - No cross-instance locking: writes are idempotent upserts and
//!   last-writer-wins is safe because equal inputs produce equal values

pub mod resolution;
pub mod response;
pub mod store;

pub use resolution::{CachedContext, CachedRedirect, ResolutionCache, ResolutionEntry};
pub use response::{compute_fingerprint, normalized_url, CachedResponse, ResponseCache};
pub use store::{build_store, KeyValueStore, MemoryStore, RedisStore, StoreError};
