//! Edge-resolution and response-caching layer for a multi-tenant hosting
//! platform.

pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod render;
pub mod resolver;
pub mod routing;

pub use config::EdgeConfig;
pub use error::EdgeError;
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
