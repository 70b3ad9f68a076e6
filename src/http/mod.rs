//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, edge pipeline)
//!     → request.rs (request id)
//!     → recorder.rs (response cache capture on the way out)
//!     → Send to client
//! ```

pub mod recorder;
pub mod request;
pub mod server;

pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::{AppState, EdgeServer, Principal};
