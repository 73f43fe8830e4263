//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, path checks)
//!     → pipeline.rs (post-read and access phase handlers)
//!         → 400 / 403 / 500 answered here
//!     → response.rs (content phase: static file)
//!     → Send to client
//! ```

pub mod middleware;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use pipeline::{HandlerOutcome, Phase, PhaseHandler, Pipeline, RequestContext};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
