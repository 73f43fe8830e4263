//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (server + location lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: the ResolvedScope governing the request
//!
//! Compilation (at startup and on reload):
//!     ResolvedServer[]
//!     → Sort locations by prefix length
//!     → Freeze as immutable LocationRouter
//! ```
//!
//! # Design Decisions
//! - Compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same scope

pub mod matcher;
pub mod router;

pub use router::LocationRouter;
