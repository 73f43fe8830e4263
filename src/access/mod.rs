//! Deny-marker access control.
//!
//! # Data Flow
//! ```text
//! Access phase (per request):
//!     RequestContext (path, matched scope)
//!     → resolver.rs (document root: static or templated)
//!     → denyfile.rs (walk directory ancestors)
//!     → probe.rs (lstat each candidate)
//!     → handler.rs (Declined | 403 | 500)
//! ```
//!
//! # Design Decisions
//! - Marker contents are never read; presence of the entry is the signal
//! - Symlinks are not followed, a dangling link still denies
//! - Probe errors count as "not found", the walk continues upward
//! - Unresolvable document root fails open (check is not decidable)
//! - Allocation failure fails closed (internal error)
//! - Nothing is cached between requests

pub mod denyfile;
pub mod handler;
pub mod probe;
pub mod resolver;

pub use denyfile::{check_denied, AccessError};
pub use handler::{register, DenyfileHandler};
pub use probe::{ExistenceProbe, LstatProbe};
pub use resolver::{ResolveError, RequestVars, RootResolver};
