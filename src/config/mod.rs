//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → merge.rs (scope inheritance, root templates compiled)
//!     → immutable ResolvedScope per location
//!     → shared via Arc to all requests
//!
//! On change (optional):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the compiled snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod merge;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AccessConfig, ListenerConfig, LocationConfig, ObservabilityConfig, ScopeDirectives,
    ServerConfig, TimeoutConfig, VirtualServerConfig,
};
