//! Configuration schema definitions.
//!
//! Scopes nest main → server → location → location. Directives left unset
//! in a scope inherit from the enclosing one; see `merge.rs`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration for the server (the main scope).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base directory for relative `root` values.
    pub prefix: String,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Access phase execution settings.
    pub access: AccessConfig,

    /// Directives set at main scope.
    #[serde(flatten)]
    pub directives: ScopeDirectives,

    /// Virtual servers. Empty means one catch-all server.
    pub servers: Vec<VirtualServerConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            prefix: "/usr/local/denyfile".to_string(),
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            access: AccessConfig::default(),
            directives: ScopeDirectives::default(),
            servers: Vec::new(),
        }
    }
}

/// Directives that may appear in any scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScopeDirectives {
    /// Document root, possibly templated (`/srv/$host`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// Marker file name. Empty disables the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denyfile: Option<String>,

    /// Check every ancestor directory (`on`) or only the containing one.
    #[serde(
        default,
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub denyfile_recursive: Option<bool>,

    /// File served for directory requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

/// Server scope.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VirtualServerConfig {
    /// Host header to match (exact, case-insensitive). None = default server.
    #[serde(default)]
    pub host: Option<String>,

    #[serde(flatten)]
    pub directives: ScopeDirectives,

    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

/// Location scope, matched by path prefix.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocationConfig {
    /// Path prefix to match (case-sensitive).
    pub prefix: String,

    #[serde(flatten)]
    pub directives: ScopeDirectives,

    /// Nested locations; prefixes must extend this one.
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum requests processed at once (backpressure).
    pub max_concurrent_requests: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_concurrent_requests: 10_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Access phase execution.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Run phase handlers on the blocking pool instead of the event loop.
    pub offload_probes: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            offload_probes: true,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Word(String),
}

/// Accepts `true`/`false` as well as `"on"`/`"off"`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Flag::Bool(value)) => Ok(Some(value)),
        Some(Flag::Word(word)) => match word.as_str() {
            "on" => Ok(Some(true)),
            "off" => Ok(Some(false)),
            other => Err(D::Error::custom(format!(
                "invalid value \"{}\", it must be \"on\" or \"off\"",
                other
            ))),
        },
    }
}
