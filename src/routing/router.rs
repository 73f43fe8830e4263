//! Scope lookup.
//!
//! # Responsibilities
//! - Store compiled servers and their locations
//! - Pick the server by host, then the longest matching location prefix
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) prefix scan over locations sorted longest first
//! - Every server owns a `/` location, so lookup always yields a scope

use std::sync::Arc;

use crate::config::merge::{ResolvedScope, ResolvedServer};
use crate::routing::matcher::{HostMatcher, PathPrefixMatcher};

#[derive(Debug)]
struct Location {
    matcher: PathPrefixMatcher,
    scope: Arc<ResolvedScope>,
}

#[derive(Debug)]
struct Server {
    host: Option<HostMatcher>,
    locations: Vec<Location>,
}

/// Maps `(host, path)` to the scope that governs the request.
#[derive(Debug)]
pub struct LocationRouter {
    servers: Vec<Server>,
    /// Index of the server used when no host matches.
    default_server: usize,
}

impl LocationRouter {
    pub fn new(resolved: Vec<ResolvedServer>) -> Self {
        let mut servers: Vec<Server> = resolved
            .into_iter()
            .map(|server| {
                let mut locations: Vec<Location> = server
                    .scopes
                    .into_iter()
                    .map(|scope| Location {
                        matcher: PathPrefixMatcher::new(scope.prefix.clone()),
                        scope: Arc::new(scope),
                    })
                    .collect();
                // Longest prefix first; stable sort keeps config order on ties.
                locations.sort_by(|a, b| b.matcher.prefix_len().cmp(&a.matcher.prefix_len()));

                Server {
                    host: server.host.map(HostMatcher::new),
                    locations,
                }
            })
            .collect();

        if servers.is_empty() {
            servers.push(Server {
                host: None,
                locations: vec![Location {
                    matcher: PathPrefixMatcher::new("/"),
                    scope: Arc::new(ResolvedScope::default()),
                }],
            });
        }

        let default_server = servers.iter().position(|s| s.host.is_none()).unwrap_or(0);

        Self {
            servers,
            default_server,
        }
    }

    /// Scope for a request; falls back to the server's `/` location.
    pub fn lookup(&self, host: Option<&str>, path: &str) -> Arc<ResolvedScope> {
        let server = self
            .servers
            .iter()
            .find(|s| s.host.as_ref().is_some_and(|m| m.matches(host)))
            .unwrap_or(&self.servers[self.default_server]);

        server
            .locations
            .iter()
            .find(|l| l.matcher.matches(path))
            .or_else(|| server.locations.last())
            .map(|l| l.scope.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(prefix: &str, denyfile: &str) -> ResolvedScope {
        ResolvedScope {
            prefix: prefix.to_string(),
            denyfile: denyfile.to_string(),
            ..ResolvedScope::default()
        }
    }

    fn router() -> LocationRouter {
        LocationRouter::new(vec![
            ResolvedServer {
                host: Some("example.com".to_string()),
                scopes: vec![
                    scope("/", "root"),
                    scope("/public/", "public"),
                    scope("/public/private/", "private"),
                ],
            },
            ResolvedServer {
                host: None,
                scopes: vec![scope("/", "default")],
            },
        ])
    }

    #[test]
    fn test_longest_prefix_wins() {
        let router = router();
        let host = Some("example.com");
        assert_eq!(router.lookup(host, "/public/private/x").denyfile, "private");
        assert_eq!(router.lookup(host, "/public/x").denyfile, "public");
        assert_eq!(router.lookup(host, "/other").denyfile, "root");
    }

    #[test]
    fn test_unknown_host_uses_default_server() {
        let router = router();
        assert_eq!(router.lookup(Some("other.test"), "/public/x").denyfile, "default");
        assert_eq!(router.lookup(None, "/").denyfile, "default");
    }

    #[test]
    fn test_empty_router_yields_default_scope() {
        let router = LocationRouter::new(Vec::new());
        assert_eq!(router.lookup(None, "/x").denyfile, "");
    }
}
