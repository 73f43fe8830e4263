//! Scope inheritance.
//!
//! # Responsibilities
//! - Resolve each directive as child value, else parent value, else default
//! - Flatten the scope tree into immutable per-location settings
//! - Compile document root templates once, before serving
//!
//! # Design Decisions
//! - Runs once per configuration load; no scope-chain walk at request time
//! - A server without locations gets an implicit `/` location

use crate::access::resolver::{ResolveError, RootResolver};
use crate::config::schema::{LocationConfig, ScopeDirectives, ServerConfig};

pub const DEFAULT_ROOT: &str = "html";
pub const DEFAULT_INDEX: &str = "index.html";
pub const DEFAULT_RECURSIVE: bool = true;

/// Three-value merge: the child's setting, else the parent's, else `default`.
pub fn merge_value<T>(child: Option<T>, parent: Option<T>, default: T) -> T {
    child.or(parent).unwrap_or(default)
}

/// Directive values after inheritance, before compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveDirectives {
    pub root: String,
    pub denyfile: String,
    pub denyfile_recursive: bool,
    pub index: String,
}

impl EffectiveDirectives {
    /// Values for a scope with no parent.
    pub fn top(directives: &ScopeDirectives) -> Self {
        Self::inherit(directives, None)
    }

    /// Values for `child` nested in a scope that resolved to `parent`.
    pub fn inherit(child: &ScopeDirectives, parent: Option<&EffectiveDirectives>) -> Self {
        Self {
            root: merge_value(
                child.root.clone(),
                parent.map(|p| p.root.clone()),
                DEFAULT_ROOT.to_string(),
            ),
            denyfile: merge_value(
                child.denyfile.clone(),
                parent.map(|p| p.denyfile.clone()),
                String::new(),
            ),
            denyfile_recursive: merge_value(
                child.denyfile_recursive,
                parent.map(|p| p.denyfile_recursive),
                DEFAULT_RECURSIVE,
            ),
            index: merge_value(
                child.index.clone(),
                parent.map(|p| p.index.clone()),
                DEFAULT_INDEX.to_string(),
            ),
        }
    }
}

/// Fully resolved, immutable settings of one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScope {
    /// Location prefix this scope matches.
    pub prefix: String,
    /// `host` of the owning server, `_` for the default server.
    pub server_name: String,
    pub root: RootResolver,
    pub denyfile: String,
    pub denyfile_recursive: bool,
    pub index: String,
}

impl Default for ResolvedScope {
    fn default() -> Self {
        Self {
            prefix: "/".to_string(),
            server_name: "_".to_string(),
            root: RootResolver::Static(DEFAULT_ROOT.to_string()),
            denyfile: String::new(),
            denyfile_recursive: DEFAULT_RECURSIVE,
            index: DEFAULT_INDEX.to_string(),
        }
    }
}

/// Resolved locations of one virtual server.
#[derive(Debug, Clone)]
pub struct ResolvedServer {
    /// Lowercased host to match, None for the default server.
    pub host: Option<String>,
    pub scopes: Vec<ResolvedScope>,
}

/// Flatten the configured scope tree.
pub fn resolve_servers(config: &ServerConfig) -> Result<Vec<ResolvedServer>, ResolveError> {
    let main = EffectiveDirectives::top(&config.directives);

    if config.servers.is_empty() {
        let scope = compile_scope("/", "_", &main, &config.prefix)?;
        return Ok(vec![ResolvedServer {
            host: None,
            scopes: vec![scope],
        }]);
    }

    let mut servers = Vec::with_capacity(config.servers.len());
    for server in &config.servers {
        let effective = EffectiveDirectives::inherit(&server.directives, Some(&main));
        let server_name = server.host.as_deref().unwrap_or("_");

        let mut scopes = Vec::new();
        collect_locations(
            &server.locations,
            &effective,
            server_name,
            &config.prefix,
            &mut scopes,
        )?;
        if !scopes.iter().any(|s| s.prefix == "/") {
            scopes.push(compile_scope("/", server_name, &effective, &config.prefix)?);
        }

        servers.push(ResolvedServer {
            host: server.host.as_ref().map(|h| h.to_ascii_lowercase()),
            scopes,
        });
    }
    Ok(servers)
}

fn collect_locations(
    locations: &[LocationConfig],
    parent: &EffectiveDirectives,
    server_name: &str,
    prefix: &str,
    out: &mut Vec<ResolvedScope>,
) -> Result<(), ResolveError> {
    for location in locations {
        let effective = EffectiveDirectives::inherit(&location.directives, Some(parent));
        out.push(compile_scope(&location.prefix, server_name, &effective, prefix)?);
        collect_locations(&location.locations, &effective, server_name, prefix, out)?;
    }
    Ok(())
}

fn compile_scope(
    location: &str,
    server_name: &str,
    effective: &EffectiveDirectives,
    prefix: &str,
) -> Result<ResolvedScope, ResolveError> {
    Ok(ResolvedScope {
        prefix: location.to_string(),
        server_name: server_name.to_string(),
        root: RootResolver::parse(&effective.root, prefix)?,
        denyfile: effective.denyfile.clone(),
        denyfile_recursive: effective.denyfile_recursive,
        index: effective.index.clone(),
    })
}
