//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, bind address parses)
//! - Reject marker and index names that are not plain file names
//! - Check location prefixes and nesting
//! - Check root templates compile
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::access::resolver::{ResolveError, RootResolver};
use crate::config::schema::{LocationConfig, ScopeDirectives, ServerConfig};

/// A single semantic problem, labelled with the scope it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address \"{0}\" is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address \"{0}\" is not a socket address")]
    MetricsAddress(String),

    #[error("listener.max_concurrent_requests must be greater than zero")]
    ZeroConcurrency,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("{scope}: location prefix \"{prefix}\" must start with '/'")]
    LocationPrefix { scope: String, prefix: String },

    #[error("{scope}: nested location \"{prefix}\" is outside of \"{parent}\"")]
    NestedPrefix {
        scope: String,
        parent: String,
        prefix: String,
    },

    #[error("{scope}: denyfile \"{name}\" must be a plain file name")]
    DenyfileName { scope: String, name: String },

    #[error("{scope}: index \"{name}\" must be a plain file name")]
    IndexName { scope: String, name: String },

    #[error("{scope}: root must not be empty")]
    EmptyRoot { scope: String },

    #[error("{scope}: {source}")]
    RootTemplate {
        scope: String,
        #[source]
        source: ResolveError,
    },
}

/// Validate the whole configuration tree.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::ZeroConcurrency);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    check_directives("main", &config.directives, &mut errors);

    for server in &config.servers {
        let scope = match &server.host {
            Some(host) => format!("server {}", host),
            None => "server _".to_string(),
        };
        check_directives(&scope, &server.directives, &mut errors);
        check_locations(&scope, None, &server.locations, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A marker must name an entry inside the probed directory.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\0'])
}

fn check_locations(
    server: &str,
    parent: Option<&str>,
    locations: &[LocationConfig],
    errors: &mut Vec<ValidationError>,
) {
    for location in locations {
        let scope = format!("{} location {}", server, location.prefix);

        if !location.prefix.starts_with('/') {
            errors.push(ValidationError::LocationPrefix {
                scope: scope.clone(),
                prefix: location.prefix.clone(),
            });
        }
        if let Some(parent) = parent {
            if !location.prefix.starts_with(parent) {
                errors.push(ValidationError::NestedPrefix {
                    scope: scope.clone(),
                    parent: parent.to_string(),
                    prefix: location.prefix.clone(),
                });
            }
        }

        check_directives(&scope, &location.directives, errors);
        check_locations(server, Some(&location.prefix), &location.locations, errors);
    }
}

fn check_directives(scope: &str, directives: &ScopeDirectives, errors: &mut Vec<ValidationError>) {
    if let Some(name) = &directives.denyfile {
        if !name.is_empty() && !is_plain_file_name(name) {
            errors.push(ValidationError::DenyfileName {
                scope: scope.to_string(),
                name: name.clone(),
            });
        }
    }

    // The index is served from the directory the access check probed.
    if let Some(name) = &directives.index {
        if !is_plain_file_name(name) {
            errors.push(ValidationError::IndexName {
                scope: scope.to_string(),
                name: name.clone(),
            });
        }
    }

    if let Some(root) = &directives.root {
        if root.is_empty() {
            errors.push(ValidationError::EmptyRoot {
                scope: scope.to_string(),
            });
        } else if let Err(source) = RootResolver::parse(root, "") {
            errors.push(ValidationError::RootTemplate {
                scope: scope.to_string(),
                source,
            });
        }
    }
}
