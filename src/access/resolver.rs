//! Document root resolution.
//!
//! A root is either a fixed path or a template interpolating request
//! variables (`$host`, `$server_name`, `$http_<header>`). Templates are
//! parsed once when configuration is compiled; per request only the
//! substitution runs.

use axum::http::HeaderMap;
use thiserror::Error;

/// Why a document root could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unknown variable \"${0}\" in root template")]
    UnknownVariable(String),

    #[error("root template has an unterminated \"${{\"")]
    Unterminated,

    #[error("variable \"${0}\" is not set for this request")]
    MissingVariable(String),

    #[error("variable \"${name}\" expands to an unsafe path component")]
    UnsafeValue { name: String },
}

/// Per-request inputs for template substitution.
#[derive(Debug, Clone, Copy)]
pub struct RequestVars<'a> {
    pub host: Option<&'a str>,
    pub server_name: &'a str,
    pub headers: &'a HeaderMap,
}

/// One piece of a parsed root template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Host,
    ServerName,
    Header(String),
}

impl Segment {
    fn variable(name: &str) -> Result<Self, ResolveError> {
        match name {
            "host" => Ok(Segment::Host),
            "server_name" => Ok(Segment::ServerName),
            _ => match name.strip_prefix("http_") {
                Some(header) if !header.is_empty() => {
                    Ok(Segment::Header(header.replace('_', "-").to_ascii_lowercase()))
                }
                _ => Err(ResolveError::UnknownVariable(name.to_string())),
            },
        }
    }
}

/// Produces the document root for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootResolver {
    /// Root known at configuration time.
    Static(String),
    /// Root computed per request; `prefix` anchors relative results.
    Template { segments: Vec<Segment>, prefix: String },
}

impl RootResolver {
    /// Compile `root`, anchoring a relative result at `prefix`.
    pub fn parse(root: &str, prefix: &str) -> Result<Self, ResolveError> {
        let segments = parse_segments(root)?;

        if segments.iter().all(|s| matches!(s, Segment::Literal(_))) {
            return Ok(RootResolver::Static(full_name(prefix, root)));
        }

        Ok(RootResolver::Template {
            segments,
            prefix: prefix.to_string(),
        })
    }

    /// Root for the request described by `vars`.
    pub fn resolve(&self, vars: &RequestVars<'_>) -> Result<String, ResolveError> {
        let (segments, prefix) = match self {
            RootResolver::Static(root) => return Ok(root.clone()),
            RootResolver::Template { segments, prefix } => (segments, prefix),
        };

        let mut root = String::new();
        for segment in segments {
            match segment {
                Segment::Literal(text) => root.push_str(text),
                Segment::Host => {
                    let host = vars
                        .host
                        .ok_or_else(|| ResolveError::MissingVariable("host".to_string()))?;
                    push_checked(&mut root, "host", host)?;
                }
                Segment::ServerName => push_checked(&mut root, "server_name", vars.server_name)?,
                Segment::Header(name) => {
                    let variable = format!("http_{}", name.replace('-', "_"));
                    let value = vars
                        .headers
                        .get(name.as_str())
                        .and_then(|v| v.to_str().ok())
                        .ok_or_else(|| ResolveError::MissingVariable(variable.clone()))?;
                    push_checked(&mut root, &variable, value)?;
                }
            }
        }

        Ok(full_name(prefix, &root))
    }

    pub fn is_static(&self) -> bool {
        matches!(self, RootResolver::Static(_))
    }
}

fn parse_segments(template: &str) -> Result<Vec<Segment>, ResolveError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        literal.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];

        let (name, tail) = if let Some(braced) = rest.strip_prefix('{') {
            let end = braced.find('}').ok_or(ResolveError::Unterminated)?;
            (&braced[..end], &braced[end + 1..])
        } else {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        };

        if name.is_empty() {
            // A lone '$' is literal.
            literal.push('$');
            rest = tail;
            continue;
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::variable(name)?);
        rest = tail;
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Substituted values may not climb out of the template's directory.
fn push_checked(root: &mut String, name: &str, value: &str) -> Result<(), ResolveError> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(ResolveError::UnsafeValue {
            name: name.to_string(),
        });
    }
    root.push_str(value);
    Ok(())
}

fn full_name(prefix: &str, path: &str) -> String {
    if path.starts_with('/') || prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn vars<'a>(host: Option<&'a str>, headers: &'a HeaderMap) -> RequestVars<'a> {
        RequestVars {
            host,
            server_name: "example.com",
            headers,
        }
    }

    #[test]
    fn test_static_root() {
        let resolver = RootResolver::parse("/var/www", "/opt/denyfile").unwrap();
        assert!(resolver.is_static());

        let headers = HeaderMap::new();
        assert_eq!(resolver.resolve(&vars(None, &headers)).unwrap(), "/var/www");
    }

    #[test]
    fn test_relative_root_uses_prefix() {
        let resolver = RootResolver::parse("html", "/opt/denyfile/").unwrap();
        assert_eq!(resolver, RootResolver::Static("/opt/denyfile/html".to_string()));
    }

    #[test]
    fn test_host_template() {
        let resolver = RootResolver::parse("/srv/$host/public", "/").unwrap();
        assert!(!resolver.is_static());

        let headers = HeaderMap::new();
        assert_eq!(
            resolver.resolve(&vars(Some("a.test"), &headers)).unwrap(),
            "/srv/a.test/public"
        );
        assert_eq!(
            resolver.resolve(&vars(None, &headers)),
            Err(ResolveError::MissingVariable("host".to_string()))
        );
    }

    #[test]
    fn test_braced_and_header_variables() {
        let resolver = RootResolver::parse("sites/${server_name}_$http_x_tenant", "/srv").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-tenant", HeaderValue::from_static("blue"));
        assert_eq!(
            resolver.resolve(&vars(None, &headers)).unwrap(),
            "/srv/sites/example.com_blue"
        );

        let empty = HeaderMap::new();
        assert_eq!(
            resolver.resolve(&vars(None, &empty)),
            Err(ResolveError::MissingVariable("http_x_tenant".to_string()))
        );
    }

    #[test]
    fn test_unsafe_values_rejected() {
        let resolver = RootResolver::parse("/srv/$http_x_site", "").unwrap();
        for bad in ["..", "a/b", "."] {
            let mut headers = HeaderMap::new();
            headers.insert("x-site", HeaderValue::from_str(bad).unwrap());
            assert!(matches!(
                resolver.resolve(&vars(None, &headers)),
                Err(ResolveError::UnsafeValue { .. })
            ));
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            RootResolver::parse("/srv/$uri", ""),
            Err(ResolveError::UnknownVariable("uri".to_string()))
        );
        assert_eq!(RootResolver::parse("/srv/${host", ""), Err(ResolveError::Unterminated));
        assert!(RootResolver::parse("/srv/$http_", "").is_err());
    }

    #[test]
    fn test_lone_dollar_is_literal() {
        let resolver = RootResolver::parse("/srv/$/x", "").unwrap();
        assert_eq!(resolver, RootResolver::Static("/srv/$/x".to_string()));
    }
}
