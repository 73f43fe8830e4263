//! Request identification and post-read checks.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) as early as possible
//! - Reject request paths the filesystem phases must never see
//!
//! # Design Decisions
//! - Paths are not percent-decoded: the access check and the content phase
//!   see the same raw path, so a file is only ever served under the name it
//!   was checked under
//! - `..` segments are refused outright rather than resolved

use axum::http::{HeaderValue, Request, StatusCode};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::pipeline::{HandlerOutcome, PhaseHandler, RequestContext};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Assigns a random UUID to requests that arrive without `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID assigned by the request-id layer, or `"unknown"`.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.header_value())
        .or_else(|| request.headers().get(X_REQUEST_ID))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// True when `path` is absolute and cannot climb above the document root.
pub fn is_safe_path(path: &str) -> bool {
    path.starts_with('/') && !path.contains('\0') && !path.split('/').any(|segment| segment == "..")
}

/// Post-read handler answering 400 for unsafe paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathGuard;

impl PhaseHandler for PathGuard {
    fn name(&self) -> &'static str {
        "path_guard"
    }

    fn handle(&self, ctx: &RequestContext) -> HandlerOutcome {
        if is_safe_path(&ctx.path) {
            HandlerOutcome::Declined
        } else {
            tracing::warn!(request_id = %ctx.request_id, path = %ctx.path, "Rejected unsafe request path");
            HandlerOutcome::Finalize(StatusCode::BAD_REQUEST)
        }
    }
}
