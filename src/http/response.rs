//! Content phase: static files under the document root.
//!
//! # Responsibilities
//! - Map the (already checked) request path onto the document root
//! - Serve the scope's index file for directory requests
//! - Redirect directory paths missing their trailing slash
//!
//! # Design Decisions
//! - Streaming via tower-http `ServeFile`, no buffering of file bodies
//! - Missing files are 404, as answered by `ServeFile`

use axum::{
    body::Body,
    extract::Extension,
    http::{Request, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// Where the content phase reads from, filled in by the access phase.
#[derive(Debug, Clone)]
pub struct ContentTarget {
    /// None when the document root could not be resolved.
    pub root: Option<String>,
    pub index: String,
}

pub async fn serve_content(
    Extension(target): Extension<ContentTarget>,
    request: Request<Body>,
) -> Response {
    let Some(root) = target.root else {
        tracing::warn!(path = %request.uri().path(), "No document root for request");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let path = request.uri().path().to_string();
    let mut file = format!("{}{}", root, path);

    if path.ends_with('/') {
        file.push_str(&target.index);
    } else if tokio::fs::metadata(&file).await.is_ok_and(|m| m.is_dir()) {
        let location = match request.uri().query() {
            Some(query) => format!("{}/?{}", path, query),
            None => format!("{}/", path),
        };
        return Redirect::permanent(&location).into_response();
    }

    match ServeFile::new(&file).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}
