//! Bounded request concurrency.
//!
//! Requests wait for a semaphore permit before entering the pipeline; the
//! permit is held until the response is produced.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Semaphore;

pub async fn backpressure_middleware(
    State(limit): State<Arc<Semaphore>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let _permit = match limit.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return StatusCode::SERVICE_UNAVAILABLE.into_response(),
    };

    tracing::trace!(available_permits = limit.available_permits(), "Request admitted");
    next.run(request).await
}
