//! Access phase middleware.
//!
//! Builds the [`RequestContext`] from the current configuration snapshot,
//! runs the registered pre-content handlers, and either answers directly or
//! hands the request to the content phase.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::access::resolver::RequestVars;
use crate::http::pipeline::{HandlerOutcome, RequestContext};
use crate::http::request::request_id;
use crate::http::response::ContentTarget;
use crate::http::server::AppState;
use crate::routing::matcher::request_host;
use crate::routing::LocationRouter;

pub async fn access_phase_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let snapshot = state.snapshot.load_full();
    let ctx = build_context(&request, &snapshot.router);

    let (ctx, outcome) = if snapshot.offload_probes {
        let pipeline = state.pipeline.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let outcome = pipeline.run(&ctx);
            (ctx, outcome)
        });
        match handle.await {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(error = %e, "Access phase worker failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    } else {
        let outcome = state.pipeline.run(&ctx);
        (ctx, outcome)
    };

    match outcome {
        HandlerOutcome::Finalize(status) => status.into_response(),
        HandlerOutcome::Declined => {
            request.extensions_mut().insert(ContentTarget {
                root: ctx.document_root.ok(),
                index: ctx.scope.index.clone(),
            });
            next.run(request).await
        }
    }
}

fn build_context(request: &Request<Body>, router: &LocationRouter) -> RequestContext {
    let host = request_host(
        request.uri().host(),
        request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok()),
    );
    let path = request.uri().path().to_string();
    let scope = router.lookup(host.as_deref(), &path);

    let document_root = scope.root.resolve(&RequestVars {
        host: host.as_deref(),
        server_name: &scope.server_name,
        headers: request.headers(),
    });

    RequestContext {
        request_id: request_id(request),
        path,
        scope,
        document_root,
    }
}
