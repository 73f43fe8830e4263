//! Access-phase handler for deny markers.

use axum::http::StatusCode;

use crate::access::denyfile::{check_denied, AccessError};
use crate::access::probe::{CountingProbe, ExistenceProbe, LstatProbe};
use crate::http::pipeline::{HandlerOutcome, Phase, PhaseHandler, Pipeline, RequestContext};
use crate::observability::metrics::{self, CheckOutcome};

/// Rejects requests whose directory (or an ancestor) holds the scope's marker.
#[derive(Debug, Clone, Default)]
pub struct DenyfileHandler<P = LstatProbe> {
    probe: P,
}

impl<P> DenyfileHandler<P>
where
    P: ExistenceProbe + Send + Sync,
{
    pub fn new(probe: P) -> Self {
        Self { probe }
    }
}

impl<P> PhaseHandler for DenyfileHandler<P>
where
    P: ExistenceProbe + Send + Sync,
{
    fn name(&self) -> &'static str {
        "denyfile"
    }

    fn handle(&self, ctx: &RequestContext) -> HandlerOutcome {
        let scope = &ctx.scope;
        if scope.denyfile.is_empty() {
            metrics::record_check(CheckOutcome::Disabled);
            return HandlerOutcome::Declined;
        }

        let root = match &ctx.document_root {
            Ok(root) => root,
            Err(e) => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    path = %ctx.path,
                    error = %e,
                    "Document root unresolved, skipping deny marker check"
                );
                metrics::record_check(CheckOutcome::Unresolved);
                return HandlerOutcome::Declined;
            }
        };

        let probe = CountingProbe::new(&self.probe);
        let result = check_denied(
            root,
            &ctx.path,
            &scope.denyfile,
            scope.denyfile_recursive,
            &probe,
        );
        metrics::record_probes(probe.count());

        match &result {
            Ok(true) => tracing::info!(
                request_id = %ctx.request_id,
                path = %ctx.path,
                root = %root,
                marker = %scope.denyfile,
                location = %scope.prefix,
                "Request denied by marker file"
            ),
            Ok(false) => {}
            Err(e) => tracing::error!(
                request_id = %ctx.request_id,
                path = %ctx.path,
                error = %e,
                "Deny marker check failed"
            ),
        }

        let (outcome, check) = decide(result);
        metrics::record_check(check);
        outcome
    }
}

/// Map the marker search result to the phase outcome. Errors never fail open.
fn decide(result: Result<bool, AccessError>) -> (HandlerOutcome, CheckOutcome) {
    match result {
        Ok(true) => (
            HandlerOutcome::Finalize(StatusCode::FORBIDDEN),
            CheckOutcome::Denied,
        ),
        Ok(false) => (HandlerOutcome::Declined, CheckOutcome::Declined),
        Err(_) => (
            HandlerOutcome::Finalize(StatusCode::INTERNAL_SERVER_ERROR),
            CheckOutcome::Error,
        ),
    }
}

/// Install the deny-marker check in the access phase.
pub fn register(pipeline: &mut Pipeline) {
    pipeline.register(Phase::Access, DenyfileHandler::new(LstatProbe));
}
