//! Request processing phases.
//!
//! Handlers are registered against a [`Phase`] while the server is being
//! assembled; the resulting [`Pipeline`] is frozen behind an `Arc` and run
//! for every request before the content phase.

use std::sync::Arc;

use axum::http::StatusCode;

use crate::access::resolver::ResolveError;
use crate::config::merge::ResolvedScope;

/// Pre-content phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Request line sanity checks.
    PostRead,
    /// Allow/deny decisions.
    Access,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::PostRead, Phase::Access];

    fn index(self) -> usize {
        match self {
            Phase::PostRead => 0,
            Phase::Access => 1,
        }
    }
}

/// Result of a single phase handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// No opinion; later handlers and the content phase proceed.
    Declined,
    /// Stop processing and answer with this status.
    Finalize(StatusCode),
}

/// Everything a phase handler may read about the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    /// Raw URI path, no query string.
    pub path: String,
    pub scope: Arc<ResolvedScope>,
    pub document_root: Result<String, ResolveError>,
}

/// A synchronous handler attached to one phase.
///
/// Handlers may block on filesystem calls; the caller decides whether they
/// run on the async executor or a blocking worker.
pub trait PhaseHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle(&self, ctx: &RequestContext) -> HandlerOutcome;
}

/// Ordered handler table.
#[derive(Default)]
pub struct Pipeline {
    phases: [Vec<Box<dyn PhaseHandler>>; 2],
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to `phase`. Registration order is execution order.
    pub fn register<H>(&mut self, phase: Phase, handler: H)
    where
        H: PhaseHandler + 'static,
    {
        tracing::debug!(phase = ?phase, handler = handler.name(), "Registered phase handler");
        self.phases[phase.index()].push(Box::new(handler));
    }

    pub fn handlers(&self, phase: Phase) -> impl Iterator<Item = &dyn PhaseHandler> {
        self.phases[phase.index()].iter().map(|h| h.as_ref())
    }

    /// Run every phase; the first non-declining handler wins.
    pub fn run(&self, ctx: &RequestContext) -> HandlerOutcome {
        for phase in Phase::ALL {
            for handler in self.handlers(phase) {
                if let HandlerOutcome::Finalize(status) = handler.handle(ctx) {
                    tracing::debug!(
                        request_id = %ctx.request_id,
                        phase = ?phase,
                        handler = handler.name(),
                        status = %status,
                        "Request finalized before content phase"
                    );
                    return HandlerOutcome::Finalize(status);
                }
            }
        }
        HandlerOutcome::Declined
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::access::resolver::RootResolver;

    pub(crate) fn context(path: &str, scope: ResolvedScope) -> RequestContext {
        let document_root = match &scope.root {
            RootResolver::Static(root) => Ok(root.clone()),
            RootResolver::Template { .. } => Err(ResolveError::MissingVariable("host".into())),
        };
        RequestContext {
            request_id: "test".to_string(),
            path: path.to_string(),
            scope: Arc::new(scope),
            document_root,
        }
    }

    struct Fixed {
        outcome: HandlerOutcome,
        calls: Arc<AtomicUsize>,
    }

    impl PhaseHandler for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn handle(&self, _ctx: &RequestContext) -> HandlerOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
        }
    }

    #[test]
    fn test_empty_pipeline_declines() {
        let ctx = context("/", ResolvedScope::default());
        assert_eq!(Pipeline::new().run(&ctx), HandlerOutcome::Declined);
    }

    #[test]
    fn test_first_finalize_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new();
        // Registered out of phase order on purpose.
        pipeline.register(
            Phase::Access,
            Fixed { outcome: HandlerOutcome::Finalize(StatusCode::FORBIDDEN), calls: calls.clone() },
        );
        pipeline.register(
            Phase::PostRead,
            Fixed { outcome: HandlerOutcome::Declined, calls: calls.clone() },
        );
        pipeline.register(
            Phase::Access,
            Fixed { outcome: HandlerOutcome::Finalize(StatusCode::IM_A_TEAPOT), calls: calls.clone() },
        );

        let ctx = context("/a", ResolvedScope::default());
        assert_eq!(pipeline.run(&ctx), HandlerOutcome::Finalize(StatusCode::FORBIDDEN));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_post_read_runs_before_access() {
        let access_calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new();
        pipeline.register(
            Phase::Access,
            Fixed { outcome: HandlerOutcome::Finalize(StatusCode::FORBIDDEN), calls: access_calls.clone() },
        );
        pipeline.register(
            Phase::PostRead,
            Fixed {
                outcome: HandlerOutcome::Finalize(StatusCode::BAD_REQUEST),
                calls: Arc::new(AtomicUsize::new(0)),
            },
        );

        let ctx = context("/a", ResolvedScope::default());
        assert_eq!(pipeline.run(&ctx), HandlerOutcome::Finalize(StatusCode::BAD_REQUEST));
        assert_eq!(access_calls.load(Ordering::SeqCst), 0);
    }
}
