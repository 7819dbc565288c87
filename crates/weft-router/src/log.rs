//! Access-log decorator.

use weft_core::{Action, Flow, Request, WeftError};

/// Logs one request at the outermost layer of the composed dispatch.
///
/// Emits a debug event on entry (method, URI), an info event on completion
/// (status, entity length) and an error event on failure. Errors are
/// re-raised unmodified after logging.
pub struct LogAction<A> {
    inner: A,
}

impl<A: Action> LogAction<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

/// Entity length for logging: -1 when no entity is attached yet.
fn entity_len(req: &Request) -> i64 {
    req.response()
        .entity()
        .map(|e| e.len() as i64)
        .unwrap_or(-1)
}

fn status_code(req: &Request) -> i64 {
    req.response()
        .status()
        .map(|s| s.as_u16() as i64)
        .unwrap_or(-1)
}

impl<A: Action> Action for LogAction<A> {
    fn apply(&self, req: &mut Request) -> Result<Flow, WeftError> {
        let method = req.method().clone();
        let uri = req.raw_uri().to_string();
        tracing::debug!(
            target: "weft::access",
            method = %method,
            uri = %uri,
            "dispatching"
        );

        match self.inner.apply(req) {
            Ok(flow) => {
                tracing::info!(
                    target: "weft::access",
                    method = %method,
                    uri = %uri,
                    status = status_code(req),
                    length = entity_len(req),
                    "complete"
                );
                Ok(flow)
            }
            Err(err) => {
                tracing::error!(
                    target: "weft::access",
                    method = %method,
                    uri = %uri,
                    status = status_code(req),
                    length = entity_len(req),
                    error = %err,
                    "failed"
                );
                Err(err)
            }
        }
    }
}
