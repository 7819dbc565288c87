//! Ready-made actions and response helpers.

use http::StatusCode;

use crate::{Action, Entity, Flow, Request, WeftError};

/// Renders a minimal error body for terminal error responses.
///
/// The default rendering is deliberately small; anything fancier (branded
/// error pages, images, templates) belongs to the integrator and plugs in
/// through the router builder's `with_error_renderer`.
pub trait ErrorRenderer: Send + Sync {
    fn render(&self, request: &Request, status: StatusCode, message: &str) -> Entity;
}

/// The built-in single-heading error body.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinimalErrorRenderer;

impl ErrorRenderer for MinimalErrorRenderer {
    fn render(&self, _request: &Request, _status: StatusCode, message: &str) -> Entity {
        Entity::html(format!("<html><body><h1>{}</h1></body></html>", message))
    }
}

/// Set an error status and a minimal body. Always halts the chain.
pub fn send_error(req: &mut Request, status: StatusCode, message: &str) -> Flow {
    let entity = MinimalErrorRenderer.render(req, status, message);
    req.response_mut().set_status(status);
    req.response_mut().set_entity(entity);
    Flow::Halt
}

/// Set a 200 response with the given entity. Always halts the chain.
pub fn send_ok(req: &mut Request, entity: Entity) -> Flow {
    req.response_mut().set_status(StatusCode::OK);
    req.response_mut().set_entity(entity);
    Flow::Halt
}

/// Send a 302 temporary redirect to `uri`.
pub fn send_redirect(req: &mut Request, uri: &str) -> Result<Flow, WeftError> {
    send_redirect_with(req, StatusCode::FOUND, uri)
}

/// Send a redirect with an explicit status (301, 302, 303, 307, ...).
pub fn send_redirect_with(
    req: &mut Request,
    status: StatusCode,
    uri: &str,
) -> Result<Flow, WeftError> {
    req.add_header("location", uri)?;
    req.response_mut().set_status(status);
    req.response_mut().set_entity(Entity::html(format!(
        "<html><head><title>Moved</title></head><body><h1>Moved</h1>\
         <p>This page has moved to <a href=\"{}\">{}</a>.</p></body></html>",
        uri, uri
    )));
    Ok(Flow::Halt)
}

/// An action that does nothing.
pub fn nop() -> impl Action {
    |_: &mut Request| -> Result<Flow, WeftError> { Ok(Flow::Continue) }
}

/// Fails with 404 if nothing has produced output yet.
///
/// Placed at the tail of a chain of optional producers: if none of them
/// started the markup writer, the request names a resource that does not
/// exist.
pub fn not_found() -> impl Action {
    |req: &mut Request| -> Result<Flow, WeftError> {
        if req.has_markup() {
            return Ok(Flow::Continue);
        }
        let path = req.uri()?.path().to_string();
        Ok(send_error(req, StatusCode::NOT_FOUND, &path))
    }
}

/// An action that always responds with the given error.
pub fn error_action(status: StatusCode, message: impl Into<String>) -> impl Action {
    let message = message.into();
    move |req: &mut Request| -> Result<Flow, WeftError> {
        Ok(send_error(req, status, &message))
    }
}

/// An action that always responds 200 with a clone of the given entity.
pub fn ok_action(entity: Entity) -> impl Action {
    move |req: &mut Request| -> Result<Flow, WeftError> { Ok(send_ok(req, entity.clone())) }
}

/// An action that redirects to a fixed location.
pub fn redirect_action(uri: impl Into<String>) -> impl Action {
    let uri = uri.into();
    move |req: &mut Request| -> Result<Flow, WeftError> { send_redirect(req, &uri) }
}
