//! The frozen request handler and its dispatch action.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use weft_core::{Action, Flow, Request, WeftError};

/// Method lookup over the frozen table.
///
/// The incoming method name is canonicalized to uppercase before lookup;
/// unmapped methods fall through to the default action (405).
pub(crate) struct Dispatch {
    table: HashMap<String, Arc<dyn Action>>,
    fallback: Arc<dyn Action>,
}

impl Dispatch {
    pub(crate) fn new(table: HashMap<String, Arc<dyn Action>>, fallback: Arc<dyn Action>) -> Self {
        Self { table, fallback }
    }
}

impl Action for Dispatch {
    fn apply(&self, req: &mut Request) -> Result<Flow, WeftError> {
        let method = req.method().as_str().to_ascii_uppercase();
        match self.table.get(&method) {
            Some(chain) => chain.apply(req),
            None => self.fallback.apply(req),
        }
    }
}

/// A frozen, shareable request handler.
///
/// Produced by `HandlerBuilder::build()`. Nothing inside is mutated after
/// the build phase, so concurrent `handle` calls from arbitrarily many
/// workers need no locking.
#[derive(Clone)]
pub struct RequestHandler {
    root: Arc<dyn Action>,
    methods: Vec<String>,
}

impl RequestHandler {
    pub(crate) fn new(root: Arc<dyn Action>, methods: Vec<String>) -> Self {
        Self { root, methods }
    }

    /// Run the composed dispatch for one request.
    ///
    /// Whether the chain succeeds or fails, a markup writer that was
    /// started gets drained into the final response entity before this
    /// returns; the transport then reads status, headers and entity off
    /// the request's response handle.
    pub fn handle(&self, req: &mut Request) -> Result<(), WeftError> {
        let outcome = self.root.apply(req).map(|_| ());
        if req.has_markup() {
            let entity = req.markup().entity();
            req.response_mut().set_entity(entity);
        }
        outcome
    }

    /// The method names with a registered chain, sorted, including the
    /// synthesized `HEAD` entry when present.
    pub fn methods(&self) -> &[String] {
        &self.methods
    }
}

impl fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandler")
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}
