//! Builder for per-method action chains.

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use weft_core::{
    error_action, Action, ActionExt, ErrorRenderer, Flow, MinimalErrorRenderer, Request,
    RequestPredicate, RequestPredicateExt, Value, WeftError,
};

use crate::handler::Dispatch;
use crate::{BuildError, LogAction, RequestHandler};

/// Attribute set before dispatch when the handler opted out of request
/// scoping. Scope-aware collaborators check for it to skip activation,
/// which saves per-request bookkeeping for static content.
pub const UNSCOPED_ATTR: &str = "request.unscoped";

/// Accumulates method chains, aliases and cross-cutting configuration,
/// then freezes everything into a [`RequestHandler`].
pub struct HandlerBuilder {
    actions: HashMap<String, Arc<dyn Action>>,
    links: HashMap<String, String>,
    request_predicate: Option<Box<dyn RequestPredicate>>,
    predicate: Option<Box<dyn Fn(&Request) -> bool + Send + Sync>>,
    renderer: Arc<dyn ErrorRenderer>,
    unscoped: bool,
    log: bool,
}

impl std::fmt::Debug for HandlerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBuilder")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("links", &self.links)
            .field("request_predicate", &self.request_predicate.is_some())
            .field("predicate", &self.predicate.is_some())
            .field("unscoped", &self.unscoped)
            .field("log", &self.log)
            .finish()
    }
}

impl Default for HandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerBuilder {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            links: HashMap::new(),
            request_predicate: None,
            predicate: None,
            renderer: Arc::new(MinimalErrorRenderer),
            unscoped: false,
            log: false,
        }
    }

    /// Start (or extend) the chain for one HTTP method.
    pub fn method(self, name: impl Into<String>) -> ChainBuilder {
        ChainBuilder {
            parent: self,
            method: name.into(),
            action: None,
            request_predicate: None,
            predicate: None,
        }
    }

    /// Resolve `alias` to the same chain as `target` at build time.
    ///
    /// Linking the same alias twice is accepted when the target matches
    /// and rejected otherwise; whether the target exists is checked in
    /// [`HandlerBuilder::build`].
    pub fn link_method(mut self, alias: &str, target: &str) -> Result<Self, BuildError> {
        let alias = alias.to_ascii_uppercase();
        let target = target.to_ascii_uppercase();
        if let Some(existing) = self.links.get(&alias) {
            if *existing != target {
                return Err(BuildError::AlreadyLinked {
                    alias,
                    target,
                    existing: existing.clone(),
                });
            }
            return Ok(self);
        }
        self.links.insert(alias, target);
        Ok(self)
    }

    /// Gate every request, regardless of method, on a pure predicate.
    ///
    /// Applied before any per-method filter; a false result skips dispatch
    /// entirely and leaves the response open.
    pub fn filter(mut self, predicate: impl Fn(&Request) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(match self.predicate.take() {
            None => Box::new(predicate),
            Some(prev) => Box::new(move |r: &Request| prev(r) && predicate(r)),
        });
        self
    }

    /// Gate every request on a fallible predicate.
    pub fn filter_request(mut self, predicate: impl RequestPredicate + 'static) -> Self {
        self.request_predicate = Some(match self.request_predicate.take() {
            None => Box::new(predicate),
            Some(prev) => Box::new(prev.and(predicate)),
        });
        self
    }

    /// Opt this handler out of request scoping: the [`UNSCOPED_ATTR`]
    /// attribute is set before dispatch runs.
    pub fn unscoped(mut self) -> Self {
        self.unscoped = true;
        self
    }

    /// Wrap the resolved dispatch in the outermost access-log decorator.
    pub fn log(mut self) -> Self {
        self.log = true;
        self
    }

    /// Replace the error-body renderer used by the 405 default action.
    pub fn with_error_renderer(mut self, renderer: impl ErrorRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Validate links, synthesize HEAD from GET, and freeze the table.
    pub fn build(mut self) -> Result<RequestHandler, BuildError> {
        let links = std::mem::take(&mut self.links);
        for (alias, target) in links {
            if self.actions.contains_key(&alias) {
                return Err(BuildError::LinkShadowsAction { alias, target });
            }
            match self.actions.get(&target) {
                Some(action) => {
                    let action = action.clone();
                    self.actions.insert(alias, action);
                }
                None => return Err(BuildError::LinkTargetMissing { alias, target }),
            }
        }

        // HEAD mirrors GET when only GET is registered. The chain is
        // copied verbatim; body elision for HEAD is the transport's
        // concern, it owns wire serialization.
        if let Some(get) = self.actions.get("GET").cloned() {
            self.actions.entry("HEAD".to_string()).or_insert(get);
        }

        let mut methods: Vec<String> = self.actions.keys().cloned().collect();
        methods.sort();

        let renderer = self.renderer;
        let fallback: Arc<dyn Action> =
            Arc::new(move |req: &mut Request| -> Result<Flow, WeftError> {
                let entity =
                    renderer.render(req, StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
                req.response_mut().set_status(StatusCode::METHOD_NOT_ALLOWED);
                req.response_mut().set_entity(entity);
                Ok(Flow::Halt)
            });

        let mut root: Box<dyn Action> = Box::new(Dispatch::new(self.actions, fallback));
        if let Some(rp) = self.request_predicate {
            root = Box::new(root.filter_request(rp));
        }
        if let Some(p) = self.predicate {
            root = Box::new(root.filter(p));
        }
        if self.unscoped {
            let marker = |req: &mut Request| -> Result<Flow, WeftError> {
                req.set_attr(UNSCOPED_ATTR, true);
                Ok(Flow::Continue)
            };
            root = Box::new(root.compose(marker));
        }
        if self.log {
            root = Box::new(LogAction::new(root));
        }

        Ok(RequestHandler::new(Arc::from(root), methods))
    }
}

/// Accumulates the action chain for a single method.
///
/// Obtained from [`HandlerBuilder::method`]; [`ChainBuilder::end`] commits
/// the chain back into the builder, appending to any chain the method
/// already has.
pub struct ChainBuilder {
    parent: HandlerBuilder,
    method: String,
    action: Option<Box<dyn Action>>,
    request_predicate: Option<Box<dyn RequestPredicate>>,
    predicate: Option<Box<dyn Fn(&Request) -> bool + Send + Sync>>,
}

impl ChainBuilder {
    /// Append an action to this method's chain.
    pub fn add(mut self, action: impl Action + 'static) -> Self {
        self.action = Some(match self.action.take() {
            None => Box::new(action),
            Some(prev) => Box::new(prev.and_then(action)),
        });
        self
    }

    /// Gate this method's whole chain on a pure predicate. Runs after any
    /// handler-level filter.
    pub fn filter(mut self, predicate: impl Fn(&Request) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(match self.predicate.take() {
            None => Box::new(predicate),
            Some(prev) => Box::new(move |r: &Request| prev(r) && predicate(r)),
        });
        self
    }

    /// Gate this method's whole chain on a fallible predicate.
    pub fn filter_request(mut self, predicate: impl RequestPredicate + 'static) -> Self {
        self.request_predicate = Some(match self.request_predicate.take() {
            None => Box::new(predicate),
            Some(prev) => Box::new(prev.and(predicate)),
        });
        self
    }

    /// Append an action that sets a fixed attribute.
    pub fn set_attr(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        self.add(move |req: &mut Request| -> Result<Flow, WeftError> {
            req.set_attr(name.clone(), value.clone());
            Ok(Flow::Continue)
        })
    }

    /// Append an action that copies a query parameter into an attribute.
    /// A missing parameter leaves the attribute unset.
    pub fn set_attr_from_param(self, attr: impl Into<String>, param: impl Into<String>) -> Self {
        let attr = attr.into();
        let param = param.into();
        self.add(move |req: &mut Request| -> Result<Flow, WeftError> {
            let value = req.param(&param)?.map(str::to_string);
            req.set_attr_opt(attr.clone(), value);
            Ok(Flow::Continue)
        })
    }

    /// Append an action gated on an attribute being present.
    pub fn if_attribute_present(
        self,
        name: impl Into<String>,
        action: impl Action + 'static,
    ) -> Self {
        let name = name.into();
        self.add(action.filter(move |r: &Request| r.attr_present(&name)))
    }

    /// Append an action gated on an attribute being absent.
    pub fn if_attribute_absent(
        self,
        name: impl Into<String>,
        action: impl Action + 'static,
    ) -> Self {
        let name = name.into();
        self.add(action.filter(move |r: &Request| !r.attr_present(&name)))
    }

    /// Append an action gated on a fallible predicate.
    pub fn if_true(
        self,
        predicate: impl RequestPredicate + 'static,
        action: impl Action + 'static,
    ) -> Self {
        self.add(action.filter_request(predicate))
    }

    /// Append an action gated on a fallible predicate failing.
    pub fn if_false(
        self,
        predicate: impl RequestPredicate + 'static,
        action: impl Action + 'static,
    ) -> Self {
        self.add(action.filter_request(predicate.negate()))
    }

    /// Terminate the chain with a fixed error response.
    pub fn send_error(
        self,
        status: StatusCode,
        message: impl Into<String> + 'static,
    ) -> Result<HandlerBuilder, BuildError> {
        self.add(error_action(status, message)).end()
    }

    /// Commit this chain into the dispatch table.
    ///
    /// Fails if no action was added. If the method already has a chain,
    /// the new one is appended with the `and_then` law rather than
    /// replacing it.
    pub fn end(mut self) -> Result<HandlerBuilder, BuildError> {
        let Some(chain) = self.action.take() else {
            return Err(BuildError::EmptyChain {
                method: self.method,
            });
        };

        let mut chain: Box<dyn Action> = chain;
        if let Some(rp) = self.request_predicate.take() {
            chain = Box::new(chain.filter_request(rp));
        }
        if let Some(p) = self.predicate.take() {
            chain = Box::new(chain.filter(p));
        }

        let key = self.method.to_ascii_uppercase();
        let chain: Arc<dyn Action> = Arc::from(chain);
        let merged = match self.parent.actions.remove(&key) {
            None => chain,
            Some(existing) => Arc::new(existing.and_then(chain)) as Arc<dyn Action>,
        };
        self.parent.actions.insert(key, merged);
        Ok(self.parent)
    }
}
