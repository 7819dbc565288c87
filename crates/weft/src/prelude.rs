//! Prelude for convenient imports.
//!
//! ```rust,ignore
//! use weft::prelude::*;
//! ```

pub use weft_core::{
    attribute_present, attribute_true, error_action, nop, not_found, ok_action, redirect_action,
    send_error, send_ok, send_redirect, Action, ActionExt, AttributeStore, Entity, ErrorRenderer,
    Flow, MarkupWriter, Request, RequestHead, RequestPredicate, RequestPredicateExt,
    ResponseHandle, Value, WeftError,
};

pub use weft_router::{BuildError, HandlerBuilder, LogAction, RequestHandler, UNSCOPED_ATTR};
