//! Composable HTTP request handling with streaming markup output.
//!
//! A request handler is composed out of small, chainable units called
//! actions. Each action does one piece of work against the request - set
//! an attribute, write some markup, terminate with a response - and the
//! chain short-circuits as soon as a step produces a terminal response.
//! Chains are registered per HTTP method on a builder and frozen into an
//! immutable dispatch table.
//!
//! ```rust,ignore
//! use weft::prelude::*;
//!
//! let page = |req: &mut Request| -> Result<Flow, WeftError> {
//!     let m = req.markup();
//!     m.h1().write("Departures").end()?;
//!     m.p().write("All services on time.").end()?;
//!     Ok(Flow::Continue)
//! };
//!
//! let handler = HandlerBuilder::new()
//!     .method("GET")
//!     .add(page)
//!     .end()?
//!     .log()
//!     .build()?;
//!
//! // One call per inbound request, driven by the transport:
//! let mut req = Request::new(RequestHead::new(http::Method::GET, "/departures"));
//! handler.handle(&mut req)?;
//! ```

pub mod prelude;

pub use weft_core::*;
pub use weft_router::*;
