//! Per-method routing for weft action chains.
//!
//! [`HandlerBuilder`] accumulates one action chain per HTTP method, freezes
//! them into an immutable dispatch table, and wraps the whole thing in the
//! optional cross-cutting layers (filters, the unscoped marker, access
//! logging). The frozen [`RequestHandler`] is cheap to clone and safe to
//! share across request-handling workers.
//!
//! ```rust,ignore
//! let handler = HandlerBuilder::new()
//!     .method("GET")
//!     .add(render_page)
//!     .end()?
//!     .link_method("PUT", "POST")?
//!     .log()
//!     .build()?;
//! ```

mod builder;
mod error;
mod handler;
mod log;

pub use builder::*;
pub use error::*;
pub use handler::*;
pub use log::*;
