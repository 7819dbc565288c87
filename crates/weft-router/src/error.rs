//! Build-phase configuration errors.

use thiserror::Error;

/// Errors raised while assembling a dispatch table.
///
/// These fail fast during the builder phase, before any request is served;
/// they are fatal to startup and never surface per-request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// `end()` was called on a chain with no actions added.
    #[error("no action defined for {method}")]
    EmptyChain { method: String },

    /// The alias was already linked to a different target.
    #[error("cannot link {alias} to {target}: already linked to {existing}")]
    AlreadyLinked {
        alias: String,
        target: String,
        existing: String,
    },

    /// The alias has its own registered chain.
    #[error("cannot link {alias} to {target}: {alias} has an action defined")]
    LinkShadowsAction { alias: String, target: String },

    /// The link target has no registered chain.
    #[error("cannot link {alias} to {target}: target has not been defined")]
    LinkTargetMissing { alias: String, target: String },
}
