//! Core error type.
//!
//! Sub-crates define their own error enums and either convert into
//! `TsError` or wrap it as one variant, whichever keeps call sites clean.

use thiserror::Error;

use crate::{AgentId, IntersectionId};

/// The top-level error type for `ts-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum TsError {
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("intersection {0} not found")]
    IntersectionNotFound(IntersectionId),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for `ts-core`.
pub type TsResult<T> = Result<T, TsError>;
