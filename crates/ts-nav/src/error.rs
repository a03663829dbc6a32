//! Navigation error type.

use thiserror::Error;

use crate::GridCell;

/// Errors produced by `ts-nav`.
#[derive(Debug, Error)]
pub enum NavError {
    #[error("layout has no streets or buildings and no explicit bounds")]
    EmptyLayout,

    #[error("invalid cell size {0}; must be finite and positive")]
    InvalidCellSize(f32),

    #[error("no path from {from} to {to}")]
    NoPath { from: GridCell, to: GridCell },
}

pub type NavResult<T> = Result<T, NavError>;
