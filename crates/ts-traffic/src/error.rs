//! Traffic error type.
//!
//! Nothing here escapes a frame update: the manager recovers from every
//! variant locally and logs it.  The type exists so agent-level code can
//! report a problem with `?` instead of panicking.

use thiserror::Error;

use ts_core::AgentId;

#[derive(Debug, Error)]
pub enum TrafficError {
    #[error("agent {0} reached a non-finite state")]
    AgentFault(AgentId),

    #[error("agent {0} is not managed by this traffic manager")]
    UnknownAgent(AgentId),

    #[error("no street positions to spawn on")]
    NoSpawnPositions,
}

pub type TrafficResult<T> = Result<T, TrafficError>;
