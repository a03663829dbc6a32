use thiserror::Error;
use ts_core::TsError;
use ts_nav::NavError;
use ts_traffic::TrafficError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] TsError),

    #[error("navigation grid: {0}")]
    Nav(#[from] NavError),

    #[error("traffic: {0}")]
    Traffic(#[from] TrafficError),
}

pub type SimResult<T> = Result<T, SimError>;
