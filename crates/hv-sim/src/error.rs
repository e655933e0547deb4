use hv_agent::AgentError;
use hv_care::CareError;
use hv_core::HvError;
use hv_epi::EpiError;
use hv_network::NetworkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    /// A post-step consistency check failed.
    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error(transparent)]
    Core(#[from] HvError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Epi(#[from] EpiError),

    #[error(transparent)]
    Care(#[from] CareError),
}

pub type SimResult<T> = Result<T, SimError>;
