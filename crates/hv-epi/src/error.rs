use hv_agent::AgentError;
use hv_core::{AgentId, HvError, RelId};
use hv_network::NetworkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EpiError {
    /// An interaction was scheduled on a pair that is not serodiscordant.
    #[error("relationship {0} is not serodiscordant")]
    NoDiscordance(RelId),

    /// Transmission reached an agent that is already HIV+.
    #[error("{0} infected twice")]
    DoubleInfection(AgentId),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Core(#[from] HvError),
}

pub type EpiResult<T> = Result<T, EpiError>;
