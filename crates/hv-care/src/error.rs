use hv_agent::AgentError;
use hv_core::HvError;
use hv_network::NetworkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CareError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Core(#[from] HvError),
}

pub type CareResult<T> = Result<T, CareError>;
