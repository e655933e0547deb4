use hv_agent::AgentError;
use hv_core::{AgentId, HvError, RelId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("{0} cannot partner with itself")]
    SelfPartnership(AgentId),

    #[error("{a} and {b} are already partners")]
    AlreadyPartnered { a: AgentId, b: AgentId },

    /// A sexual relationship between sex behaviors that cannot have sex.
    #[error("sexual relationship between incompatible agents {a} and {b}")]
    IncompatibleSex { a: AgentId, b: AgentId },

    #[error("relationship {0} not found")]
    RelationshipNotFound(RelId),

    /// Relationship store and partner lists disagree.
    #[error("relationship inconsistency: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Core(#[from] HvError),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
