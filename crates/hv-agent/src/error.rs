use hv_core::{AgentId, HvError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Removing a non-member is an upstream scheduling bug.
    #[error("agent {agent} is not a member of set {set:?}")]
    NotMember { set: String, agent: AgentId },

    #[error("set {0:?} is empty")]
    EmptySet(String),

    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("population slot for {0} is already occupied")]
    SlotOccupied(AgentId),

    #[error("agent {0} still has partners and cannot be removed")]
    StillPartnered(AgentId),

    /// A flag or partner-list invariant would be (or has been) broken.
    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error(transparent)]
    Core(#[from] HvError),
}

pub type AgentResult<T> = Result<T, AgentError>;
