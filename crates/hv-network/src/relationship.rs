//! A single partnership between two distinct agents.

use hv_core::{AgentId, RelId};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum RelKind {
    /// Formed through sexual-partner matching.
    Sexual,
    /// Formed between two injectors through needle-partner matching.
    Needle,
}

#[derive(Clone, Debug)]
pub struct Relationship {
    id:           RelId,
    a:            AgentId,
    b:            AgentId,
    kind:         RelKind,
    sex_possible: bool,
    /// Remaining months.
    pub duration:    u32,
    /// Cumulative unsafe sex acts over the relationship's life.
    pub unsafe_acts: u32,
}

impl Relationship {
    pub(crate) fn new(
        id: RelId,
        a: AgentId,
        b: AgentId,
        kind: RelKind,
        sex_possible: bool,
        duration: u32,
    ) -> Self {
        Self { id, a, b, kind, sex_possible, duration, unsafe_acts: 0 }
    }

    #[inline] pub fn id(&self) -> RelId { self.id }
    #[inline] pub fn a(&self) -> AgentId { self.a }
    #[inline] pub fn b(&self) -> AgentId { self.b }
    #[inline] pub fn kind(&self) -> RelKind { self.kind }
    #[inline] pub fn sex_possible(&self) -> bool { self.sex_possible }

    #[inline]
    pub fn endpoints(&self) -> (AgentId, AgentId) {
        (self.a, self.b)
    }

    #[inline]
    pub fn involves(&self, agent: AgentId) -> bool {
        self.a == agent || self.b == agent
    }

    /// The endpoint that is not `agent`, or `None` if `agent` is not in
    /// this relationship.
    pub fn other(&self, agent: AgentId) -> Option<AgentId> {
        if agent == self.a {
            Some(self.b)
        } else if agent == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// Count down one month.  Returns `true` once the duration reaches 0.
    pub fn progress(&mut self) -> bool {
        self.duration = self.duration.saturating_sub(1);
        self.duration == 0
    }

    /// Condom-use band for the cumulative unsafe-act count:
    /// 0 → 0, 1 → 1, 2..=9 → 2, ≥ 10 → 3.
    pub fn act_band(&self) -> usize {
        match self.unsafe_acts {
            0 => 0,
            1 => 1,
            2..=9 => 2,
            _ => 3,
        }
    }
}
