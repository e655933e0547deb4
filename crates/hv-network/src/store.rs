//! `RelationshipStore` — owns every relationship.
//!
//! Relationships live in a slot vector indexed by `RelId`; terminated slots
//! go on a free list and are reused LIFO, so ids stay dense and iteration
//! order is a pure function of the create/terminate history.
//!
//! Each endpoint keeps the partner's id and the `RelId` in its own
//! non-owning lists.  [`RelationshipStore::create`] and [`RelationshipStore::terminate`]
//! are the only paths that touch those lists, so the store and the
//! population can never disagree.

use rustc_hash::FxHashMap;

use hv_agent::Population;
use hv_core::{AgentId, RelId};

use crate::{NetworkError, NetworkResult, RelKind, Relationship};

#[derive(Clone, Debug, Default)]
pub struct RelationshipStore {
    slots: Vec<Option<Relationship>>,
    free:  Vec<RelId>,
    live:  usize,
}

impl RelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Create a relationship between `a` and `b` and record it on both
    /// endpoints.  `duration` is floored at one month.
    pub fn create(
        &mut self,
        pop: &mut Population,
        a: AgentId,
        b: AgentId,
        kind: RelKind,
        duration: u32,
    ) -> NetworkResult<RelId> {
        if a == b {
            return Err(NetworkError::SelfPartnership(a));
        }
        let left = pop.agent(a)?;
        let right = pop.agent(b)?;
        if left.has_partner(b) {
            return Err(NetworkError::AlreadyPartnered { a, b });
        }
        let sex_possible = left.sex_type().sex_possible(right.sex_type());
        if kind == RelKind::Sexual && !sex_possible {
            return Err(NetworkError::IncompatibleSex { a, b });
        }

        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                let id = RelId::try_from(self.slots.len())
                    .map_err(|_| NetworkError::Inconsistent("relationship id space exhausted".into()))?;
                self.slots.push(None);
                id
            }
        };
        pop.link(a, b, id)?;
        self.slots[id.index()] = Some(Relationship::new(id, a, b, kind, sex_possible, duration.max(1)));
        self.live += 1;
        Ok(id)
    }

    /// Destroy `id`, clearing it from both endpoints first.
    pub fn terminate(&mut self, pop: &mut Population, id: RelId) -> NetworkResult<Relationship> {
        let (a, b) = self.relationship(id)?.endpoints();
        pop.unlink(a, b, id)?;
        let rel = self.slots[id.index()]
            .take()
            .ok_or(NetworkError::RelationshipNotFound(id))?;
        self.free.push(id);
        self.live -= 1;
        Ok(rel)
    }

    /// Terminate every relationship `agent` is part of.  Returns how many
    /// ended.
    pub fn terminate_all_for(&mut self, pop: &mut Population, agent: AgentId) -> NetworkResult<usize> {
        let rels = pop.agent(agent)?.relationships().to_vec();
        for id in &rels {
            self.terminate(pop, *id)?;
        }
        Ok(rels.len())
    }

    // ── Access ────────────────────────────────────────────────────────────

    #[inline]
    pub fn get(&self, id: RelId) -> Option<&Relationship> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: RelId) -> Option<&mut Relationship> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn relationship(&self, id: RelId) -> NetworkResult<&Relationship> {
        self.get(id).ok_or(NetworkError::RelationshipNotFound(id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live relationships in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> + '_ {
        self.slots.iter().flatten()
    }

    /// Ids of the live relationships, for snapshot-then-iterate phases.
    pub fn snapshot(&self) -> Vec<RelId> {
        self.iter().map(Relationship::id).collect()
    }

    /// One undirected edge per relationship, smaller id first.
    pub fn edge_list(&self) -> Vec<(AgentId, AgentId)> {
        self.iter()
            .map(|r| {
                let (a, b) = r.endpoints();
                if a <= b { (a, b) } else { (b, a) }
            })
            .collect()
    }

    // ── Consistency ───────────────────────────────────────────────────────

    /// Every relationship is listed by both endpoints, and every id an
    /// agent lists refers to a live relationship it is part of.
    pub fn check_consistency(&self, pop: &Population) -> NetworkResult<()> {
        let fail = |msg: String| Err(NetworkError::Inconsistent(msg));

        for rel in self.iter() {
            let (a, b) = rel.endpoints();
            for (me, other) in [(a, b), (b, a)] {
                let Some(agent) = pop.get(me) else {
                    return fail(format!("{} references removed agent {me}", rel.id()));
                };
                if !agent.relationships().contains(&rel.id()) || !agent.has_partner(other) {
                    return fail(format!("{me} does not list {} with {other}", rel.id()));
                }
            }
        }

        let mut listed: FxHashMap<RelId, usize> = FxHashMap::default();
        for agent in pop.iter() {
            for id in agent.relationships() {
                match self.get(*id) {
                    Some(rel) if rel.involves(agent.id()) => *listed.entry(*id).or_default() += 1,
                    _ => return fail(format!("{} lists dead or foreign {id}", agent.id())),
                }
            }
            if agent.relationships().len() != agent.partners().len() {
                return fail(format!("{}: partner and relationship lists differ in length", agent.id()));
            }
        }
        if listed.len() != self.live || listed.values().any(|n| *n != 2) {
            return fail("relationship listed by the wrong number of endpoints".into());
        }
        Ok(())
    }
}
