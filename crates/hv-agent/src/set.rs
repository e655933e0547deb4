//! `AgentSet` — a named, insertion-ordered, counted set with keyed subsets.
//!
//! # Layout
//!
//! Members live in a slot `Vec<Option<AgentId>>` in insertion order.  A
//! reverse index (`FxHashMap<AgentId, slot>`) gives O(1) membership and
//! removal; removal leaves a tombstone, and the slots are compacted once
//! tombstones outnumber live members.  Keeping the slot vector at least half
//! full makes [`AgentSet::random_agent`] O(1) expected by rejection.
//!
//! # Subsets
//!
//! A subset carries a [`SetKey`] discriminator.  [`AgentSet::add`] cascades
//! the agent into every direct subset whose key matches it (and from there
//! recursively); [`AgentSet::remove`] cascades into every subset that holds
//! the agent.

use rustc_hash::FxHashMap;

use hv_core::{AgentId, DrugType, Race, SexType, SimRng};

use crate::{Agent, AgentError, AgentResult};

/// Slack below which compaction never runs (avoids churn on tiny sets).
const COMPACT_SLACK: usize = 16;

// ── SetKey ────────────────────────────────────────────────────────────────────

/// Attribute discriminator deciding which agents cascade into a subset.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum SetKey {
    Sex(SexType),
    Drug(DrugType),
    Race(Race),
}

impl SetKey {
    #[inline]
    pub fn matches(self, agent: &Agent) -> bool {
        match self {
            SetKey::Sex(s)  => agent.sex_type() == s,
            SetKey::Drug(d) => agent.drug_type() == d,
            SetKey::Race(r) => agent.race() == r,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            SetKey::Sex(s)  => s.tag(),
            SetKey::Drug(d) => d.tag(),
            SetKey::Race(r) => r.tag(),
        }
    }
}

// ── AgentSet ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct AgentSet {
    name:    String,
    key:     Option<SetKey>,
    slots:   Vec<Option<AgentId>>,
    index:   FxHashMap<AgentId, usize>,
    subsets: Vec<AgentSet>,
}

impl AgentSet {
    /// An empty set with no subsets.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name:    name.into(),
            key:     None,
            slots:   Vec::new(),
            index:   FxHashMap::default(),
            subsets: Vec::new(),
        }
    }

    /// An empty subset that accepts agents matching `key`.
    pub fn keyed(key: SetKey) -> Self {
        Self { key: Some(key), ..Self::new(key.tag()) }
    }

    /// An empty set with one keyed subset per sex behavior, drug use, and
    /// race.  Every population-level set uses this layout so stratified
    /// counts are O(1).
    pub fn stratified(name: impl Into<String>) -> Self {
        let mut set = Self::new(name);
        for s in SexType::ALL {
            set.subsets.push(Self::keyed(SetKey::Sex(s)));
        }
        for d in DrugType::ALL {
            set.subsets.push(Self::keyed(SetKey::Drug(d)));
        }
        for r in Race::ALL {
            set.subsets.push(Self::keyed(SetKey::Race(r)));
        }
        set
    }

    /// Attach a subset.  Existing members matching its key are *not*
    /// back-filled; attach subsets before adding agents.
    pub fn with_subset(mut self, subset: AgentSet) -> Self {
        self.subsets.push(subset);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Add `agent`, cascading into matching subsets.  Returns `false` (and
    /// does nothing) if it is already a member.
    pub fn add(&mut self, agent: &Agent) -> bool {
        let id = agent.id();
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id, self.slots.len());
        self.slots.push(Some(id));
        for subset in &mut self.subsets {
            if subset.key.is_some_and(|k| k.matches(agent)) {
                subset.add(agent);
            }
        }
        true
    }

    /// Remove `id`, cascading into every subset that holds it.
    ///
    /// # Errors
    /// [`AgentError::NotMember`] if `id` is not in this set.
    pub fn remove(&mut self, id: AgentId) -> AgentResult<()> {
        if self.discard(id) {
            Ok(())
        } else {
            Err(AgentError::NotMember { set: self.name.clone(), agent: id })
        }
    }

    /// Remove `id` if present; returns whether it was a member.
    pub fn discard(&mut self, id: AgentId) -> bool {
        let Some(slot) = self.index.remove(&id) else {
            return false;
        };
        self.slots[slot] = None;
        for subset in &mut self.subsets {
            subset.discard(id);
        }
        if self.slots.len() > 2 * self.index.len() + COMPACT_SLACK {
            self.compact();
        }
        true
    }

    /// Remove every member (subsets included).
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        for subset in &mut self.subsets {
            subset.clear();
        }
    }

    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        for (slot, id) in self.slots.iter().enumerate() {
            if let Some(id) = id {
                self.index.insert(*id, slot);
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn contains(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// Owned copy of the members, for snapshot-then-iterate phases.
    pub fn snapshot(&self) -> Vec<AgentId> {
        self.iter().collect()
    }

    /// Uniform random member, `None` when empty.
    pub fn random_agent(&self, rng: &mut SimRng) -> Option<AgentId> {
        if self.is_empty() {
            return None;
        }
        loop {
            let slot = rng.gen_range(0..self.slots.len());
            if let Some(id) = self.slots[slot] {
                return Some(id);
            }
        }
    }

    /// Uniform random member.
    ///
    /// # Errors
    /// [`AgentError::EmptySet`] when the set has no members.
    pub fn pick(&self, rng: &mut SimRng) -> AgentResult<AgentId> {
        self.random_agent(rng)
            .ok_or_else(|| AgentError::EmptySet(self.name.clone()))
    }

    /// Up to `depth` random members.
    ///
    /// When the set holds no more than `depth` agents every member is
    /// returned in random order; otherwise `depth` independent uniform draws
    /// are made, so cost is O(depth) regardless of set size.
    pub fn sample(&self, rng: &mut SimRng, depth: usize) -> Vec<AgentId> {
        if self.len() <= depth {
            let mut all = self.snapshot();
            rng.shuffle(&mut all);
            return all;
        }
        (0..depth).filter_map(|_| self.random_agent(rng)).collect()
    }

    /// Direct subset by name.
    pub fn subset(&self, name: &str) -> Option<&AgentSet> {
        self.subsets.iter().find(|s| s.name == name)
    }

    /// Direct subset by discriminator.
    pub fn subset_by_key(&self, key: SetKey) -> Option<&AgentSet> {
        self.subsets.iter().find(|s| s.key == Some(key))
    }

    /// Member count of the subset keyed by `key` (0 if absent).
    pub fn count_by(&self, key: SetKey) -> usize {
        self.subset_by_key(key).map_or(0, AgentSet::len)
    }

    pub fn subsets(&self) -> &[AgentSet] {
        &self.subsets
    }
}
