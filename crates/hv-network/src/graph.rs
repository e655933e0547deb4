//! Derived adjacency views over the partner lists.
//!
//! Nothing here is cached: the population's partner lists are the graph, and
//! these views are recomputed on demand.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use hv_agent::Population;
use hv_core::AgentId;

/// Connected components of the partnership graph.  Every live agent belongs
/// to exactly one component; unpartnered agents are singletons.
#[derive(Clone, Debug, Default)]
pub struct Components {
    groups: Vec<Vec<AgentId>>,
    label:  FxHashMap<AgentId, usize>,
}

impl Components {
    /// Breadth-first labelling in slot order.  Members of each group are
    /// sorted by id.
    pub fn of(pop: &Population) -> Self {
        let mut groups: Vec<Vec<AgentId>> = Vec::new();
        let mut label: FxHashMap<AgentId, usize> = FxHashMap::default();
        let mut queue: VecDeque<AgentId> = VecDeque::new();

        for start in pop.iter() {
            if label.contains_key(&start.id()) {
                continue;
            }
            let c = groups.len();
            let mut members = Vec::new();
            label.insert(start.id(), c);
            queue.push_back(start.id());
            while let Some(id) = queue.pop_front() {
                members.push(id);
                let Some(agent) = pop.get(id) else { continue };
                for &p in agent.partners() {
                    if !label.contains_key(&p) {
                        label.insert(p, c);
                        queue.push_back(p);
                    }
                }
            }
            members.sort_unstable();
            groups.push(members);
        }
        Self { groups, label }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[Vec<AgentId>] {
        &self.groups
    }

    /// Component index of `agent`.
    pub fn component_of(&self, agent: AgentId) -> Option<usize> {
        self.label.get(&agent).copied()
    }

    /// Size of the largest component (0 for an empty population).
    pub fn largest(&self) -> usize {
        self.groups.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Components with at least two members.
    pub fn non_trivial(&self) -> impl Iterator<Item = &[AgentId]> + '_ {
        self.groups.iter().filter(|g| g.len() > 1).map(Vec::as_slice)
    }
}
