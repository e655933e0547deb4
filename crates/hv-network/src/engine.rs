//! Partnership formation and dissolution.
//!
//! # Per-step order
//!
//! ```text
//! ① Dissolve — every relationship counts down one month and ends at 0;
//!              one with an incarcerated endpoint also ends with
//!              probability `incar.ptnr_dissolution`.
//! ② Form     — every free agent (snapshot of All, slot order) draws
//!              Bernoulli(p_acquire) and, on success, asks get_partner for
//!              one candidate; a match creates a relationship with a drawn
//!              duration.
//! ```
//!
//! Every draw here comes from the `net` stream.
//!
//! # Candidate search
//!
//! Searches never scan a whole set.  Uniform picks use rejection sampling
//! bounded by `ptnr_sample_depth`; assortative picks filter a bounded
//! [`AgentSet::sample`](hv_agent::AgentSet::sample).  An exhausted search
//! is a miss (`None`), not an error.

use hv_agent::{Agent, AgentSet, Population, SetKey};
use hv_core::{AgentId, AssortMode, DrugType, Params, SexType, SimRng};

use crate::{NetworkResult, RelKind, RelationshipStore};

/// Probability an injector seeks a needle partner rather than a sexual one.
const NEEDLE_SEEK_PROB: f64 = 0.8;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PartnershipStats {
    pub formed:    usize,
    /// Acquisition attempts that found no eligible candidate.
    pub misses:    usize,
    pub dissolved: usize,
}

pub struct PartnershipEngine<'a> {
    params: &'a Params,
}

impl<'a> PartnershipEngine<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self { params }
    }

    /// Dissolve, then form.
    pub fn step(
        &self,
        pop: &mut Population,
        rels: &mut RelationshipStore,
        rng: &mut SimRng,
    ) -> NetworkResult<PartnershipStats> {
        let dissolved = self.dissolve(pop, rels, rng)?;
        let mut stats = PartnershipStats { dissolved, ..PartnershipStats::default() };
        self.form(pop, rels, rng, &mut stats)?;
        log::trace!(
            "partnerships: +{} -{} ({} misses, {} live)",
            stats.formed,
            stats.dissolved,
            stats.misses,
            rels.len()
        );
        Ok(stats)
    }

    /// Count every relationship down and end the expired ones.
    ///
    /// Runs before the step's transmission phase, so a relationship that
    /// exists going into a step loses one month before its partners act.
    pub fn dissolve(
        &self,
        pop: &mut Population,
        rels: &mut RelationshipStore,
        rng: &mut SimRng,
    ) -> NetworkResult<usize> {
        let mut ended = 0;
        for id in rels.snapshot() {
            let Some(rel) = rels.get_mut(id) else { continue };
            let expired = rel.progress();
            let (a, b) = rel.endpoints();
            let end = expired || {
                let incarcerated = pop.get(a).is_some_and(Agent::incar)
                    || pop.get(b).is_some_and(Agent::incar);
                incarcerated && rng.gen_bool(self.params.incar.ptnr_dissolution)
            };
            if end {
                rels.terminate(pop, id)?;
                ended += 1;
            }
        }
        Ok(ended)
    }

    fn form(
        &self,
        pop: &mut Population,
        rels: &mut RelationshipStore,
        rng: &mut SimRng,
        stats: &mut PartnershipStats,
    ) -> NetworkResult<()> {
        for id in pop.all().snapshot() {
            let Some(agent) = pop.get(id) else { continue };
            if agent.incar() || !rng.gen_bool(self.acquisition_prob(agent)) {
                continue;
            }
            match self.get_partner(pop, id, rng)? {
                Some((partner, kind)) => {
                    let duration = self.draw_duration(rng);
                    rels.create(pop, id, partner, kind, duration)?;
                    stats.formed += 1;
                }
                None => stats.misses += 1,
            }
        }
        Ok(())
    }

    /// Monthly probability that `agent` attempts to acquire a partner.
    pub fn acquisition_prob(&self, agent: &Agent) -> f64 {
        let c = &self.params.calibration;
        let mut p = c.sexual_part_scaling
            * self.params.behavior.partner_turnover
            * agent.mean_num_partners
            / 12.0;
        if agent.is_idu() {
            p *= c.needle_part_scaling;
        }
        p
    }

    /// Relationship length in months: a duration bin by weight, then
    /// uniform within it.
    pub fn draw_duration(&self, rng: &mut SimRng) -> u32 {
        let bins = &self.params.partnership.duration_bins;
        let weights: Vec<f64> = bins.iter().map(|b| b.weight).collect();
        match rng.categorical(&weights) {
            Some(i) => rng.gen_range(bins[i].min..=bins[i].max).max(1),
            None => 1,
        }
    }

    // ── Candidate search ──────────────────────────────────────────────────

    /// One candidate partner for `id`, with the kind of relationship it
    /// would form.  `None` is a miss.
    pub fn get_partner(
        &self,
        pop: &Population,
        id: AgentId,
        rng: &mut SimRng,
    ) -> NetworkResult<Option<(AgentId, RelKind)>> {
        let agent = pop.agent(id)?;
        if agent.is_idu() && rng.gen_bool(NEEDLE_SEEK_PROB) {
            let pool = pop.all().subset_by_key(SetKey::Drug(DrugType::Idu));
            let found = pool.and_then(|set| self.pick_uniform(pop, agent, set, rng, |_| true));
            return Ok(found.map(|p| (p, RelKind::Needle)));
        }
        Ok(self.sexual_partner(pop, agent, rng)?.map(|p| (p, RelKind::Sexual)))
    }

    fn sexual_partner(
        &self,
        pop: &Population,
        agent: &Agent,
        rng: &mut SimRng,
    ) -> NetworkResult<Option<AgentId>> {
        let eligible = &self.params.row(agent.race(), agent.sex_type())?.eligible_partner_types;
        if eligible.is_empty() {
            return Ok(None);
        }

        let assort = &self.params.assort;
        if rng.gen_bool(assort.coeff) {
            if let Some(found) = self.assortative_partner(pop, agent, eligible, assort.mode, rng) {
                return Ok(found);
            }
        }

        let Some(set) = pick_type_subset(pop, eligible, rng) else {
            return Ok(None);
        };
        Ok(self.pick_uniform(pop, agent, set, rng, |c| sexual_pair(agent, c)))
    }

    /// `None` when `mode` does not apply to this seeker (fall back to
    /// uniform); `Some(None)` for an assortative miss.
    fn assortative_partner(
        &self,
        pop: &Population,
        agent: &Agent,
        eligible: &[SexType],
        mode: AssortMode,
        rng: &mut SimRng,
    ) -> Option<Option<AgentId>> {
        let found = match mode {
            AssortMode::Age => {
                let row = usize::from(agent.age_bin().clamp(1, 5)) - 1;
                let bin = rng.categorical(&self.params.assort.age_matrix[row])? as u8 + 1;
                self.pick_filtered(pop, agent, eligible, rng, |c| c.age_bin() == bin)
            }
            AssortMode::Race => {
                let race = agent.race();
                self.pick_filtered(pop, agent, eligible, rng, |c| c.race() == race)
            }
            AssortMode::HR => self.pick_filtered(pop, agent, eligible, rng, Agent::hr),
            AssortMode::Client => {
                if agent.sex_type() != SexType::Hm {
                    return None;
                }
                let threshold = self.params.behavior.client_partner_threshold;
                self.pick_filtered(pop, agent, &[SexType::Hf], rng, |c| {
                    c.mean_num_partners >= threshold
                })
            }
        };
        Some(found)
    }

    /// Filter a bounded sample of one eligible-type subset.
    fn pick_filtered(
        &self,
        pop: &Population,
        agent: &Agent,
        eligible: &[SexType],
        rng: &mut SimRng,
        accept: impl Fn(&Agent) -> bool,
    ) -> Option<AgentId> {
        let set = pick_type_subset(pop, eligible, rng)?;
        set.sample(rng, self.params.calibration.ptnr_sample_depth)
            .into_iter()
            .find(|c| {
                pop.get(*c).is_some_and(|cand| {
                    eligible_pair(agent, cand) && sexual_pair(agent, cand) && accept(cand)
                })
            })
    }

    /// Rejection-sample `set` up to `ptnr_sample_depth` times.
    fn pick_uniform(
        &self,
        pop: &Population,
        agent: &Agent,
        set: &AgentSet,
        rng: &mut SimRng,
        accept: impl Fn(&Agent) -> bool,
    ) -> Option<AgentId> {
        for _ in 0..self.params.calibration.ptnr_sample_depth {
            let c = set.random_agent(rng)?;
            if pop.get(c).is_some_and(|cand| eligible_pair(agent, cand) && accept(cand)) {
                return Some(c);
            }
        }
        None
    }
}

/// A candidate must be someone else, not already a partner, and free.
fn eligible_pair(agent: &Agent, cand: &Agent) -> bool {
    cand.id() != agent.id() && !agent.has_partner(cand.id()) && !cand.incar()
}

/// Needle partners may be any sex; sexual partners must be compatible.
fn sexual_pair(agent: &Agent, cand: &Agent) -> bool {
    agent.sex_type().sex_possible(cand.sex_type())
}

/// Choose one of the eligible sex-type subsets of All, weighted by size.
fn pick_type_subset<'p>(pop: &'p Population, eligible: &[SexType], rng: &mut SimRng) -> Option<&'p AgentSet> {
    let subsets: Vec<&AgentSet> = eligible
        .iter()
        .filter_map(|s| pop.all().subset_by_key(SetKey::Sex(*s)))
        .collect();
    let weights: Vec<f64> = subsets.iter().map(|s| s.len() as f64).collect();
    let i = rng.categorical(&weights)?;
    Some(subsets[i])
}
