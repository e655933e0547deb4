//! Mortality and die-and-replace.
//!
//! Deaths are drawn on the `run` stream over a snapshot of All.  A decedent
//! has every relationship terminated before it leaves the population; when
//! `features.static_n` is on a replacement is drawn on the `pop` stream with
//! the same id and the next generation.

use std::collections::BTreeMap;

use hv_agent::{Agent, Population, PopulationBuilder};
use hv_core::{Params, SexType, SimRng};
use hv_network::RelationshipStore;

use crate::EpiResult;

/// Deaths over one step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeathCounts {
    pub total:   usize,
    pub hiv_pos: usize,
    pub aids:    usize,
    pub by_sex:  BTreeMap<SexType, usize>,
}

impl DeathCounts {
    pub fn record(&mut self, agent: &Agent) {
        self.total += 1;
        if agent.hiv() {
            self.hiv_pos += 1;
        }
        if agent.aids() {
            self.aids += 1;
        }
        *self.by_sex.entry(agent.sex_type()).or_default() += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub struct MortalityEngine<'a> {
    params:  &'a Params,
    builder: PopulationBuilder<'a>,
}

impl<'a> MortalityEngine<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self { params, builder: PopulationBuilder::new(params) }
    }

    /// Monthly death probability: the race's per-1000-person-year rate for
    /// the agent's HIV state, scaled by `calibration.mortality`.
    pub fn death_prob(&self, agent: &Agent) -> EpiResult<f64> {
        let rates = self.params.mortality_rates(agent.race())?;
        let rate = if agent.aids() {
            rates.aids
        } else if agent.hiv() {
            if agent.haart() && agent.haart_adh >= 2 {
                rates.hiv_haart
            } else {
                rates.hiv_untreated
            }
        } else {
            rates.hiv_neg
        };
        Ok(rate * self.params.calibration.mortality / 12_000.0)
    }

    /// Draw deaths among free agents and replace the dead.
    pub fn die_and_replace(
        &self,
        pop: &mut Population,
        rels: &mut RelationshipStore,
        run: &mut SimRng,
        pop_rng: &mut SimRng,
    ) -> EpiResult<DeathCounts> {
        let mut deaths = DeathCounts::default();
        for id in pop.all().snapshot() {
            let agent = pop.agent(id)?;
            if agent.incar() || !run.gen_bool(self.death_prob(agent)?) {
                continue;
            }
            deaths.record(agent);
            let generation = pop.next_generation(id);
            rels.terminate_all_for(pop, id)?;
            pop.remove(id)?;
            if self.params.features.static_n {
                let replacement = self.builder.new_agent(id, generation, pop_rng)?;
                pop.insert(replacement)?;
            }
        }
        if deaths.total > 0 {
            log::debug!("mortality: {} deaths ({} HIV+)", deaths.total, deaths.hiv_pos);
        }
        Ok(deaths)
    }
}
