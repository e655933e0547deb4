//! Per-relationship transmission.
//!
//! Each step iterates a snapshot of the relationship ids taken at phase
//! entry.  Only serodiscordant pairs with both endpoints free interact, and
//! only the susceptible endpoint is written.  A donor already in
//! `NewInfections` is skipped, so an agent infected this step never
//! transmits onward until the next one.
//!
//! # Interaction routes
//!
//! | Pair         | Route                                                        |
//! |--------------|--------------------------------------------------------------|
//! | IDU – IDU    | needle 0.6 / sex 0.2 / both 0.2 (sex only if possible)        |
//! | otherwise    | sex, if the pair's sex types are compatible                  |
//!
//! Per-act probabilities combine as `1 − (1 − q)^k` over the `k` risk acts.

use hv_agent::{Agent, Population};
use hv_core::{
    AgentId, Params, PostReleaseTreatment, PrepType, Race, RelId, SimRng,
};
use hv_network::RelationshipStore;

use crate::{EpiError, EpiResult};

/// Exponent for the injectable PrEP protection curve `1 − exp(−k·load)`.
const INJ_PREP_PROTECTION: f64 = 5.528636721;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Sex,
    Needle,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TransmissionStats {
    /// Serodiscordant, free pairs that interacted.
    pub interactions:      usize,
    pub sex_infections:    usize,
    pub needle_infections: usize,
}

impl TransmissionStats {
    pub fn infections(&self) -> usize {
        self.sex_infections + self.needle_infections
    }
}

/// Probability of at least one transmission over `acts` independent acts.
#[inline]
pub fn cumulative_prob(q: f64, acts: u32) -> f64 {
    if acts == 0 {
        return 0.0;
    }
    1.0 - (1.0 - q.clamp(0.0, 1.0)).powi(acts as i32)
}

pub struct TransmissionEngine<'a> {
    params: &'a Params,
}

impl<'a> TransmissionEngine<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self { params }
    }

    /// Run one interaction on every eligible relationship.
    pub fn step(
        &self,
        pop: &mut Population,
        rels: &mut RelationshipStore,
        rng: &mut SimRng,
    ) -> EpiResult<TransmissionStats> {
        let mut stats = TransmissionStats::default();
        for id in rels.snapshot() {
            let Some(rel) = rels.get(id) else { continue };
            let (a, b) = rel.endpoints();
            let (a, b) = (pop.agent(a)?, pop.agent(b)?);
            if a.hiv() == b.hiv() || a.incar() || b.incar() {
                continue;
            }
            let donor = if a.hiv() { a.id() } else { b.id() };
            if pop.step().new_infections.contains(donor) {
                continue;
            }
            stats.interactions += 1;
            match self.interact(pop, rels, id, rng)? {
                Some(Route::Sex) => stats.sex_infections += 1,
                Some(Route::Needle) => stats.needle_infections += 1,
                None => {}
            }
        }
        if stats.infections() > 0 {
            log::debug!(
                "transmission: {} new infections over {} interactions",
                stats.infections(),
                stats.interactions
            );
        }
        Ok(stats)
    }

    /// One interaction on a serodiscordant relationship.  Returns the route
    /// that infected the susceptible, if any.
    pub fn interact(
        &self,
        pop: &mut Population,
        rels: &mut RelationshipStore,
        id: RelId,
        rng: &mut SimRng,
    ) -> EpiResult<Option<Route>> {
        let rel = rels.relationship(id)?;
        let (a, b) = rel.endpoints();
        let sex_possible = rel.sex_possible();
        let (donor, sus) = match (pop.agent(a)?.hiv(), pop.agent(b)?.hiv()) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            _ => return Err(EpiError::NoDiscordance(id)),
        };

        let (needle, sex) = {
            let (d, s) = (pop.agent(donor)?, pop.agent(sus)?);
            if d.is_idu() && s.is_idu() {
                let r: f64 = rng.random();
                let (needle, sex) = if r < 0.6 {
                    (true, false)
                } else if r < 0.8 {
                    (false, true)
                } else {
                    (true, true)
                };
                (needle && !self.needle_treated(s), sex && sex_possible)
            } else {
                (false, sex_possible)
            }
        };

        if needle && self.needle_transmission(pop, donor, sus, rng)? {
            self.infect(pop, sus, rng)?;
            return Ok(Some(Route::Needle));
        }
        if sex && self.sex_transmission(pop, rels, id, donor, sus, rng)? {
            self.infect(pop, sus, rng)?;
            return Ok(Some(Route::Sex));
        }
        Ok(None)
    }

    fn needle_treated(&self, agent: &Agent) -> bool {
        agent.incar_treatment_time > 0
            && self.params.incar.treat_set.contains(&PostReleaseTreatment::IduBehavior)
    }

    /// Shared-injection acts; each act is unsafe independently.
    fn needle_transmission(
        &self,
        pop: &Population,
        donor: AgentId,
        sus: AgentId,
        rng: &mut SimRng,
    ) -> EpiResult<bool> {
        let p = self.params;
        let (d, s) = (pop.agent(donor)?, pop.agent(sus)?);
        let share_acts = rng
            .poisson(p.behavior.mean_needle_acts * p.calibration.needle_act_scaling)
            .max(1);
        let p_unsafe = if s.sne {
            p.behavior.sne_unsafe_share
        } else {
            p.idu_row(d.race())?.needle_share * p.behavior.safe_needle_exchange_prev
        };
        let risky = rng.binomial(share_acts, p_unsafe);
        let q = self.transmission_prob(d, Route::Needle)?;
        Ok(rng.gen_bool(cumulative_prob(q, risky)))
    }

    /// Sex acts, thinned to unsafe acts by the condom-use band (or the
    /// donor's unsafe-sex probability).
    fn sex_transmission(
        &self,
        pop: &Population,
        rels: &mut RelationshipStore,
        id: RelId,
        donor: AgentId,
        sus: AgentId,
        rng: &mut SimRng,
    ) -> EpiResult<bool> {
        let p = self.params;
        let (d, s) = (pop.agent(donor)?, pop.agent(sus)?);
        let row = p.row(d.race(), d.sex_type())?;
        let total = rng.poisson(row.num_sex_acts * p.calibration.sex_act_scaling);

        let rel = rels
            .get_mut(id)
            .ok_or(hv_network::NetworkError::RelationshipNotFound(id))?;
        let p_unsafe = if p.features.condom_bins {
            p.behavior.condom_bins[rel.act_band()]
        } else {
            row.unsafe_sex
        };
        let unsafe_acts = rng.binomial(total, p_unsafe);
        rel.unsafe_acts = rel.unsafe_acts.saturating_add(unsafe_acts);

        let q = self.transmission_prob(d, Route::Sex)? * self.prep_factor(d, s);
        Ok(rng.gen_bool(cumulative_prob(q, unsafe_acts)))
    }

    fn infect(&self, pop: &mut Population, sus: AgentId, rng: &mut SimRng) -> EpiResult<()> {
        let agent = pop.agent(sus)?;
        if agent.hiv() {
            return Err(EpiError::DoubleInfection(sus));
        }
        if agent.prep() && rng.gen_bool(self.params.prep.resist) {
            pop.agent_mut(sus)?.prep_resist = true;
        }
        // Clears PrEP as part of the infection.
        pop.infect(sus)?;
        Ok(())
    }

    // ── Per-act probability ───────────────────────────────────────────────

    /// Per-act transmission probability from `donor` on `route`, before any
    /// PrEP reduction on the susceptible side.
    pub fn transmission_prob(&self, donor: &Agent, route: Route) -> EpiResult<f64> {
        let p = self.params;
        let c = &p.calibration;
        let mut q = match route {
            Route::Sex => p.sex_table(donor.sex_type())?.get(donor.haart_adh),
            Route::Needle => p.transmission.needle.get(donor.haart_adh),
        };
        if donor.acute() {
            q *= c.acute_scaling;
        }
        if donor.tested() {
            q *= 1.0 - c.rr_dx;
        }
        if donor.haart() {
            q *= c.rr_haart;
        }
        if donor.race() == Race::Black {
            q *= c.race_xmission;
        }
        q *= c.p_xmission_scaling;
        Ok(q.clamp(0.0, 1.0))
    }

    /// Multiplier on the per-act probability for a susceptible on PrEP.
    /// 1.0 when off PrEP or when either side carries resistance.
    pub fn prep_factor(&self, donor: &Agent, sus: &Agent) -> f64 {
        if !sus.prep() || sus.prep_resist || donor.prep_resist {
            return 1.0;
        }
        let prep = &self.params.prep;
        match prep.prep_type {
            PrepType::Oral if sus.prep_adh == 1 => 1.0 - prep.adh_efficacy,
            PrepType::Oral => 1.0 - prep.nonadh_efficacy,
            PrepType::Inj => (-INJ_PREP_PROTECTION * sus.prep_load).exp(),
        }
    }
}
