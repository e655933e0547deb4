//! PrEP enrollment, pharmacokinetics, discontinuation, and fallout.
//!
//! # Per-agent cycle (HIV− agents, once per step)
//!
//! ```text
//! on PrEP ─► injectable PK update
//!         ─► in fallout?   count down; injectable leaves PrEP at 0
//!         ─► else discontinue w.p. PrEP_disc (start fallout; oral leaves now)
//!         ─► else injectable redose once last_dose > 2
//! off PrEP ─► oral lockout countdown, else try enrollment by target model
//! ```
//!
//! `Clinical` and `RandomTrial` enroll agents in population-wide sweeps
//! ([`PrepController::clinical_fill`], [`PrepController::random_trial`])
//! instead of through the per-agent path.

use hv_agent::{Agent, Population};
use hv_core::{AgentId, Params, PrepTargetModel, PrepType, Race, SexRole, SexType, SimRng};
use hv_network::Components;

use crate::CareResult;

/// Months after the last injection at which the load is treated as zero.
pub const INJ_CLEARANCE_MONTHS: i32 = 12;

/// Months between injections.
const REDOSE_AFTER: i32 = 2;

/// Share of connected components assigned to the treatment arm.
pub const TRIAL_ARM_PROB: f64 = 0.5;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrepEvent {
    Enrolled,
    /// Discontinued; for injectables the fallout window has just opened.
    Discontinued,
    /// Injectable fallout completed.
    FalloutEnded,
    Redosed,
}

/// Injectable load `months` after the last dose.
pub fn injectable_load(peak: f64, halflife_days: f64, months: i32) -> f64 {
    if months > INJ_CLEARANCE_MONTHS {
        return 0.0;
    }
    let months = months.max(0) as f64;
    peak * 0.5_f64.powf(months / (halflife_days / 30.0))
}

pub struct PrepController<'a> {
    params: &'a Params,
}

impl<'a> PrepController<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self { params }
    }

    /// Number of agents to hold on PrEP: `target` × the HIV− population.
    pub fn target_count(&self, pop: &Population) -> usize {
        let negatives = pop.len().saturating_sub(pop.flags().hiv.len());
        (negatives as f64 * self.params.prep.target).floor() as usize
    }

    /// Free, HIV−, off PrEP, and out of any oral lockout.
    pub fn available(agent: &Agent) -> bool {
        !agent.hiv() && !agent.prep() && !agent.incar() && agent.prep_time == 0
    }

    /// Target-model eligibility for the per-agent enrollment path.
    pub fn eligible(&self, agent: &Agent) -> bool {
        if !Self::available(agent) {
            return false;
        }
        match self.params.prep.target_model {
            PrepTargetModel::Allcomers => true,
            PrepTargetModel::HighPN5 => agent.mean_num_partners >= 5.0,
            PrepTargetModel::HighPN10 => agent.mean_num_partners >= 10.0,
            PrepTargetModel::SRIns => agent.role == SexRole::Insertive,
            PrepTargetModel::MSM => agent.sex_type() == SexType::Msm,
            PrepTargetModel::Racial => agent.race() == Race::Black,
            PrepTargetModel::RandomTrial | PrepTargetModel::Clinical => false,
        }
    }

    /// Put `id` on PrEP.
    pub fn enroll(&self, pop: &mut Population, id: AgentId, rng: &mut SimRng) -> CareResult<()> {
        let prep = &self.params.prep;
        let adherent = rng.gen_bool(prep.adherence);
        pop.set_prep(id, true)?;
        let agent = pop.agent_mut(id)?;
        agent.prep_adh = u8::from(adherent);
        agent.prep_time = 0;
        if prep.prep_type == PrepType::Inj {
            agent.prep_load = prep.peak_load;
            agent.prep_last_dose = 0;
        }
        Ok(())
    }

    /// Advance an injectable agent's load by one month.
    pub fn advance_load(&self, agent: &mut Agent) {
        let prep = &self.params.prep;
        agent.prep_last_dose += 1;
        agent.prep_load = injectable_load(prep.peak_load, prep.halflife, agent.prep_last_dose);
    }

    /// One step of the per-agent cycle.  `t` gates enrollment on `start_t`.
    pub fn update(
        &self,
        pop: &mut Population,
        id: AgentId,
        t: u32,
        rng: &mut SimRng,
    ) -> CareResult<Option<PrepEvent>> {
        let agent = pop.agent(id)?;
        if agent.hiv() {
            return Ok(None);
        }
        if agent.prep() {
            self.on_prep(pop, id, rng)
        } else {
            self.off_prep(pop, id, t, rng)
        }
    }

    fn on_prep(&self, pop: &mut Population, id: AgentId, rng: &mut SimRng) -> CareResult<Option<PrepEvent>> {
        // Sweep enrollees start their cycle next step, like per-agent ones.
        if pop.step().new_prep.contains(id) {
            return Ok(None);
        }
        let prep = &self.params.prep;
        let injectable = prep.prep_type == PrepType::Inj;
        let disc = {
            let agent = pop.agent(id)?;
            self.params.row(agent.race(), agent.sex_type())?.prep_disc
        };

        let agent = pop.agent_mut(id)?;
        if injectable {
            self.advance_load(agent);
        }

        if agent.prep_time > 0 {
            agent.prep_time -= 1;
            if agent.prep_time == 0 {
                pop.set_prep(id, false)?;
                return Ok(Some(PrepEvent::FalloutEnded));
            }
            return Ok(None);
        }

        if rng.gen_bool(disc) {
            agent.prep_time = prep.fallout_t;
            if !injectable || prep.fallout_t == 0 {
                pop.set_prep(id, false)?;
            }
            return Ok(Some(PrepEvent::Discontinued));
        }

        if injectable && agent.prep_last_dose > REDOSE_AFTER {
            // Next PK update brings the load back to peak.
            agent.prep_last_dose = -1;
            return Ok(Some(PrepEvent::Redosed));
        }
        Ok(None)
    }

    fn off_prep(
        &self,
        pop: &mut Population,
        id: AgentId,
        t: u32,
        rng: &mut SimRng,
    ) -> CareResult<Option<PrepEvent>> {
        let prep = &self.params.prep;
        let agent = pop.agent_mut(id)?;
        if agent.prep_time > 0 {
            agent.prep_time -= 1;
            return Ok(None);
        }
        if t < prep.start_t || !self.eligible(agent) {
            return Ok(None);
        }

        let enroll = match prep.target_model {
            PrepTargetModel::Racial => rng.gen_bool(prep.target),
            _ => pop.flags().prep.len() < self.target_count(pop),
        };
        if enroll {
            self.enroll(pop, id, rng)?;
            return Ok(Some(PrepEvent::Enrolled));
        }
        Ok(None)
    }

    /// Fill toward the target from the clinical partner-count strata.
    ///
    /// Each attempt draws a stratum, then a random agent; the agent is
    /// enrolled if it is available and its partner count falls in the
    /// stratum.  Gives up after `max_resamples` misses.
    pub fn clinical_fill(&self, pop: &mut Population, rng: &mut SimRng) -> CareResult<usize> {
        let bins = self.params.clinic_bins();
        let weights: Vec<f64> = bins.iter().map(|b| b.prob).collect();
        let target = self.target_count(pop);
        let max_misses = self.params.prep.max_resamples;

        let mut enrolled = 0;
        let mut misses = 0;
        while pop.flags().prep.len() < target {
            if misses >= max_misses {
                log::warn!(
                    "clinical PrEP: no eligible agent after {misses} resamples ({}/{target} enrolled)",
                    pop.flags().prep.len()
                );
                break;
            }
            let (Some(bin), Some(id)) = (rng.categorical(&weights), pop.all().random_agent(rng)) else {
                break;
            };
            let bin = bins[bin];
            let agent = pop.agent(id)?;
            let partners = agent.mean_num_partners;
            if Self::available(agent) && partners >= f64::from(bin.min) && partners <= f64::from(bin.max) {
                self.enroll(pop, id, rng)?;
                enrolled += 1;
            } else {
                misses += 1;
            }
        }
        Ok(enrolled)
    }

    /// Component-level trial: each connected component joins the treatment
    /// arm with probability 0.5; available members of treated components are
    /// marked and enrolled with probability `target`.
    pub fn random_trial(&self, pop: &mut Population, rng: &mut SimRng) -> CareResult<usize> {
        let components = Components::of(pop);
        let mut enrolled = 0;
        let mut treated = 0;
        for group in components.groups() {
            if !rng.gen_bool(TRIAL_ARM_PROB) {
                continue;
            }
            treated += 1;
            for &id in group {
                let agent = pop.agent_mut(id)?;
                if agent.hiv() || agent.prep() {
                    continue;
                }
                agent.trial_treated = true;
                if Self::available(agent) && rng.gen_bool(self.params.prep.target) {
                    self.enroll(pop, id, rng)?;
                    enrolled += 1;
                }
            }
        }
        log::info!(
            "PrEP trial: {treated} of {} components treated, {enrolled} agents enrolled",
            components.len()
        );
        Ok(enrolled)
    }
}
