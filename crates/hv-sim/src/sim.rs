//! The `Sim` struct and its monthly step loop.

use hv_agent::{Population, SetKey};
use hv_care::{
    ArtController, HighRiskController, IncarcerationController, PrepController, TestingController,
    enroll_sne,
};
use hv_core::{AgentId, DrugType, Params, PrepTargetModel, RngStreams, Tick};
use hv_epi::{DeathCounts, MortalityEngine, ProgressionEngine, TransmissionEngine, TransmissionStats};
use hv_network::{PartnershipEngine, PartnershipStats, RelationshipStore};

use crate::{SimError, SimObserver, SimResult, StepReport};

/// Partners pre-seeded for agent zero before its infection.
pub const AGENT_ZERO_PARTNERS: usize = 4;

/// One replicate: the population, its relationships, and the three RNG
/// streams.
///
/// Drives burn-in and the main step loop:
///
/// 1. **Partnerships**: dissolve, then form (net stream).
/// 2. **Transmission**: one interaction per serodiscordant free pair.
/// 3. **Agents**: per agent, in `All` order: high-risk window, incarceration,
///    progression, then testing and ART (HIV+, free) or PrEP (HIV−).
/// 4. **Report**: the observer sees this step's event sets.
/// 5. **Mortality**: death counts reset, die-and-replace (pop stream for
///    replacements).
/// 6. **Cleanup**: step sets cleared; once cumulative diagnoses reach
///    `treatment.init_treatment`, the one-shot treatment enrollment fires.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim {
    pub params: Params,
    pub pop:    Population,
    pub rels:   RelationshipStore,
    pub rngs:   RngStreams,

    /// Last completed main step; `Tick::ZERO` before the first.
    t:                 Tick,
    burned:            bool,
    deaths:            DeathCounts,
    total_diagnoses:   usize,
    treatment_enabled: bool,
    trial_done:        bool,
}

impl Sim {
    pub(crate) fn new(params: Params, pop: Population, rels: RelationshipStore, rngs: RngStreams) -> Self {
        Self {
            params,
            pop,
            rels,
            rngs,
            t:                 Tick::ZERO,
            burned:            false,
            deaths:            DeathCounts::default(),
            total_diagnoses:   0,
            treatment_enabled: false,
            trial_done:        false,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn tick(&self) -> Tick {
        self.t
    }

    /// Deaths from the most recent die-and-replace pass.
    pub fn deaths(&self) -> &DeathCounts {
        &self.deaths
    }

    /// Diagnoses accumulated over the main loop.
    pub fn total_diagnoses(&self) -> usize {
        self.total_diagnoses
    }

    /// The one-shot treatment enrollment has fired (testing cascade is on).
    pub fn treatment_enabled(&self) -> bool {
        self.treatment_enabled
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Burn in (if not done yet), then run main steps up to `sizing.tmax`.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        if !self.burned {
            self.burn(observer)?;
        }
        while self.t.0 < self.params.sizing.tmax {
            self.step(observer)?;
        }
        observer.on_sim_end(self.t);
        Ok(())
    }

    /// Run exactly `n` main steps (burning in first if needed), ignoring
    /// `tmax`.
    pub fn run_steps<O: SimObserver>(&mut self, n: u32, observer: &mut O) -> SimResult<()> {
        if !self.burned {
            self.burn(observer)?;
        }
        for _ in 0..n {
            self.step(observer)?;
        }
        Ok(())
    }

    /// Run `sizing.burn_duration` burn-in steps: partnerships, high-risk
    /// windows, incarceration and mortality advance; transmission,
    /// progression and care do not.  Step sets are cleared at the end.
    pub fn burn<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let months = self.params.sizing.burn_duration;
        for _ in 0..months {
            PartnershipEngine::new(&self.params).step(&mut self.pop, &mut self.rels, &mut self.rngs.net)?;
            self.update_agents(true)?;
            self.mortality()?;
        }
        self.pop.clear_step_sets();
        self.burned = true;
        log::info!(
            "burn-in complete after {months} months: {} agents, {} relationships, {} HIV+",
            self.pop.len(),
            self.rels.len(),
            self.pop.flags().hiv.len()
        );
        observer.on_burn_end(&self.pop, &self.rels);
        Ok(())
    }

    /// Advance one main step.
    pub fn step<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let t = self.t.next();

        let partnerships = PartnershipEngine::new(&self.params)
            .step(&mut self.pop, &mut self.rels, &mut self.rngs.net)?;
        let transmission = TransmissionEngine::new(&self.params)
            .step(&mut self.pop, &mut self.rels, &mut self.rngs.run)?;
        self.prep_sweeps(t)?;
        self.t = t;
        self.update_agents(false)?;

        self.report(observer, partnerships, transmission);

        // Count before mortality drops the dead from the step sets.
        self.total_diagnoses += self.pop.step().new_diagnosis.len();
        self.mortality()?;
        self.pop.clear_step_sets();
        self.check_treatment_trigger()?;

        log::debug!(
            "{t}: {} agents, {} HIV+, {} new infections, {} relationships",
            self.pop.len(),
            self.pop.flags().hiv.len(),
            transmission.infections(),
            self.rels.len()
        );
        Ok(())
    }

    /// Check partner symmetry, flag/set agreement, flag implications,
    /// incarceration time, infection clocks and relationship consistency.
    pub fn verify(&self) -> SimResult<()> {
        self.pop
            .check_invariants()
            .map_err(|e| SimError::Invariant(e.to_string()))?;
        self.rels
            .check_consistency(&self.pop)
            .map_err(|e| SimError::Invariant(e.to_string()))?;
        for agent in self.pop.iter() {
            if agent.hiv() != (agent.hiv_time >= 1) {
                return Err(SimError::Invariant(format!(
                    "{}: hiv = {} with hiv_time = {}",
                    agent.id(),
                    agent.hiv(),
                    agent.hiv_time
                )));
            }
        }
        Ok(())
    }

    // ── Agent zero ────────────────────────────────────────────────────────

    /// Draw one IDU agent, give it up to four partners, and infect it.
    /// Returns `None` when there is no IDU agent to seed.
    pub fn seed_agent_zero(&mut self) -> SimResult<Option<AgentId>> {
        let idu = self.pop.all().subset_by_key(SetKey::Drug(DrugType::Idu));
        let Some(idu) = idu.filter(|s| !s.is_empty()) else {
            log::warn!("agent zero requested but the population has no IDU agents");
            return Ok(None);
        };
        let zero = idu.pick(&mut self.rngs.pop)?;

        let engine = PartnershipEngine::new(&self.params);
        let mut seeded = 0;
        for _ in 0..AGENT_ZERO_PARTNERS {
            let Some((partner, kind)) = engine.get_partner(&self.pop, zero, &mut self.rngs.net)? else {
                continue;
            };
            // The next dissolve pass counts this month off before any acts.
            let duration = engine.draw_duration(&mut self.rngs.net) + 1;
            self.rels.create(&mut self.pop, zero, partner, kind, duration)?;
            seeded += 1;
        }
        if self.pop.agent(zero)?.hiv() {
            log::warn!("agent zero {zero} was already HIV+");
        } else {
            self.pop.infect(zero)?;
        }
        log::info!("agent zero {zero} seeded with {seeded} partners");
        Ok(Some(zero))
    }

    // ── Phases ────────────────────────────────────────────────────────────

    fn prep_sweeps(&mut self, t: Tick) -> SimResult<()> {
        let p = &self.params;
        if !p.features.prep || t.0 < p.prep.start_t {
            return Ok(());
        }
        let ctrl = PrepController::new(p);
        match p.prep.target_model {
            PrepTargetModel::Clinical => {
                ctrl.clinical_fill(&mut self.pop, &mut self.rngs.run)?;
            }
            PrepTargetModel::RandomTrial if !self.trial_done => {
                ctrl.random_trial(&mut self.pop, &mut self.rngs.run)?;
                self.trial_done = true;
            }
            _ => {}
        }
        Ok(())
    }

    fn update_agents(&mut self, burn: bool) -> SimResult<()> {
        let p = &self.params;
        let f = &p.features;
        let hr = HighRiskController::new(p);
        let incar = IncarcerationController::new(p);
        let progression = ProgressionEngine::new(p);
        let testing = TestingController::new(p);
        let art = ArtController::new(p);
        let prep = PrepController::new(p);
        let pop = &mut self.pop;
        let rng = &mut self.rngs.run;

        let mut order = pop.all().snapshot();
        rng.shuffle(&mut order);
        for id in order {
            if f.high_risk {
                hr.update(pop, id)?;
            }
            if f.incar {
                incar.update(pop, id, rng)?;
            }
            if burn {
                continue;
            }

            progression.advance(pop, id, rng)?;
            let agent = pop.agent(id)?;
            if agent.hiv() {
                if agent.incar() {
                    continue;
                }
                testing.update(pop, id, rng, self.treatment_enabled)?;
                if f.art {
                    art.update(pop, id, rng)?;
                }
            } else if f.prep {
                prep.update(pop, id, self.t.0, rng)?;
            }
        }
        Ok(())
    }

    fn report<O: SimObserver>(
        &self,
        observer: &mut O,
        partnerships: PartnershipStats,
        transmission: TransmissionStats,
    ) {
        observer.on_step(&StepReport {
            t: self.t,
            pop: &self.pop,
            rels: &self.rels,
            deaths: &self.deaths,
            partnerships,
            transmission,
        });
    }

    fn mortality(&mut self) -> SimResult<()> {
        self.deaths.reset();
        if !self.params.features.die_and_replace {
            return Ok(());
        }
        self.deaths = MortalityEngine::new(&self.params).die_and_replace(
            &mut self.pop,
            &mut self.rels,
            &mut self.rngs.run,
            &mut self.rngs.pop,
        )?;
        Ok(())
    }

    fn check_treatment_trigger(&mut self) -> SimResult<()> {
        if self.treatment_enabled || self.total_diagnoses < self.params.treatment.init_treatment {
            return Ok(());
        }
        self.treatment_enabled = true;
        let enrolled = enroll_sne(&self.params, &mut self.pop, &mut self.rngs.run)?;
        log::info!(
            "{}: {} cumulative diagnoses, treatment enrollment on ({enrolled} in syringe exchange)",
            self.t,
            self.total_diagnoses
        );
        Ok(())
    }
}
