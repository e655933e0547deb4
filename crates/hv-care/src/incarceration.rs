//! Incarceration entry, in-facility care, and release.
//!
//! Entry probability is `INCAR[race, sex] × (1 + 4·hiv) × calib.incar_p`.
//! A stay is a jail stay with probability `jail_prob`, otherwise prison; the
//! length comes from [`draw_sentence`].  On entry each current partner may
//! open a high-risk window.  Release reopens one for the agent itself unless
//! post-release HR treatment covers it.

use hv_agent::{Facility, Population, draw_haart_adherence, draw_sentence};
use hv_core::{AgentId, Params, PostReleaseTreatment, SimRng};

use crate::{CareResult, HighRiskController};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IncarEvent {
    Entered { facility: Facility, months: u32 },
    Released,
}

pub struct IncarcerationController<'a> {
    params: &'a Params,
    hr:     HighRiskController<'a>,
}

impl<'a> IncarcerationController<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self { params, hr: HighRiskController::new(params) }
    }

    pub fn entry_prob(&self, pop: &Population, id: AgentId) -> CareResult<f64> {
        let agent = pop.agent(id)?;
        let row = self.params.row(agent.race(), agent.sex_type())?;
        let hiv = if agent.hiv() { 1.0 } else { 0.0 };
        Ok(row.incar_rate * (1.0 + 4.0 * hiv) * self.params.calibration.incar_p)
    }

    pub fn update(&self, pop: &mut Population, id: AgentId, rng: &mut SimRng) -> CareResult<Option<IncarEvent>> {
        if pop.agent(id)?.incar() {
            return self.serve(pop, id, rng);
        }

        let agent = pop.agent_mut(id)?;
        agent.incar_treatment_time = agent.incar_treatment_time.saturating_sub(1);

        if !rng.gen_bool(self.entry_prob(pop, id)?) {
            return Ok(None);
        }
        let (facility, months) = draw_sentence(self.params, rng);
        self.enter(pop, id, facility, months, rng)?;
        Ok(Some(IncarEvent::Entered { facility, months }))
    }

    /// Incarcerate `id` and run intake care and the partner HR cascade.
    pub fn enter(
        &self,
        pop: &mut Population,
        id: AgentId,
        facility: Facility,
        months: u32,
        rng: &mut SimRng,
    ) -> CareResult<()> {
        let incar = &self.params.incar;
        pop.set_incar(id, Some(months))?;

        let test_prob = match facility {
            Facility::Jail => incar.jail_test_prob,
            Facility::Prison => incar.prison_test_prob,
        };
        let agent = pop.agent(id)?;
        if agent.hiv() && !agent.tested() && rng.gen_bool(test_prob) {
            pop.diagnose(id)?;
        }
        if facility == Facility::Prison {
            let agent = pop.agent(id)?;
            if agent.hiv() && agent.tested() && !agent.haart() && rng.gen_bool(incar.art_enroll) {
                let adh = draw_haart_adherence(incar.art_adh, rng);
                pop.set_haart(id, Some(adh))?;
            }
        }

        if self.params.features.high_risk {
            let hr = &self.params.high_risk;
            for partner in pop.agent(id)?.partners().to_vec() {
                if !pop.agent(partner)?.hr() && rng.gen_bool(hr.proportion) {
                    self.hr.enter(pop, partner, hr.f_dur)?;
                }
            }
        }
        log::trace!("{id} incarcerated ({facility:?}, {months} months)");
        Ok(())
    }

    fn serve(&self, pop: &mut Population, id: AgentId, rng: &mut SimRng) -> CareResult<Option<IncarEvent>> {
        let agent = pop.agent_mut(id)?;
        agent.incar_time = agent.incar_time.saturating_sub(1);
        if agent.incar_time > 0 {
            return Ok(None);
        }
        self.release(pop, id, rng)?;
        Ok(Some(IncarEvent::Released))
    }

    fn release(&self, pop: &mut Population, id: AgentId, rng: &mut SimRng) -> CareResult<()> {
        let incar = &self.params.incar;
        pop.set_incar(id, None)?;
        pop.record_release(id)?;

        let agent = pop.agent_mut(id)?;
        agent.ever_incar = true;
        if !incar.treat_set.is_empty() {
            agent.incar_treatment_time = incar.treatment_dur;
        }
        let (hiv, haart) = (agent.hiv(), agent.haart());

        if haart && rng.gen_bool(incar.art_disc) {
            pop.set_haart(id, None)?;
        }

        let suppressed = hiv && incar.treat_set.contains(&PostReleaseTreatment::HighRiskBehavior);
        if self.params.features.high_risk && !suppressed {
            let months = self.hr.release_window(pop, id)?;
            self.hr.enter(pop, id, months)?;
        }
        Ok(())
    }
}
