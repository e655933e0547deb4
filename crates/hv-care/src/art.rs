//! ART initiation and discontinuation.

use hv_agent::{Agent, Population, draw_haart_adherence};
use hv_core::{AgentId, Params, PostReleaseTreatment, SimRng};

use crate::CareResult;

/// Monthly base initiation probability for injectors.
pub const ART_INIT_IDU: f64 = 0.00625;
/// Monthly base initiation probability for everyone else.
pub const ART_INIT_OTHER: f64 = 0.0117;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArtEvent {
    Started,
    Stopped,
}

pub struct ArtController<'a> {
    params: &'a Params,
}

impl<'a> ArtController<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self { params }
    }

    pub fn init_prob(&self, agent: &Agent) -> f64 {
        let base = if agent.is_idu() { ART_INIT_IDU } else { ART_INIT_OTHER };
        base * self.params.calibration.art_cov
    }

    /// Post-release retention-in-care treatment is active for `agent`.
    pub fn retained(&self, agent: &Agent) -> bool {
        agent.incar_treatment_time > 0
            && self.params.incar.treat_set.contains(&PostReleaseTreatment::ArtRetention)
    }

    /// Start or stop HAART for a diagnosed HIV+ agent.
    pub fn update(&self, pop: &mut Population, id: AgentId, rng: &mut SimRng) -> CareResult<Option<ArtEvent>> {
        let agent = pop.agent(id)?;
        if !(agent.hiv() && agent.tested()) {
            return Ok(None);
        }
        let row = self.params.row(agent.race(), agent.sex_type())?;

        if !agent.haart() {
            if rng.gen_bool(self.init_prob(agent)) {
                let adh = draw_haart_adherence(row.haart_adh, rng);
                pop.set_haart(id, Some(adh))?;
                return Ok(Some(ArtEvent::Started));
            }
        } else if !self.retained(agent) && rng.gen_bool(row.haart_disc) {
            pop.set_haart(id, None)?;
            return Ok(Some(ArtEvent::Stopped));
        }
        Ok(None)
    }
}
