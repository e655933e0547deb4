//! Disease progression for HIV+ agents.

use hv_agent::Population;
use hv_core::{AgentId, Params, SimRng};

use crate::EpiResult;

/// Monthly AIDS progression by adherence level `0..=5` (0 and 1 highest),
/// before the `prog_aids` calibration.
pub const AIDS_PROGRESSION: [f64; 6] = [0.0051, 0.0051, 0.0039, 0.0032, 0.0025, 0.0008];

pub struct ProgressionEngine<'a> {
    params: &'a Params,
}

impl<'a> ProgressionEngine<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self { params }
    }

    /// Monthly probability of progressing to AIDS at adherence `adh`.
    pub fn aids_prob(&self, adh: u8) -> f64 {
        AIDS_PROGRESSION[usize::from(adh.min(5))] * self.params.calibration.prog_aids
    }

    /// Advance one HIV+ agent by a month.  Agents infected during the
    /// current step are left alone.  Returns `true` if the agent progressed
    /// to AIDS.
    pub fn advance(&self, pop: &mut Population, id: AgentId, rng: &mut SimRng) -> EpiResult<bool> {
        if pop.step().new_infections.contains(id) {
            return Ok(false);
        }
        let agent = pop.agent_mut(id)?;
        if !agent.hiv() {
            return Ok(false);
        }
        agent.hiv_time = agent.hiv_time.saturating_add(1);
        if agent.haart() || agent.aids() {
            return Ok(false);
        }
        let p = self.aids_prob(agent.haart_adh);
        if rng.gen_bool(p) {
            pop.set_aids(id)?;
            return Ok(true);
        }
        Ok(false)
    }
}
