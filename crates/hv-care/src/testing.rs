//! HIV testing and the partner-notification cascade.

use hv_agent::Population;
use hv_core::{AgentId, Params, SimRng};

use crate::CareResult;

/// Probability an untested HIV+ partner of a newly diagnosed agent tests
/// through partner notification.
pub const PARTNER_TEST_PROB: f64 = 0.87;

pub struct TestingController<'a> {
    params: &'a Params,
}

impl<'a> TestingController<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self { params }
    }

    /// Monthly testing probability for `id`.
    pub fn test_prob(&self, pop: &Population, id: AgentId) -> CareResult<f64> {
        let agent = pop.agent(id)?;
        let row = self.params.row(agent.race(), agent.sex_type())?;
        Ok(row.test_freq * self.params.calibration.test_freq)
    }

    /// Test an untested HIV+ agent.  With `cascade` on, a positive test
    /// notifies every untested HIV+ partner.  Returns how many agents were
    /// diagnosed.
    pub fn update(
        &self,
        pop: &mut Population,
        id: AgentId,
        rng: &mut SimRng,
        cascade: bool,
    ) -> CareResult<usize> {
        let agent = pop.agent(id)?;
        if !agent.hiv() || agent.tested() {
            return Ok(0);
        }
        if !rng.gen_bool(self.test_prob(pop, id)?) {
            return Ok(0);
        }
        pop.diagnose(id)?;
        let mut diagnosed = 1;
        if cascade {
            diagnosed += self.notify_partners(pop, id, rng)?;
        }
        Ok(diagnosed)
    }

    fn notify_partners(&self, pop: &mut Population, id: AgentId, rng: &mut SimRng) -> CareResult<usize> {
        let mut n = 0;
        for partner in pop.agent(id)?.partners().to_vec() {
            let p = pop.agent(partner)?;
            if p.hiv() && !p.tested() && rng.gen_bool(PARTNER_TEST_PROB) {
                pop.diagnose(partner)?;
                n += 1;
            }
        }
        Ok(n)
    }
}
