//! Post-incarceration high-risk windows.
//!
//! Entering a window adds `high_risk.partner_scale` to the agent's
//! `mean_num_partners` and remembers the amount in `hr_bump`; expiry
//! subtracts exactly that amount.  An agent already in a window is not
//! bumped again.

use hv_agent::Population;
use hv_core::{AgentId, Params};

use crate::CareResult;

pub struct HighRiskController<'a> {
    params: &'a Params,
}

impl<'a> HighRiskController<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self { params }
    }

    /// Open a window of `months`.  Returns `false` if the agent was already
    /// high-risk.
    pub fn enter(&self, pop: &mut Population, id: AgentId, months: u32) -> CareResult<bool> {
        let agent = pop.agent_mut(id)?;
        if agent.hr() {
            return Ok(false);
        }
        let bump = self.params.high_risk.partner_scale;
        agent.hr_time = months.max(1);
        agent.ever_hr = true;
        agent.hr_bump = bump;
        agent.mean_num_partners += bump;
        pop.set_hr(id, true)?;
        pop.record_hr_roll(id)?;
        Ok(true)
    }

    /// Window length for an agent leaving incarceration.
    pub fn release_window(&self, pop: &Population, id: AgentId) -> CareResult<u32> {
        let hr = &self.params.high_risk;
        Ok(if pop.agent(id)?.sex_type().is_male() { hr.m_dur } else { hr.f_dur })
    }

    /// Count the window down; close it at zero.  Returns `true` on expiry.
    pub fn update(&self, pop: &mut Population, id: AgentId) -> CareResult<bool> {
        let agent = pop.agent_mut(id)?;
        if !agent.hr() {
            return Ok(false);
        }
        agent.hr_time = agent.hr_time.saturating_sub(1);
        if agent.hr_time > 0 {
            return Ok(false);
        }
        agent.mean_num_partners = (agent.mean_num_partners - agent.hr_bump).max(0.0);
        agent.hr_bump = 0.0;
        pop.set_hr(id, false)?;
        Ok(true)
    }
}
