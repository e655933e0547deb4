//! `Population` — sole owner of every agent, plus the population-level sets.
//!
//! Agents are stored one per slot, indexed by `AgentId`.  The `All` set and
//! the flag-indexed sets hold non-owning ids only; removing an agent from
//! the population is the single point of destruction.
//!
//! All mutation of set-mirrored flags goes through this type so that every
//! flag and its set stay in step:
//!
//! | Flag     | Set                     | Setter                          |
//! |----------|-------------------------|---------------------------------|
//! | `hiv`    | `flags().hiv`           | [`Population::infect`]          |
//! | `aids`   | `flags().aids`          | [`Population::set_aids`]        |
//! | `tested` | `flags().tested`        | [`Population::diagnose`]        |
//! | `haart`  | `flags().haart`         | [`Population::set_haart`]       |
//! | `prep`   | `flags().prep`          | [`Population::set_prep`]        |
//! | `incar`  | `flags().incar`         | [`Population::set_incar`]       |
//! | `hr`     | `flags().high_risk`     | [`Population::set_hr`]          |

use hv_core::{AgentId, RelId};

use crate::{Agent, AgentError, AgentResult, AgentSet};

/// Flag-indexed sets.  Each is stratified by sex, drug use, and race.
#[derive(Clone, Debug)]
pub struct FlagSets {
    pub hiv:       AgentSet,
    pub aids:      AgentSet,
    pub tested:    AgentSet,
    pub haart:     AgentSet,
    pub prep:      AgentSet,
    pub incar:     AgentSet,
    pub high_risk: AgentSet,
}

impl FlagSets {
    fn new() -> Self {
        Self {
            hiv:       AgentSet::stratified("HIV"),
            aids:      AgentSet::stratified("AIDS"),
            tested:    AgentSet::stratified("Tested"),
            haart:     AgentSet::stratified("HAART"),
            prep:      AgentSet::stratified("PrEP"),
            incar:     AgentSet::stratified("Incarcerated"),
            high_risk: AgentSet::stratified("HighRisk"),
        }
    }

    fn discard_all(&mut self, id: AgentId) {
        for set in [
            &mut self.hiv,
            &mut self.aids,
            &mut self.tested,
            &mut self.haart,
            &mut self.prep,
            &mut self.incar,
            &mut self.high_risk,
        ] {
            set.discard(id);
        }
    }
}

/// Per-step event sets, cleared by the driver after the reporter runs.
#[derive(Clone, Debug)]
pub struct StepSets {
    pub new_infections:    AgentSet,
    pub new_diagnosis:     AgentSet,
    pub new_hr_rolls:      AgentSet,
    pub new_incar_release: AgentSet,
    /// Agents put on PrEP this step.
    pub new_prep:          AgentSet,
}

impl StepSets {
    fn new() -> Self {
        Self {
            new_infections:    AgentSet::stratified("NewInfections"),
            new_diagnosis:     AgentSet::stratified("NewDiagnosis"),
            new_hr_rolls:      AgentSet::stratified("NewHRrolls"),
            new_incar_release: AgentSet::stratified("NewIncarRelease"),
            new_prep:          AgentSet::stratified("NewPrEP"),
        }
    }

    pub fn clear(&mut self) {
        self.new_infections.clear();
        self.new_diagnosis.clear();
        self.new_hr_rolls.clear();
        self.new_incar_release.clear();
        self.new_prep.clear();
    }

    fn discard_all(&mut self, id: AgentId) {
        self.new_infections.discard(id);
        self.new_diagnosis.discard(id);
        self.new_hr_rolls.discard(id);
        self.new_incar_release.discard(id);
        self.new_prep.discard(id);
    }
}

// ── Population ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Population {
    agents: Vec<Option<Agent>>,
    all:    AgentSet,
    flags:  FlagSets,
    step:   StepSets,
}

impl Default for Population {
    fn default() -> Self {
        Self::new()
    }
}

fn slot_mut(agents: &mut [Option<Agent>], id: AgentId) -> AgentResult<&mut Agent> {
    agents
        .get_mut(id.index())
        .and_then(Option::as_mut)
        .ok_or(AgentError::AgentNotFound(id))
}

impl Population {
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
            all:    AgentSet::stratified("All"),
            flags:  FlagSets::new(),
            step:   StepSets::new(),
        }
    }

    // ── Ownership ─────────────────────────────────────────────────────────

    /// Take ownership of `agent`, placing it at slot `agent.id()` and in
    /// every set its flags call for.
    pub fn insert(&mut self, agent: Agent) -> AgentResult<AgentId> {
        let id = agent.id();
        let i = id.index();
        if i >= self.agents.len() {
            self.agents.resize_with(i + 1, || None);
        }
        if self.agents[i].is_some() {
            return Err(AgentError::SlotOccupied(id));
        }

        self.all.add(&agent);
        let f = &mut self.flags;
        for (on, set) in [
            (agent.hiv, &mut f.hiv),
            (agent.aids, &mut f.aids),
            (agent.tested, &mut f.tested),
            (agent.haart, &mut f.haart),
            (agent.prep, &mut f.prep),
            (agent.incar, &mut f.incar),
            (agent.hr, &mut f.high_risk),
        ] {
            if on {
                set.add(&agent);
            }
        }
        self.agents[i] = Some(agent);
        Ok(id)
    }

    /// Remove and return an agent.  Its relationships must already have
    /// been terminated.
    pub fn remove(&mut self, id: AgentId) -> AgentResult<Agent> {
        let agent = self.agent(id)?;
        if !agent.partners.is_empty() || !agent.relationships.is_empty() {
            return Err(AgentError::StillPartnered(id));
        }
        self.all.remove(id)?;
        self.flags.discard_all(id);
        self.step.discard_all(id);
        self.agents[id.index()]
            .take()
            .ok_or(AgentError::AgentNotFound(id))
    }

    /// Generation the next agent placed in `id`'s slot should carry.
    pub fn next_generation(&self, id: AgentId) -> u32 {
        self.get(id).map_or(0, |a| a.generation() + 1)
    }

    // ── Access ────────────────────────────────────────────────────────────

    #[inline]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index()).and_then(Option::as_ref)
    }

    pub fn agent(&self, id: AgentId) -> AgentResult<&Agent> {
        self.get(id).ok_or(AgentError::AgentNotFound(id))
    }

    pub fn agent_mut(&mut self, id: AgentId) -> AgentResult<&mut Agent> {
        slot_mut(&mut self.agents, id)
    }

    /// Live agents in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.iter().flatten()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.all.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Number of slots ever allocated (an upper bound on live ids).
    pub fn capacity(&self) -> usize {
        self.agents.len()
    }

    pub fn all(&self) -> &AgentSet {
        &self.all
    }

    pub fn flags(&self) -> &FlagSets {
        &self.flags
    }

    pub fn step(&self) -> &StepSets {
        &self.step
    }

    pub fn clear_step_sets(&mut self) {
        self.step.clear();
    }

    // ── Flag setters ──────────────────────────────────────────────────────

    /// Infect `id`: sets `hiv`, `hiv_time = 1`, records a new infection, and
    /// clears PrEP.
    pub fn infect(&mut self, id: AgentId) -> AgentResult<()> {
        let agent = slot_mut(&mut self.agents, id)?;
        if agent.hiv {
            return Err(AgentError::Invariant(format!("{id} is already HIV+")));
        }
        agent.hiv = true;
        agent.hiv_time = 1;
        if agent.prep {
            agent.prep = false;
            agent.prep_load = 0.0;
            agent.prep_time = 0;
            self.flags.prep.discard(id);
        }
        self.flags.hiv.add(agent);
        self.step.new_infections.add(agent);
        Ok(())
    }

    pub fn set_aids(&mut self, id: AgentId) -> AgentResult<()> {
        let agent = slot_mut(&mut self.agents, id)?;
        if !agent.hiv {
            return Err(AgentError::Invariant(format!("{id} cannot progress to AIDS while HIV−")));
        }
        agent.aids = true;
        self.flags.aids.add(agent);
        Ok(())
    }

    /// Mark an HIV+ agent as diagnosed.  Returns `false` if it already was.
    pub fn diagnose(&mut self, id: AgentId) -> AgentResult<bool> {
        let agent = slot_mut(&mut self.agents, id)?;
        if agent.tested {
            return Ok(false);
        }
        if !agent.hiv {
            return Err(AgentError::Invariant(format!("{id} diagnosed while HIV−")));
        }
        agent.tested = true;
        self.flags.tested.add(agent);
        self.step.new_diagnosis.add(agent);
        Ok(true)
    }

    /// Start HAART at `adherence`, or stop it (`None`).
    pub fn set_haart(&mut self, id: AgentId, adherence: Option<u8>) -> AgentResult<()> {
        let agent = slot_mut(&mut self.agents, id)?;
        match adherence {
            Some(adh) => {
                if !(agent.hiv && agent.tested) {
                    return Err(AgentError::Invariant(format!(
                        "{id} put on HAART without a positive diagnosis"
                    )));
                }
                agent.haart = true;
                agent.haart_adh = adh.min(5);
                self.flags.haart.add(agent);
            }
            None => {
                agent.haart = false;
                agent.haart_adh = 0;
                self.flags.haart.discard(id);
            }
        }
        Ok(())
    }

    /// Start PrEP (recorded in `step().new_prep`) or stop it.  Stopping
    /// clears the injectable load and dose clock.
    pub fn set_prep(&mut self, id: AgentId, on: bool) -> AgentResult<()> {
        let agent = slot_mut(&mut self.agents, id)?;
        if on {
            if agent.hiv {
                return Err(AgentError::Invariant(format!("{id} put on PrEP while HIV+")));
            }
            agent.prep = true;
            if self.flags.prep.add(agent) {
                self.step.new_prep.add(agent);
            }
        } else {
            agent.prep = false;
            agent.prep_load = 0.0;
            agent.prep_last_dose = 0;
            self.flags.prep.discard(id);
        }
        Ok(())
    }

    /// Incarcerate for `months` (≥ 1), or release (`None`).
    pub fn set_incar(&mut self, id: AgentId, months: Option<u32>) -> AgentResult<()> {
        let agent = slot_mut(&mut self.agents, id)?;
        match months {
            Some(m) => {
                agent.incar = true;
                agent.incar_time = m.max(1);
                self.flags.incar.add(agent);
            }
            None => {
                agent.incar = false;
                agent.incar_time = 0;
                self.flags.incar.discard(id);
            }
        }
        Ok(())
    }

    pub fn set_hr(&mut self, id: AgentId, on: bool) -> AgentResult<()> {
        let agent = slot_mut(&mut self.agents, id)?;
        agent.hr = on;
        if on {
            self.flags.high_risk.add(agent);
        } else {
            self.flags.high_risk.discard(id);
        }
        Ok(())
    }

    // ── Step events ───────────────────────────────────────────────────────

    pub fn record_hr_roll(&mut self, id: AgentId) -> AgentResult<()> {
        let agent = slot_mut(&mut self.agents, id)?;
        self.step.new_hr_rolls.add(agent);
        Ok(())
    }

    pub fn record_release(&mut self, id: AgentId) -> AgentResult<()> {
        let agent = slot_mut(&mut self.agents, id)?;
        self.step.new_incar_release.add(agent);
        Ok(())
    }

    // ── Partner lists ─────────────────────────────────────────────────────

    /// Record `rel` between `a` and `b` on both endpoints.
    pub fn link(&mut self, a: AgentId, b: AgentId, rel: RelId) -> AgentResult<()> {
        if a == b {
            return Err(AgentError::Invariant(format!("{a} cannot partner with itself")));
        }
        self.agent(b)?;
        let left = slot_mut(&mut self.agents, a)?;
        left.partners.push(b);
        left.relationships.push(rel);
        let right = slot_mut(&mut self.agents, b)?;
        right.partners.push(a);
        right.relationships.push(rel);
        Ok(())
    }

    /// Clear `rel` from both endpoints.
    pub fn unlink(&mut self, a: AgentId, b: AgentId, rel: RelId) -> AgentResult<()> {
        for (me, other) in [(a, b), (b, a)] {
            let agent = slot_mut(&mut self.agents, me)?;
            if let Some(pos) = agent.partners.iter().position(|p| *p == other) {
                agent.partners.swap_remove(pos);
            }
            if let Some(pos) = agent.relationships.iter().position(|r| *r == rel) {
                agent.relationships.swap_remove(pos);
            }
        }
        Ok(())
    }

    // ── Invariants ────────────────────────────────────────────────────────

    /// Verify flag/set agreement, flag implications, partner symmetry, and
    /// incarceration time.
    pub fn check_invariants(&self) -> AgentResult<()> {
        let fail = |msg: String| Err(AgentError::Invariant(msg));
        let f = &self.flags;

        for agent in self.iter() {
            let id = agent.id();
            if !self.all.contains(id) {
                return fail(format!("{id} missing from All"));
            }
            for (flag, set) in [
                (agent.hiv, &f.hiv),
                (agent.aids, &f.aids),
                (agent.tested, &f.tested),
                (agent.haart, &f.haart),
                (agent.prep, &f.prep),
                (agent.incar, &f.incar),
                (agent.hr, &f.high_risk),
            ] {
                if flag != set.contains(id) {
                    return fail(format!("{id}: flag/set mismatch for {}", set.name()));
                }
            }
            if agent.hiv && agent.prep {
                return fail(format!("{id} is HIV+ and on PrEP"));
            }
            if agent.aids && !agent.hiv {
                return fail(format!("{id} has AIDS without HIV"));
            }
            if agent.haart && !(agent.tested && agent.hiv) {
                return fail(format!("{id} on HAART without a diagnosis"));
            }
            if agent.incar && agent.incar_time < 1 {
                return fail(format!("{id} incarcerated with no remaining time"));
            }
            for &p in &agent.partners {
                match self.get(p) {
                    Some(other) if other.partners.contains(&id) => {}
                    _ => return fail(format!("{id} lists {p} but not vice versa")),
                }
            }
        }

        for set in [&f.hiv, &f.aids, &f.tested, &f.haart, &f.prep, &f.incar, &f.high_risk] {
            if set.iter().any(|id| self.get(id).is_none()) {
                return fail(format!("{} holds a removed agent", set.name()));
            }
        }
        Ok(())
    }
}
