//! Population builder: samples demographics and seeds baseline status.
//!
//! # Usage
//!
//! ```rust
//! use hv_agent::PopulationBuilder;
//! use hv_core::{Params, SimRng};
//!
//! let params = Params::default();
//! let mut rng = SimRng::new(7);
//! let pop = PopulationBuilder::new(&params).size(200).build(&mut rng).unwrap();
//! assert_eq!(pop.len(), 200);
//! ```
//!
//! Draw order per agent matters (categorical draws are cumulative over the
//! configured order): race → sex behavior → drug use → age → baseline HIV
//! cascade → incarceration → partner frequency.

use hv_core::{AgentId, DrugType, HvError, Params, Race, SexRole, SexType, SimRng};

use crate::{Agent, AgentResult, Demographics, Population};

// ── Sentence draws ────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Facility {
    Jail,
    Prison,
}

/// Branch jail vs prison, then draw a sentence length in months (≥ 1).
///
/// Jail: triangular(`jail_min`, 3, `jail_max`).  Prison:
/// triangular(`prison_min`, `prison_max`/3, `prison_max`).
pub fn draw_sentence(params: &Params, rng: &mut SimRng) -> (Facility, u32) {
    let i = &params.incar;
    let (facility, months) = if rng.gen_bool(i.jail_prob) {
        let m = rng.triangular(f64::from(i.jail_min), 3.0, f64::from(i.jail_max));
        (Facility::Jail, m)
    } else {
        let max = f64::from(i.prison_max);
        let m = rng.triangular(f64::from(i.prison_min), max / 3.0, max);
        (Facility::Prison, m)
    };
    (facility, (months.round() as u32).max(1))
}

/// HAART adherence on initiation: 5 with probability `p_full`, else
/// uniform in 1..=4.
pub fn draw_haart_adherence(p_full: f64, rng: &mut SimRng) -> u8 {
    if rng.gen_bool(p_full) {
        5
    } else {
        rng.gen_range(1..=4)
    }
}

// ── PopulationBuilder ─────────────────────────────────────────────────────────

pub struct PopulationBuilder<'a> {
    params: &'a Params,
    size:   usize,
}

impl<'a> PopulationBuilder<'a> {
    /// Builder for `params.sizing.n_pop` agents.
    pub fn new(params: &'a Params) -> Self {
        Self { params, size: params.sizing.n_pop }
    }

    /// Override the population size.
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Sample every agent and cascade it into the population sets.
    pub fn build(self, rng: &mut SimRng) -> AgentResult<Population> {
        let mut pop = Population::new();
        for i in 0..self.size {
            let id = AgentId::try_from(i)
                .map_err(|_| HvError::Config(format!("population size {} too large", self.size)))?;
            pop.insert(self.new_agent(id, 0, rng)?)?;
        }
        log::info!(
            "built population of {} ({} HIV+, {} IDU, {} incarcerated)",
            pop.len(),
            pop.flags().hiv.len(),
            pop.all().count_by(crate::SetKey::Drug(DrugType::Idu)),
            pop.flags().incar.len(),
        );
        Ok(pop)
    }

    /// Draw a complete agent for slot `id`.  Also used for replacements.
    pub fn new_agent(&self, id: AgentId, generation: u32, rng: &mut SimRng) -> AgentResult<Agent> {
        let p = self.params;

        let race = self.draw_race(rng)?;
        let sex = self.draw_sex(race, rng)?;
        let demo_race = &p.demographics[&race];
        let drug = if rng.gen_bool(demo_race.pwid_prop) { DrugType::Idu } else { DrugType::Ndu };
        let (age, age_bin) = self.draw_age(rng)?;

        let mut agent = Agent::new(id, Demographics {
            sex_type:  sex,
            drug_type: drug,
            race,
            age,
            age_bin,
        })
        .with_generation(generation);

        // ── Baseline HIV cascade ──────────────────────────────────────────
        let prev = p.prevalence_row(race, sex, drug)?;
        let rates = p.row(race, sex)?;
        if rng.gen_bool(prev.hiv_prev) {
            agent.hiv = true;
            agent.hiv_time = rng.gen_range(1..=42);
            agent.aids = rng.gen_bool(prev.aids_prev);
            if rng.gen_bool(prev.tested_prev) {
                agent.tested = true;
                if rng.gen_bool(prev.haart_prev) {
                    agent.haart = true;
                    agent.haart_adh = draw_haart_adherence(rates.haart_adh, rng);
                }
            }
        }

        // ── Baseline incarceration ────────────────────────────────────────
        if rng.gen_bool(prev.incar_prev) {
            let (_, months) = draw_sentence(p, rng);
            agent.incar = true;
            agent.incar_time = months;
        }

        agent.mean_num_partners = self.draw_mean_partners(rates.mean_partners, rng);
        agent.role = self.draw_role(sex, rng);
        Ok(agent)
    }

    fn draw_race(&self, rng: &mut SimRng) -> AgentResult<Race> {
        let races: Vec<(&Race, f64)> = self
            .params
            .demographics
            .iter()
            .map(|(r, d)| (r, d.proportion))
            .collect();
        let weights: Vec<f64> = races.iter().map(|(_, w)| *w).collect();
        let i = rng
            .categorical(&weights)
            .ok_or_else(|| HvError::Config("race proportions sum to zero".into()))?;
        Ok(*races[i].0)
    }

    fn draw_sex(&self, race: Race, rng: &mut SimRng) -> AgentResult<SexType> {
        let rows = &self.params.demographics[&race].sex;
        let sexes: Vec<SexType> = rows.keys().copied().collect();
        let weights: Vec<f64> = rows.values().map(|r| r.proportion).collect();
        let i = rng
            .categorical(&weights)
            .ok_or_else(|| HvError::Config(format!("race {race}: sex proportions sum to zero")))?;
        Ok(sexes[i])
    }

    fn draw_age(&self, rng: &mut SimRng) -> AgentResult<(u32, u8)> {
        let bins = &self.params.age_bins;
        let weights: Vec<f64> = bins.iter().map(|b| b.prob).collect();
        let i = rng
            .categorical(&weights)
            .ok_or_else(|| HvError::Config("age bin probabilities sum to zero".into()))?;
        let bin = &bins[i];
        Ok((rng.gen_range(bin.min_age..=bin.max_age), (i + 1) as u8))
    }

    fn draw_mean_partners(&self, row_mean: f64, rng: &mut SimRng) -> f64 {
        let bins = &self.params.partnership.frequency_bins;
        if bins.is_empty() {
            return f64::from(rng.poisson(row_mean));
        }
        let weights: Vec<f64> = bins.iter().map(|b| b.weight).collect();
        match rng.categorical(&weights) {
            Some(i) => f64::from(rng.gen_range(bins[i].min..=bins[i].max)),
            None => 0.0,
        }
    }

    fn draw_role(&self, sex: SexType, rng: &mut SimRng) -> SexRole {
        match sex {
            SexType::Hm => SexRole::Insertive,
            SexType::Hf => SexRole::Receptive,
            SexType::Msm => {
                let d = &self.params.behavior.msm_role_dist;
                match rng.categorical(&[d.insertive, d.receptive, d.versatile]) {
                    Some(0) => SexRole::Insertive,
                    Some(1) => SexRole::Receptive,
                    _ => SexRole::Versatile,
                }
            }
            _ => SexRole::Versatile,
        }
    }
}
