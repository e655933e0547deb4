//! Reporter hook and per-step summaries.

use hv_agent::{AgentSet, Population, StepSets};
use hv_core::Tick;
use hv_epi::{DeathCounts, TransmissionStats};
use hv_network::{PartnershipStats, RelationshipStore};

/// Read-only view handed to [`SimObserver::on_step`].
///
/// The step sets hold this step's events; they are cleared right after the
/// observer returns.  `deaths` is the accounting of the most recent
/// die-and-replace pass, which ran at the end of the previous step.
pub struct StepReport<'a> {
    pub t:            Tick,
    pub pop:          &'a Population,
    pub rels:         &'a RelationshipStore,
    pub deaths:       &'a DeathCounts,
    pub partnerships: PartnershipStats,
    pub transmission: TransmissionStats,
}

impl<'a> StepReport<'a> {
    #[inline]
    pub fn all(&self) -> &AgentSet {
        self.pop.all()
    }

    #[inline]
    pub fn step_sets(&self) -> &StepSets {
        self.pop.step()
    }

    pub fn summary(&self) -> StepSummary {
        let f = self.pop.flags();
        let s = self.pop.step();
        StepSummary {
            t:                 self.t,
            n_pop:             self.pop.len(),
            hiv:               f.hiv.len(),
            aids:              f.aids.len(),
            tested:            f.tested.len(),
            haart:             f.haart.len(),
            prep:              f.prep.len(),
            incar:             f.incar.len(),
            high_risk:         f.high_risk.len(),
            new_infections:    s.new_infections.len(),
            new_diagnosis:     s.new_diagnosis.len(),
            new_hr_rolls:      s.new_hr_rolls.len(),
            new_incar_release: s.new_incar_release.len(),
            deaths:            self.deaths.total,
            relationships:     self.rels.len(),
            formed:            self.partnerships.formed,
            dissolved:         self.partnerships.dissolved,
        }
    }
}

/// Headline counts for one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepSummary {
    pub t:                 Tick,
    pub n_pop:             usize,
    pub hiv:               usize,
    pub aids:              usize,
    pub tested:            usize,
    pub haart:             usize,
    pub prep:              usize,
    pub incar:             usize,
    pub high_risk:         usize,
    pub new_infections:    usize,
    pub new_diagnosis:     usize,
    pub new_hr_rolls:      usize,
    pub new_incar_release: usize,
    pub deaths:            usize,
    pub relationships:     usize,
    pub formed:            usize,
    pub dissolved:         usize,
}

/// Callbacks invoked by [`Sim::run`][crate::Sim::run].
///
/// All methods have default no-op implementations.
pub trait SimObserver {
    /// Called once after burn-in, before the first main step.
    fn on_burn_end(&mut self, _pop: &Population, _rels: &RelationshipStore) {}

    /// Called once per main step, after the per-agent phase.
    fn on_step(&mut self, _report: &StepReport<'_>) {}

    /// Called once after the final step completes.
    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

/// Collects a [`StepSummary`] per step.
#[derive(Default, Debug)]
pub struct SummaryRecorder {
    pub steps: Vec<StepSummary>,
}

impl SummaryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&StepSummary> {
        self.steps.last()
    }
}

impl SimObserver for SummaryRecorder {
    fn on_step(&mut self, report: &StepReport<'_>) {
        self.steps.push(report.summary());
    }
}

impl<O: SimObserver + ?Sized> SimObserver for &mut O {
    fn on_burn_end(&mut self, pop: &Population, rels: &RelationshipStore) {
        (**self).on_burn_end(pop, rels);
    }

    fn on_step(&mut self, report: &StepReport<'_>) {
        (**self).on_step(report);
    }

    fn on_sim_end(&mut self, final_tick: Tick) {
        (**self).on_sim_end(final_tick);
    }
}
