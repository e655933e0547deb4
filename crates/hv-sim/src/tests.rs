//! Integration tests for hv-sim.

use hv_agent::{Agent, Demographics, Population};
use hv_core::{
    AdherenceTable, AgentId, DrugType, Features, Params, Race, Seeds, SexType, Tick,
};
use hv_network::{RelKind, RelationshipStore};

use crate::{Sim, SimBuilder, SimObserver, StepReport};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn agent(id: u32, sex: SexType) -> Agent {
    Agent::new(AgentId(id), Demographics {
        sex_type:  sex,
        drug_type: DrugType::Ndu,
        race:      Race::White,
        age:       30,
        age_bin:   2,
    })
}

/// Everything but partnerships, transmission, and progression switched off.
fn quiet_params(tmax: u32) -> Params {
    let mut p = Params::default();
    p.sizing.tmax = tmax;
    p.sizing.burn_duration = 0;
    p.features = Features {
        incar:           false,
        prep:            false,
        high_risk:       false,
        art:             false,
        die_and_replace: false,
        static_n:        true,
        agent_zero:      false,
        condom_bins:     false,
    };
    for demo in p.demographics.values_mut() {
        for row in demo.sex.values_mut() {
            row.unsafe_sex = 1.0;
            row.num_sex_acts = 5.0;
            row.test_freq = 0.0;
        }
    }
    p
}

/// HM donor (agent 0, HIV+ for `hiv_time` months) and HF susceptible
/// (agent 1) in a 48-month relationship; per-act probability `q`.
fn dyad(q: f64, hiv_time: u32, tmax: u32) -> (Params, Population, RelationshipStore) {
    let mut p = quiet_params(tmax);
    p.transmission.sex.insert(SexType::Hm, AdherenceTable::uniform(q));

    let mut pop = Population::new();
    pop.insert(agent(0, SexType::Hm)).unwrap();
    pop.insert(agent(1, SexType::Hf)).unwrap();
    pop.infect(AgentId(0)).unwrap();
    pop.agent_mut(AgentId(0)).unwrap().hiv_time = hiv_time;
    pop.clear_step_sets();

    let mut rels = RelationshipStore::new();
    rels.create(&mut pop, AgentId(0), AgentId(1), RelKind::Sexual, 48).unwrap();
    (p, pop, rels)
}

fn seeds(r: u64) -> Seeds {
    Seeds { run_seed: 100 + r, pop_seed: 200 + r, net_seed: 300 + r }
}

fn dyad_sim(p: &Params, pop: &Population, rels: &RelationshipStore, r: u64) -> Sim {
    SimBuilder::new(p.clone())
        .seeds(seeds(r))
        .population(pop.clone())
        .relationships(rels.clone())
        .build()
        .unwrap()
}

/// Counts observer callbacks.
#[derive(Default)]
struct Counter {
    burn_ends: usize,
    steps:     Vec<Tick>,
    end:       Option<Tick>,
}

impl SimObserver for Counter {
    fn on_burn_end(&mut self, _pop: &Population, _rels: &RelationshipStore) {
        self.burn_ends += 1;
    }

    fn on_step(&mut self, report: &StepReport<'_>) {
        self.steps.push(report.t);
    }

    fn on_sim_end(&mut self, final_tick: Tick) {
        self.end = Some(final_tick);
    }
}

// ── SimBuilder ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn builds_population_of_n_pop() {
        let mut p = Params::default();
        p.sizing.n_pop = 250;
        let sim = SimBuilder::new(p).build().unwrap();
        assert_eq!(sim.pop.len(), 250);
        assert_eq!(sim.tick(), Tick::ZERO);
        sim.verify().unwrap();
    }

    #[test]
    fn seeds_override_params() {
        let sim = SimBuilder::new(Params::default()).seeds(seeds(7)).build().unwrap();
        assert_eq!(sim.params.seeds.run_seed, 107);
        assert_eq!(sim.params.seeds.net_seed, 307);
    }

    #[test]
    fn invalid_params_rejected() {
        let mut p = Params::default();
        p.age_bins.pop();
        assert!(SimBuilder::new(p).build().is_err());
    }

    #[test]
    fn mismatched_relationships_rejected() {
        let (p, _, rels) = dyad(0.01, 12, 1);
        let mut other = Population::new();
        other.insert(agent(0, SexType::Hm)).unwrap();
        other.insert(agent(1, SexType::Hf)).unwrap();
        let result = SimBuilder::new(p).population(other).relationships(rels).build();
        assert!(matches!(result, Err(crate::SimError::Config(_))));
    }

    #[test]
    fn agent_zero_is_a_seeded_idu() {
        let mut p = Params::default();
        p.sizing.n_pop = 400;
        p.features.agent_zero = true;
        for demo in p.demographics.values_mut() {
            demo.pwid_prop = 0.3;
            demo.idu.hiv_prev = 0.0;
            for row in demo.sex.values_mut() {
                row.hiv_prev = 0.0;
            }
        }
        let sim = SimBuilder::new(p).build().unwrap();
        assert_eq!(sim.pop.flags().hiv.len(), 1);
        let zero = sim.pop.flags().hiv.iter().next().unwrap();
        let agent = sim.pop.agent(zero).unwrap();
        assert!(agent.is_idu());
        assert!((1..=crate::AGENT_ZERO_PARTNERS).contains(&agent.partners().len()));
        assert_eq!(sim.rels.len(), agent.partners().len());
        // One month is spent by the first dissolve pass; every drawn
        // duration of at least one month must survive it.
        assert!(sim.rels.iter().all(|r| r.duration >= 2));
        sim.verify().unwrap();
    }
}

// ── Run loop ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod run_tests {
    use super::*;
    use crate::{NoopObserver, SummaryRecorder};

    #[test]
    fn observer_sees_every_step() {
        let mut p = Params::default();
        p.sizing.n_pop = 200;
        p.sizing.tmax = 6;
        p.sizing.burn_duration = 3;
        let mut sim = SimBuilder::new(p).build().unwrap();
        let mut counter = Counter::default();
        sim.run(&mut counter).unwrap();
        assert_eq!(counter.burn_ends, 1);
        assert_eq!(counter.steps, (1..=6).map(Tick).collect::<Vec<_>>());
        assert_eq!(counter.end, Some(Tick(6)));
        assert_eq!(sim.tick(), Tick(6));
    }

    #[test]
    fn step_sets_cleared_after_each_step() {
        let mut p = Params::default();
        p.sizing.n_pop = 300;
        let mut sim = SimBuilder::new(p).build().unwrap();
        sim.run_steps(5, &mut NoopObserver).unwrap();
        let s = sim.pop.step();
        assert!(s.new_infections.is_empty());
        assert!(s.new_diagnosis.is_empty());
        assert!(s.new_hr_rolls.is_empty());
        assert!(s.new_incar_release.is_empty());
        assert!(s.new_prep.is_empty());
    }

    #[test]
    fn diagnosis_counts_even_when_the_agent_dies() {
        let (mut p, pop, rels) = dyad(0.0, 12, 1);
        p.features.die_and_replace = true;
        p.calibration.mortality = 1e9;
        for demo in p.demographics.values_mut() {
            for row in demo.sex.values_mut() {
                row.test_freq = 1.0;
            }
        }
        let mut sim = dyad_sim(&p, &pop, &rels, 0);
        sim.run_steps(1, &mut NoopObserver).unwrap();
        assert_eq!(sim.deaths().total, 2);
        assert_eq!(sim.total_diagnoses(), 1);
    }

    #[test]
    fn allcomers_enrollment_is_spread_over_the_population() {
        let mut p = quiet_params(1);
        p.features.prep = true;
        p.prep.start_t = 0;
        p.prep.target = 0.1;
        let mut pop = Population::new();
        for i in 0..200 {
            pop.insert(agent(i, SexType::Hf)).unwrap();
        }
        let mut sim = SimBuilder::new(p).seeds(seeds(0)).population(pop).build().unwrap();
        sim.run_steps(1, &mut NoopObserver).unwrap();

        let on: Vec<u32> = sim.pop.flags().prep.iter().map(|id| id.0).collect();
        assert_eq!(on.len(), 20);
        // Slot order would put every enrollee below 20.
        let late = on.iter().filter(|&&i| i >= 20).count();
        assert!(late >= 10, "enrolled = {on:?}");
    }

    #[test]
    fn invariants_hold_with_every_intervention() {
        let mut p = Params::default();
        p.sizing.n_pop = 500;
        p.sizing.burn_duration = 6;
        p.features.prep = true;
        p.prep.target = 0.2;
        let mut sim = SimBuilder::new(p).build().unwrap();
        sim.burn(&mut NoopObserver).unwrap();
        sim.verify().unwrap();
        for _ in 0..24 {
            sim.run_steps(1, &mut NoopObserver).unwrap();
            sim.verify().unwrap();
        }
        assert!(!sim.pop.flags().prep.is_empty());
    }

    #[test]
    fn clinical_prep_fills_from_strata() {
        let mut p = Params::default();
        p.sizing.n_pop = 500;
        p.sizing.burn_duration = 0;
        p.features.prep = true;
        p.prep.target = 0.05;
        p.prep.target_model = hv_core::PrepTargetModel::Clinical;
        let mut sim = SimBuilder::new(p).build().unwrap();
        let mut recorder = SummaryRecorder::new();
        sim.run_steps(1, &mut recorder).unwrap();
        assert!(recorder.last().unwrap().prep > 0);
        sim.verify().unwrap();
    }

    #[test]
    fn treatment_trigger_enrolls_injectors_once() {
        let mut p = Params::default();
        p.sizing.n_pop = 300;
        p.sizing.burn_duration = 0;
        p.treatment.init_treatment = 0;
        p.treatment.treatment_cov = 1.0;
        for demo in p.demographics.values_mut() {
            demo.pwid_prop = 0.4;
        }
        let mut sim = SimBuilder::new(p).build().unwrap();
        assert!(!sim.treatment_enabled());
        sim.run_steps(1, &mut NoopObserver).unwrap();
        assert!(sim.treatment_enabled());
        let idu: Vec<_> = sim.pop.iter().filter(|a| a.is_idu()).collect();
        assert!(!idu.is_empty());
        assert!(idu.iter().all(|a| a.sne));
    }

    #[test]
    fn treatment_trigger_waits_for_diagnoses() {
        let mut p = Params::default();
        p.sizing.n_pop = 200;
        p.sizing.burn_duration = 0;
        let mut sim = SimBuilder::new(p).build().unwrap();
        sim.run_steps(3, &mut NoopObserver).unwrap();
        assert!(!sim.treatment_enabled());
        assert!(sim.pop.iter().all(|a| !a.sne));
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scenarios {
    use super::*;
    use crate::NoopObserver;

    #[test]
    fn isolated_dyad_infects_within_relationship() {
        let (p, pop, rels) = dyad(0.05, 12, 48);
        let replicates = 200;
        let mut infected = 0;
        for r in 0..replicates {
            let mut sim = dyad_sim(&p, &pop, &rels, r);
            sim.run(&mut NoopObserver).unwrap();
            if sim.pop.agent(AgentId(1)).unwrap().hiv() {
                infected += 1;
            }
        }
        let share = infected as f64 / replicates as f64;
        assert!(share >= 0.99, "share = {share}");
    }

    #[test]
    fn adherent_oral_prep_blocks_transmission() {
        let (mut p, mut pop, rels) = dyad(0.05, 12, 48);
        p.prep.adh_efficacy = 1.0;
        pop.set_prep(AgentId(1), true).unwrap();
        pop.agent_mut(AgentId(1)).unwrap().prep_adh = 1;

        for r in 0..100 {
            let mut sim = dyad_sim(&p, &pop, &rels, r);
            sim.run(&mut NoopObserver).unwrap();
            assert!(!sim.pop.agent(AgentId(1)).unwrap().hiv(), "replicate {r}");
        }
    }

    #[test]
    fn acute_donor_multiplies_per_act_risk() {
        let q = 0.01;
        let (mut p, pop, rels) = dyad(q, 1, 1);
        p.calibration.acute_scaling = 10.0;

        let replicates = 4000;
        let mut infected = 0;
        for r in 0..replicates {
            let mut sim = dyad_sim(&p, &pop, &rels, r);
            sim.run(&mut NoopObserver).unwrap();
            if sim.pop.agent(AgentId(1)).unwrap().hiv() {
                infected += 1;
            }
        }
        // Poisson(5) acts, each infecting with 10q: 1 − exp(−5 · 10q).
        let expected = 1.0 - (-5.0 * 10.0 * q).exp();
        let share = infected as f64 / replicates as f64;
        assert!((share - expected).abs() < 0.03, "share = {share}, expected = {expected}");
    }

    #[test]
    fn die_and_replace_conserves_population() {
        let mut p = Params::default();
        p.sizing.n_pop = 1000;
        p.sizing.tmax = 120;
        p.sizing.burn_duration = 0;
        p.calibration.mortality = 5.0;
        let mut sim = SimBuilder::new(p).build().unwrap();
        let mut died = 0;
        for t in 1..=120 {
            sim.run_steps(1, &mut NoopObserver).unwrap();
            assert_eq!(sim.pop.len(), 1000, "step {t}");
            assert_eq!(sim.pop.all().len(), 1000, "step {t}");
            died += sim.deaths().total;
            if t % 12 == 0 {
                sim.verify().unwrap();
            }
        }
        assert!(died > 0);
        assert!(sim.pop.iter().any(|a| a.generation() > 0));
    }

    #[test]
    fn hiv_status_never_reverts_between_steps() {
        use std::collections::BTreeMap;

        let mut p = Params::default();
        p.sizing.n_pop = 500;
        p.sizing.burn_duration = 0;
        p.calibration.mortality = 5.0;
        p.features.prep = true;
        for demo in p.demographics.values_mut() {
            demo.idu.hiv_prev = 0.1;
            for row in demo.sex.values_mut() {
                row.hiv_prev = 0.1;
            }
        }
        let mut sim = SimBuilder::new(p).seeds(seeds(3)).build().unwrap();

        // Keyed by slot and generation so replacements are not compared.
        let status = |sim: &Sim| -> BTreeMap<(AgentId, u32), (bool, u32)> {
            sim.pop
                .iter()
                .map(|a| ((a.id(), a.generation()), (a.hiv(), a.hiv_time)))
                .collect()
        };

        let mut prev = status(&sim);
        let mut followed = 0;
        for t in 1..=36 {
            sim.run_steps(1, &mut NoopObserver).unwrap();
            let cur = status(&sim);
            for (key, &(was_hiv, was_time)) in &prev {
                let Some(&(hiv, time)) = cur.get(key) else { continue };
                if was_hiv {
                    assert!(hiv, "step {t}: {key:?} lost HIV status");
                    assert_eq!(time, was_time + 1, "step {t}: {key:?}");
                    followed += 1;
                } else if hiv {
                    assert_eq!(time, 1, "step {t}: {key:?} infected with hiv_time {time}");
                }
            }
            prev = cur;
        }
        assert!(followed > 0);
    }

    #[test]
    fn identical_seeds_give_identical_counts() {
        use crate::SummaryRecorder;

        let mut p = Params::default();
        p.sizing.n_pop = 300;
        p.sizing.tmax = 24;
        p.sizing.burn_duration = 6;
        p.features.prep = true;

        let run = |s: Seeds| {
            let mut recorder = SummaryRecorder::new();
            SimBuilder::new(p.clone()).seeds(s).build().unwrap().run(&mut recorder).unwrap();
            recorder.steps
        };
        let a = run(seeds(1));
        let b = run(seeds(1));
        assert_eq!(a.len(), 24);
        assert_eq!(a, b);

        let c = run(Seeds { pop_seed: 999, ..seeds(1) });
        assert_ne!(a, c);
    }
}

// ── Replicates ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod replicate_tests {
    use super::*;
    use crate::{SummaryRecorder, replicate_seeds, run_replicates};

    #[test]
    fn replicate_seeds_offset_each_stream() {
        let s = replicate_seeds(&seeds(0), 3);
        assert_eq!((s.run_seed, s.pop_seed, s.net_seed), (103, 203, 303));
    }

    #[test]
    fn replicate_zero_matches_a_single_run() {
        let mut p = Params::default();
        p.sizing.n_pop = 200;
        p.sizing.tmax = 12;
        p.sizing.burn_duration = 2;
        p.seeds = seeds(0);

        let results = run_replicates(&p, 3, |_| SummaryRecorder::new());
        assert_eq!(results.len(), 3);
        let recorders: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
        for rec in &recorders {
            assert_eq!(rec.steps.len(), 12);
        }

        let mut single = SummaryRecorder::new();
        SimBuilder::new(p).build().unwrap().run(&mut single).unwrap();
        assert_eq!(recorders[0].steps, single.steps);
    }
}
