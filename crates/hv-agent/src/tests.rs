//! Unit tests for hv-agent.

#[cfg(test)]
mod helpers {
    use hv_core::{AgentId, DrugType, Race, SexType};

    use crate::{Agent, Demographics};

    pub fn agent(id: u32, sex: SexType, drug: DrugType, race: Race) -> Agent {
        Agent::new(AgentId(id), Demographics {
            sex_type:  sex,
            drug_type: drug,
            race,
            age:       30,
            age_bin:   2,
        })
    }

    pub fn hm(id: u32) -> Agent {
        agent(id, SexType::Hm, DrugType::Ndu, Race::White)
    }
}

#[cfg(test)]
mod agent_set {
    use hv_core::{AgentId, DrugType, Race, SexType, SimRng};

    use super::helpers::{agent, hm};
    use crate::{AgentError, AgentSet, SetKey};

    #[test]
    fn add_is_idempotent() {
        let mut set = AgentSet::new("S");
        let a = hm(1);
        assert!(set.add(&a));
        assert!(!set.add(&a));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_non_member_is_loud() {
        let mut set = AgentSet::new("S");
        let err = set.remove(AgentId(5)).unwrap_err();
        assert!(matches!(err, AgentError::NotMember { agent: AgentId(5), .. }));
    }

    #[test]
    fn iteration_is_insertion_order() {
        let mut set = AgentSet::new("S");
        for id in [4, 1, 3, 2] {
            set.add(&hm(id));
        }
        set.discard(AgentId(1));
        let ids: Vec<u32> = set.iter().map(|a| a.0).collect();
        assert_eq!(ids, vec![4, 3, 2]);
    }

    #[test]
    fn stratified_cascade() {
        let mut set = AgentSet::stratified("All");
        set.add(&agent(0, SexType::Hf, DrugType::Idu, Race::Black));
        set.add(&agent(1, SexType::Hf, DrugType::Ndu, Race::White));
        set.add(&agent(2, SexType::Msm, DrugType::Idu, Race::White));

        assert_eq!(set.count_by(SetKey::Sex(SexType::Hf)), 2);
        assert_eq!(set.count_by(SetKey::Sex(SexType::Msm)), 1);
        assert_eq!(set.count_by(SetKey::Drug(DrugType::Idu)), 2);
        assert_eq!(set.count_by(SetKey::Race(Race::Black)), 1);
        assert_eq!(set.subset("HF").unwrap().len(), 2);

        set.remove(AgentId(0)).unwrap();
        assert_eq!(set.count_by(SetKey::Sex(SexType::Hf)), 1);
        assert_eq!(set.count_by(SetKey::Drug(DrugType::Idu)), 1);
        assert_eq!(set.count_by(SetKey::Race(Race::Black)), 0);
    }

    #[test]
    fn compaction_keeps_membership() {
        let mut set = AgentSet::new("S");
        for id in 0..200 {
            set.add(&hm(id));
        }
        for id in 0..190 {
            set.discard(AgentId(id));
        }
        assert_eq!(set.len(), 10);
        let ids: Vec<u32> = set.iter().map(|a| a.0).collect();
        assert_eq!(ids, (190..200).collect::<Vec<_>>());
        assert!(set.contains(AgentId(195)));
        set.discard(AgentId(195));
        assert!(!set.contains(AgentId(195)));
    }

    #[test]
    fn random_agent_empty_is_none() {
        let set = AgentSet::new("S");
        let mut rng = SimRng::new(0);
        assert!(set.random_agent(&mut rng).is_none());
        assert!(matches!(set.pick(&mut rng), Err(AgentError::EmptySet(_))));
    }

    #[test]
    fn random_agent_is_roughly_uniform() {
        let mut set = AgentSet::new("S");
        for id in 0..4 {
            set.add(&hm(id));
        }
        let mut rng = SimRng::new(11);
        let mut counts = [0usize; 4];
        for _ in 0..40_000 {
            counts[set.random_agent(&mut rng).unwrap().index()] += 1;
        }
        for c in counts {
            assert!((9_000..11_000).contains(&c), "count {c}");
        }
    }

    #[test]
    fn sample_small_set_returns_everyone() {
        let mut set = AgentSet::new("S");
        for id in 0..5 {
            set.add(&hm(id));
        }
        let mut rng = SimRng::new(3);
        let mut got = set.sample(&mut rng, 100);
        got.sort();
        assert_eq!(got, (0..5).map(AgentId).collect::<Vec<_>>());
    }

    #[test]
    fn sample_large_set_is_bounded() {
        let mut set = AgentSet::new("S");
        for id in 0..1_000 {
            set.add(&hm(id));
        }
        let mut rng = SimRng::new(3);
        let got = set.sample(&mut rng, 25);
        assert_eq!(got.len(), 25);
        assert!(got.iter().all(|id| set.contains(*id)));
    }
}

#[cfg(test)]
mod population {
    use hv_core::{AgentId, RelId};

    use super::helpers::hm;
    use crate::{AgentError, Population};

    fn pop_of(n: u32) -> Population {
        let mut pop = Population::new();
        for id in 0..n {
            pop.insert(hm(id)).unwrap();
        }
        pop
    }

    #[test]
    fn insert_rejects_occupied_slot() {
        let mut pop = pop_of(2);
        assert!(matches!(pop.insert(hm(1)), Err(AgentError::SlotOccupied(_))));
        assert_eq!(pop.len(), 2);
    }

    #[test]
    fn infect_updates_sets_and_clears_prep() {
        let mut pop = pop_of(1);
        let id = AgentId(0);
        pop.set_prep(id, true).unwrap();
        assert_eq!(pop.flags().prep.len(), 1);

        pop.infect(id).unwrap();
        let a = pop.agent(id).unwrap();
        assert!(a.hiv() && !a.prep());
        assert_eq!(a.hiv_time, 1);
        assert!(a.acute());
        assert!(pop.flags().hiv.contains(id));
        assert!(!pop.flags().prep.contains(id));
        assert!(pop.step().new_infections.contains(id));
        pop.check_invariants().unwrap();
    }

    #[test]
    fn prep_start_is_recorded_for_the_step() {
        let mut pop = pop_of(2);
        pop.set_prep(AgentId(0), true).unwrap();
        assert!(pop.step().new_prep.contains(AgentId(0)));

        pop.clear_step_sets();
        pop.set_prep(AgentId(0), true).unwrap();
        assert!(pop.step().new_prep.is_empty());

        pop.set_prep(AgentId(1), true).unwrap();
        pop.remove(AgentId(1)).unwrap();
        assert!(pop.step().new_prep.is_empty());
    }

    #[test]
    fn double_infection_is_an_invariant_error() {
        let mut pop = pop_of(1);
        pop.infect(AgentId(0)).unwrap();
        assert!(matches!(pop.infect(AgentId(0)), Err(AgentError::Invariant(_))));
    }

    #[test]
    fn haart_requires_diagnosis() {
        let mut pop = pop_of(1);
        let id = AgentId(0);
        pop.infect(id).unwrap();
        assert!(pop.set_haart(id, Some(5)).is_err());
        assert!(pop.diagnose(id).unwrap());
        assert!(!pop.diagnose(id).unwrap());
        pop.set_haart(id, Some(4)).unwrap();
        assert_eq!(pop.agent(id).unwrap().haart_adh, 4);
        assert_eq!(pop.flags().haart.len(), 1);
        pop.set_haart(id, None).unwrap();
        assert!(pop.flags().haart.is_empty());
        pop.check_invariants().unwrap();
    }

    #[test]
    fn prep_rejected_for_hiv_positive() {
        let mut pop = pop_of(1);
        pop.infect(AgentId(0)).unwrap();
        assert!(pop.set_prep(AgentId(0), true).is_err());
    }

    #[test]
    fn aids_requires_hiv() {
        let mut pop = pop_of(1);
        assert!(pop.set_aids(AgentId(0)).is_err());
        pop.infect(AgentId(0)).unwrap();
        pop.set_aids(AgentId(0)).unwrap();
        assert!(pop.flags().aids.contains(AgentId(0)));
    }

    #[test]
    fn incarceration_floor_is_one_month() {
        let mut pop = pop_of(1);
        pop.set_incar(AgentId(0), Some(0)).unwrap();
        assert_eq!(pop.agent(AgentId(0)).unwrap().incar_time, 1);
        pop.check_invariants().unwrap();
        pop.set_incar(AgentId(0), None).unwrap();
        assert!(pop.flags().incar.is_empty());
    }

    #[test]
    fn link_and_unlink_are_symmetric() {
        let mut pop = pop_of(3);
        let (a, b) = (AgentId(0), AgentId(1));
        pop.link(a, b, RelId(0)).unwrap();
        assert!(pop.agent(a).unwrap().has_partner(b));
        assert!(pop.agent(b).unwrap().has_partner(a));
        pop.check_invariants().unwrap();

        pop.unlink(a, b, RelId(0)).unwrap();
        assert!(pop.agent(a).unwrap().partners().is_empty());
        assert!(pop.agent(b).unwrap().relationships().is_empty());
    }

    #[test]
    fn self_link_rejected() {
        let mut pop = pop_of(1);
        assert!(pop.link(AgentId(0), AgentId(0), RelId(0)).is_err());
    }

    #[test]
    fn remove_requires_unpartnered() {
        let mut pop = pop_of(2);
        pop.link(AgentId(0), AgentId(1), RelId(0)).unwrap();
        assert!(matches!(pop.remove(AgentId(0)), Err(AgentError::StillPartnered(_))));
        pop.unlink(AgentId(0), AgentId(1), RelId(0)).unwrap();

        pop.infect(AgentId(0)).unwrap();
        let gone = pop.remove(AgentId(0)).unwrap();
        assert_eq!(gone.id(), AgentId(0));
        assert_eq!(pop.len(), 1);
        assert!(pop.flags().hiv.is_empty());
        assert!(pop.step().new_infections.is_empty());
        assert!(pop.get(AgentId(0)).is_none());
        pop.check_invariants().unwrap();
    }

    #[test]
    fn step_sets_clear() {
        let mut pop = pop_of(2);
        pop.infect(AgentId(0)).unwrap();
        pop.diagnose(AgentId(0)).unwrap();
        pop.record_hr_roll(AgentId(1)).unwrap();
        pop.record_release(AgentId(1)).unwrap();
        pop.clear_step_sets();
        let s = pop.step();
        assert!(s.new_infections.is_empty());
        assert!(s.new_diagnosis.is_empty());
        assert!(s.new_hr_rolls.is_empty());
        assert!(s.new_incar_release.is_empty());
        assert_eq!(pop.flags().hiv.len(), 1);
    }

    #[test]
    fn missing_agent_errors() {
        let mut pop = pop_of(1);
        assert!(matches!(pop.agent(AgentId(9)), Err(AgentError::AgentNotFound(_))));
        assert!(pop.infect(AgentId(9)).is_err());
    }
}

#[cfg(test)]
mod builder {
    use hv_core::{DrugType, Params, SexRole, SexType, SimRng};

    use crate::{Facility, PopulationBuilder, SetKey, draw_haart_adherence, draw_sentence};

    #[test]
    fn builds_requested_size_with_valid_invariants() {
        let params = Params::default();
        let mut rng = SimRng::new(7);
        let pop = PopulationBuilder::new(&params).size(2_000).build(&mut rng).unwrap();
        assert_eq!(pop.len(), 2_000);
        pop.check_invariants().unwrap();

        let sexes: usize = SexType::ALL
            .iter()
            .map(|s| pop.all().count_by(SetKey::Sex(*s)))
            .sum();
        assert_eq!(sexes, 2_000);
    }

    #[test]
    fn same_seed_same_population() {
        let params = Params::default();
        let a = PopulationBuilder::new(&params).size(300).build(&mut SimRng::new(1)).unwrap();
        let b = PopulationBuilder::new(&params).size(300).build(&mut SimRng::new(1)).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.demographics(), y.demographics());
            assert_eq!(x.hiv(), y.hiv());
            assert_eq!(x.mean_num_partners, y.mean_num_partners);
        }
    }

    #[test]
    fn baseline_hiv_time_in_range() {
        let mut params = Params::default();
        for demo in params.demographics.values_mut() {
            for row in demo.sex.values_mut() {
                row.hiv_prev = 1.0;
            }
            demo.idu.hiv_prev = 1.0;
        }
        let pop = PopulationBuilder::new(&params).size(500).build(&mut SimRng::new(4)).unwrap();
        assert_eq!(pop.flags().hiv.len(), 500);
        assert!(pop.iter().all(|a| (1..=42).contains(&a.hiv_time)));
        pop.check_invariants().unwrap();
    }

    #[test]
    fn roles_follow_sex_type() {
        let params = Params::default();
        let pop = PopulationBuilder::new(&params).size(1_000).build(&mut SimRng::new(9)).unwrap();
        for a in pop.iter() {
            match a.sex_type() {
                SexType::Hm => assert_eq!(a.role, SexRole::Insertive),
                SexType::Hf => assert_eq!(a.role, SexRole::Receptive),
                SexType::Msm => {}
                _ => assert_eq!(a.role, SexRole::Versatile),
            }
        }
    }

    #[test]
    fn pwid_prop_one_gives_all_idu() {
        let mut params = Params::default();
        for demo in params.demographics.values_mut() {
            demo.pwid_prop = 1.0;
        }
        let pop = PopulationBuilder::new(&params).size(200).build(&mut SimRng::new(2)).unwrap();
        assert_eq!(pop.all().count_by(SetKey::Drug(DrugType::Idu)), 200);
    }

    #[test]
    fn partner_frequency_drawn_from_bins() {
        let params = Params::default();
        let pop = PopulationBuilder::new(&params).size(1_000).build(&mut SimRng::new(5)).unwrap();
        assert!(pop.iter().all(|a| (0.0..=20.0).contains(&a.mean_num_partners)));
    }

    #[test]
    fn sentence_bounds() {
        let params = Params::default();
        let mut rng = SimRng::new(8);
        for _ in 0..5_000 {
            let (facility, months) = draw_sentence(&params, &mut rng);
            match facility {
                Facility::Jail => assert!((1..=9).contains(&months)),
                Facility::Prison => assert!((6..=60).contains(&months)),
            }
        }
    }

    #[test]
    fn full_adherence_probability_one() {
        let mut rng = SimRng::new(0);
        assert!((0..100).all(|_| draw_haart_adherence(1.0, &mut rng) == 5));
        assert!((0..100).all(|_| (1..=4).contains(&draw_haart_adherence(0.0, &mut rng))));
    }
}
