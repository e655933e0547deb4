//! Unit tests for hv-network.

#[cfg(test)]
mod helpers {
    use hv_agent::{Agent, Demographics, Population};
    use hv_core::{AgentId, DrugType, Race, SexType};

    pub fn agent(id: u32, sex: SexType, drug: DrugType) -> Agent {
        Agent::new(AgentId(id), Demographics {
            sex_type:  sex,
            drug_type: drug,
            race:      Race::White,
            age:       30,
            age_bin:   2,
        })
    }

    /// Population of the given (sex, drug) pairs, ids in order.
    pub fn pop_of(spec: &[(SexType, DrugType)]) -> Population {
        let mut pop = Population::new();
        for (i, (sex, drug)) in spec.iter().enumerate() {
            pop.insert(agent(i as u32, *sex, *drug)).unwrap();
        }
        pop
    }
}

#[cfg(test)]
mod relationship {
    use hv_core::{AgentId, RelId};

    use crate::{RelKind, Relationship};

    #[test]
    fn progress_counts_down_to_zero() {
        let mut rel = Relationship::new(RelId(0), AgentId(0), AgentId(1), RelKind::Sexual, true, 2);
        assert!(!rel.progress());
        assert!(rel.progress());
        assert!(rel.progress());
        assert_eq!(rel.duration, 0);
    }

    #[test]
    fn other_endpoint() {
        let rel = Relationship::new(RelId(0), AgentId(3), AgentId(8), RelKind::Needle, false, 5);
        assert_eq!(rel.other(AgentId(3)), Some(AgentId(8)));
        assert_eq!(rel.other(AgentId(8)), Some(AgentId(3)));
        assert_eq!(rel.other(AgentId(1)), None);
    }

    #[test]
    fn act_bands() {
        let mut rel = Relationship::new(RelId(0), AgentId(0), AgentId(1), RelKind::Sexual, true, 5);
        let bands: Vec<usize> = [0, 1, 2, 9, 10, 500]
            .into_iter()
            .map(|n| {
                rel.unsafe_acts = n;
                rel.act_band()
            })
            .collect();
        assert_eq!(bands, vec![0, 1, 2, 2, 3, 3]);
    }
}

#[cfg(test)]
mod store {
    use hv_core::{AgentId, DrugType, RelId, SexType};

    use super::helpers::pop_of;
    use crate::{NetworkError, RelKind, RelationshipStore};

    use DrugType::*;
    use SexType::*;

    #[test]
    fn create_links_both_endpoints() {
        let mut pop = pop_of(&[(Hm, Ndu), (Hf, Ndu)]);
        let mut rels = RelationshipStore::new();
        let id = rels.create(&mut pop, AgentId(0), AgentId(1), RelKind::Sexual, 12).unwrap();

        assert_eq!(rels.len(), 1);
        assert!(rels.get(id).unwrap().sex_possible());
        assert_eq!(pop.agent(AgentId(0)).unwrap().relationships(), &[id]);
        assert_eq!(pop.agent(AgentId(1)).unwrap().partners(), &[AgentId(0)]);
        rels.check_consistency(&pop).unwrap();
        pop.check_invariants().unwrap();
    }

    #[test]
    fn duplicate_and_self_partnerships_rejected() {
        let mut pop = pop_of(&[(Hm, Ndu), (Hf, Ndu)]);
        let mut rels = RelationshipStore::new();
        rels.create(&mut pop, AgentId(0), AgentId(1), RelKind::Sexual, 12).unwrap();
        assert!(matches!(
            rels.create(&mut pop, AgentId(1), AgentId(0), RelKind::Sexual, 3),
            Err(NetworkError::AlreadyPartnered { .. })
        ));
        assert!(matches!(
            rels.create(&mut pop, AgentId(0), AgentId(0), RelKind::Sexual, 3),
            Err(NetworkError::SelfPartnership(_))
        ));
    }

    #[test]
    fn incompatible_sexual_relationship_rejected() {
        let mut pop = pop_of(&[(Hm, Idu), (Hm, Idu)]);
        let mut rels = RelationshipStore::new();
        assert!(matches!(
            rels.create(&mut pop, AgentId(0), AgentId(1), RelKind::Sexual, 3),
            Err(NetworkError::IncompatibleSex { .. })
        ));
        let id = rels.create(&mut pop, AgentId(0), AgentId(1), RelKind::Needle, 3).unwrap();
        assert!(!rels.get(id).unwrap().sex_possible());
        assert!(pop.agent(AgentId(0)).unwrap().has_partner(AgentId(1)));
    }

    #[test]
    fn terminate_clears_endpoints_and_reuses_slot() {
        let mut pop = pop_of(&[(Hm, Ndu), (Hf, Ndu), (Hf, Ndu)]);
        let mut rels = RelationshipStore::new();
        let first = rels.create(&mut pop, AgentId(0), AgentId(1), RelKind::Sexual, 12).unwrap();
        rels.create(&mut pop, AgentId(0), AgentId(2), RelKind::Sexual, 12).unwrap();

        let gone = rels.terminate(&mut pop, first).unwrap();
        assert_eq!(gone.endpoints(), (AgentId(0), AgentId(1)));
        assert!(pop.agent(AgentId(1)).unwrap().partners().is_empty());
        assert_eq!(pop.agent(AgentId(0)).unwrap().partners(), &[AgentId(2)]);
        assert!(matches!(
            rels.terminate(&mut pop, first),
            Err(NetworkError::RelationshipNotFound(_))
        ));

        let reused = rels.create(&mut pop, AgentId(1), AgentId(0), RelKind::Sexual, 1).unwrap();
        assert_eq!(reused, first);
        rels.check_consistency(&pop).unwrap();
    }

    #[test]
    fn terminate_all_for_agent() {
        let mut pop = pop_of(&[(Hm, Ndu), (Hf, Ndu), (Hf, Ndu), (Hm, Ndu)]);
        let mut rels = RelationshipStore::new();
        rels.create(&mut pop, AgentId(0), AgentId(1), RelKind::Sexual, 12).unwrap();
        rels.create(&mut pop, AgentId(0), AgentId(2), RelKind::Sexual, 12).unwrap();
        rels.create(&mut pop, AgentId(3), AgentId(2), RelKind::Sexual, 12).unwrap();

        assert_eq!(rels.terminate_all_for(&mut pop, AgentId(0)).unwrap(), 2);
        assert_eq!(rels.len(), 1);
        assert!(pop.agent(AgentId(0)).unwrap().partners().is_empty());
        rels.check_consistency(&pop).unwrap();
        pop.remove(AgentId(0)).unwrap();
        rels.check_consistency(&pop).unwrap();
    }

    #[test]
    fn edge_list_orders_endpoints() {
        let mut pop = pop_of(&[(Hm, Ndu), (Hf, Ndu)]);
        let mut rels = RelationshipStore::new();
        rels.create(&mut pop, AgentId(1), AgentId(0), RelKind::Sexual, 12).unwrap();
        assert_eq!(rels.edge_list(), vec![(AgentId(0), AgentId(1))]);
        assert_eq!(rels.snapshot(), vec![RelId(0)]);
    }

    #[test]
    fn consistency_detects_dangling_partner_list() {
        let mut pop = pop_of(&[(Hm, Ndu), (Hf, Ndu)]);
        let rels = RelationshipStore::new();
        pop.link(AgentId(0), AgentId(1), RelId(7)).unwrap();
        assert!(matches!(rels.check_consistency(&pop), Err(NetworkError::Inconsistent(_))));
    }
}

#[cfg(test)]
mod graph {
    use hv_core::{AgentId, DrugType, SexType};

    use super::helpers::pop_of;
    use crate::{Components, RelKind, RelationshipStore};

    #[test]
    fn components_cover_every_agent() {
        use DrugType::Ndu;
        use SexType::*;
        let mut pop = pop_of(&[(Hm, Ndu), (Hf, Ndu), (Hm, Ndu), (Hf, Ndu), (Hf, Ndu)]);
        let mut rels = RelationshipStore::new();
        rels.create(&mut pop, AgentId(0), AgentId(1), RelKind::Sexual, 5).unwrap();
        rels.create(&mut pop, AgentId(2), AgentId(1), RelKind::Sexual, 5).unwrap();
        rels.create(&mut pop, AgentId(2), AgentId(3), RelKind::Sexual, 5).unwrap();

        let comps = Components::of(&pop);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps.groups()[0], vec![AgentId(0), AgentId(1), AgentId(2), AgentId(3)]);
        assert_eq!(comps.groups()[1], vec![AgentId(4)]);
        assert_eq!(comps.largest(), 4);
        assert_eq!(comps.non_trivial().count(), 1);
        assert_eq!(comps.component_of(AgentId(3)), Some(0));
        assert_eq!(comps.component_of(AgentId(4)), Some(1));
    }
}

#[cfg(test)]
mod engine {
    use hv_agent::PopulationBuilder;
    use hv_core::{AgentId, AssortMode, DrugType, Params, Race, SexType, SimRng};

    use super::helpers::pop_of;
    use crate::{PartnershipEngine, RelKind, RelationshipStore};

    use DrugType::*;
    use SexType::*;

    #[test]
    fn duration_bins_hit_configured_weights() {
        let params = Params::default();
        let engine = PartnershipEngine::new(&params);
        let bins = &params.partnership.duration_bins;
        let total: f64 = bins.iter().map(|b| b.weight).sum();
        let mut rng = SimRng::new(21);
        let n = 100_000;
        let mut counts = vec![0usize; bins.len()];
        for _ in 0..n {
            let d = engine.draw_duration(&mut rng);
            let i = bins.iter().position(|b| (b.min..=b.max).contains(&d)).unwrap();
            counts[i] += 1;
        }
        for (bin, count) in bins.iter().zip(counts) {
            let p = bin.weight / total;
            let sigma = (n as f64 * p * (1.0 - p)).sqrt();
            let diff = (count as f64 - n as f64 * p).abs();
            assert!(diff < 4.0 * sigma, "bin {}..={} off by {diff}", bin.min, bin.max);
        }
    }

    #[test]
    fn acquisition_prob_scales_for_injectors() {
        let mut params = Params::default();
        params.calibration.needle_part_scaling = 2.0;
        let engine = PartnershipEngine::new(&params);
        let mut pop = pop_of(&[(Hm, Ndu), (Hm, Idu)]);
        for id in [AgentId(0), AgentId(1)] {
            pop.agent_mut(id).unwrap().mean_num_partners = 6.0;
        }
        assert!((engine.acquisition_prob(pop.agent(AgentId(0)).unwrap()) - 0.5).abs() < 1e-12);
        assert!((engine.acquisition_prob(pop.agent(AgentId(1)).unwrap()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn get_partner_excludes_self_partners_and_incarcerated() {
        let params = Params::default();
        let engine = PartnershipEngine::new(&params);
        let mut pop = pop_of(&[(Hm, Ndu), (Hf, Ndu), (Hf, Ndu), (Hf, Ndu)]);
        let mut rels = RelationshipStore::new();
        rels.create(&mut pop, AgentId(0), AgentId(1), RelKind::Sexual, 12).unwrap();
        pop.set_incar(AgentId(2), Some(5)).unwrap();

        let mut rng = SimRng::new(4);
        for _ in 0..200 {
            let (p, kind) = engine.get_partner(&pop, AgentId(0), &mut rng).unwrap().unwrap();
            assert_eq!(p, AgentId(3));
            assert_eq!(kind, RelKind::Sexual);
        }
    }

    #[test]
    fn empty_pool_is_a_miss() {
        let params = Params::default();
        let engine = PartnershipEngine::new(&params);
        let pop = pop_of(&[(Hm, Ndu), (Hm, Ndu)]);
        let mut rng = SimRng::new(4);
        assert!(engine.get_partner(&pop, AgentId(0), &mut rng).unwrap().is_none());
    }

    #[test]
    fn injectors_mostly_find_needle_partners() {
        let params = Params::default();
        let engine = PartnershipEngine::new(&params);
        let pop = pop_of(&[(Hm, Idu), (Hm, Idu), (Hf, Ndu)]);
        let mut rng = SimRng::new(17);
        let mut needle = 0;
        for _ in 0..1_000 {
            match engine.get_partner(&pop, AgentId(0), &mut rng).unwrap() {
                Some((p, RelKind::Needle)) => {
                    assert_eq!(p, AgentId(1));
                    needle += 1;
                }
                Some((p, RelKind::Sexual)) => assert_eq!(p, AgentId(2)),
                None => panic!("a candidate always exists"),
            }
        }
        assert!((720..880).contains(&needle), "needle share {needle}");
    }

    #[test]
    fn race_assortative_matching() {
        let mut params = Params::default();
        params.assort.coeff = 1.0;
        params.assort.mode = AssortMode::Race;
        let engine = PartnershipEngine::new(&params);
        let pop = PopulationBuilder::new(&params).size(2_000).build(&mut SimRng::new(3)).unwrap();
        let mut rng = SimRng::new(5);

        let seeker = pop
            .iter()
            .find(|a| a.sex_type() == Hm && a.race() == Race::Black && !a.is_idu())
            .unwrap()
            .id();
        for _ in 0..100 {
            if let Some((p, _)) = engine.get_partner(&pop, seeker, &mut rng).unwrap() {
                assert_eq!(pop.agent(p).unwrap().race(), Race::Black);
            }
        }
    }

    #[test]
    fn dissolution_by_duration_and_incarceration() {
        let mut params = Params::default();
        params.incar.ptnr_dissolution = 1.0;
        let engine = PartnershipEngine::new(&params);
        let mut pop = pop_of(&[(Hm, Ndu), (Hf, Ndu), (Hm, Ndu), (Hf, Ndu)]);
        let mut rels = RelationshipStore::new();
        rels.create(&mut pop, AgentId(0), AgentId(1), RelKind::Sexual, 1).unwrap();
        rels.create(&mut pop, AgentId(2), AgentId(3), RelKind::Sexual, 30).unwrap();
        let mut rng = SimRng::new(0);

        assert_eq!(engine.dissolve(&mut pop, &mut rels, &mut rng).unwrap(), 1);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels.iter().next().unwrap().duration, 29);

        pop.set_incar(AgentId(3), Some(4)).unwrap();
        assert_eq!(engine.dissolve(&mut pop, &mut rels, &mut rng).unwrap(), 1);
        assert!(rels.is_empty());
        rels.check_consistency(&pop).unwrap();
    }

    #[test]
    fn step_keeps_graph_consistent() {
        let params = Params::default();
        let engine = PartnershipEngine::new(&params);
        let mut pop = PopulationBuilder::new(&params).size(1_000).build(&mut SimRng::new(8)).unwrap();
        let mut rels = RelationshipStore::new();
        let mut rng = SimRng::new(9);

        let mut formed = 0;
        for _ in 0..12 {
            formed += engine.step(&mut pop, &mut rels, &mut rng).unwrap().formed;
            rels.check_consistency(&pop).unwrap();
            pop.check_invariants().unwrap();
        }
        assert!(formed > 0);
        for rel in rels.iter() {
            let (a, b) = rel.endpoints();
            let (a, b) = (pop.agent(a).unwrap(), pop.agent(b).unwrap());
            if rel.kind() == RelKind::Sexual {
                assert!(a.sex_type().sex_possible(b.sex_type()));
            } else {
                assert!(a.is_idu() && b.is_idu());
            }
        }
    }
}
