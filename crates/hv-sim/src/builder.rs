//! Fluent builder for constructing a [`Sim`].

use hv_agent::{Population, PopulationBuilder};
use hv_core::{Params, RngStreams, Seeds};
use hv_network::RelationshipStore;

use crate::{Sim, SimError, SimResult};

/// Fluent builder for [`Sim`].
///
/// # Optional inputs (have defaults)
///
/// | Method               | Default                                        |
/// |----------------------|------------------------------------------------|
/// | `.seeds(s)`          | `params.seeds`                                 |
/// | `.population(p)`     | Built by `PopulationBuilder` on the pop stream |
/// | `.relationships(r)`  | Empty store                                    |
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimBuilder::new(params).seeds(seeds).build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder {
    params:        Params,
    seeds:         Option<Seeds>,
    population:    Option<Population>,
    relationships: Option<RelationshipStore>,
}

impl SimBuilder {
    pub fn new(params: Params) -> Self {
        Self { params, seeds: None, population: None, relationships: None }
    }

    /// Override `params.seeds`.
    pub fn seeds(mut self, seeds: Seeds) -> Self {
        self.seeds = Some(seeds);
        self
    }

    /// Start from a prepared population instead of building one.
    pub fn population(mut self, population: Population) -> Self {
        self.population = Some(population);
        self
    }

    /// Relationships already linked into the supplied population.
    pub fn relationships(mut self, relationships: RelationshipStore) -> Self {
        self.relationships = Some(relationships);
        self
    }

    /// Validate parameters, build (or adopt) the population, seed agent zero
    /// if enabled, and return a ready-to-run [`Sim`].
    pub fn build(self) -> SimResult<Sim> {
        let mut params = self.params;
        params.validate()?;
        if let Some(seeds) = self.seeds {
            params.seeds = seeds;
        }
        let s = &params.seeds;
        let mut rngs = RngStreams::new(s.run_seed, s.pop_seed, s.net_seed);

        let pop = match self.population {
            Some(pop) => pop,
            None => PopulationBuilder::new(&params).build(&mut rngs.pop)?,
        };
        let rels = self.relationships.unwrap_or_default();
        rels.check_consistency(&pop).map_err(|e| {
            SimError::Config(format!("supplied relationships do not match the population: {e}"))
        })?;

        let agent_zero = params.features.agent_zero;
        let mut sim = Sim::new(params, pop, rels, rngs);
        if agent_zero {
            sim.seed_agent_zero()?;
        }
        Ok(sim)
    }
}
