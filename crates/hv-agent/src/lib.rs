//! `hv-agent` — agents, counted agent sets, and the population store for
//! the `hiv_abm` simulation.
//!
//! # Crate layout
//!
//! | Module           | Contents                                                  |
//! |------------------|-----------------------------------------------------------|
//! | [`agent`]        | `Agent` record, write-once `Demographics`                 |
//! | [`set`]          | `AgentSet` (ordered, counted, keyed subsets), `SetKey`    |
//! | [`population`]   | `Population` (sole owner), `FlagSets`, `StepSets`         |
//! | [`builder`]      | `PopulationBuilder`, sentence and adherence draws         |
//! | [`error`]        | `AgentError`, `AgentResult`                               |
//!
//! # Set layout
//!
//! ```text
//! All ─┬─ HM, HF, MSM, MTF, WSW, MSW
//!      ├─ NDU, NIDU, IDU
//!      └─ WHITE, BLACK
//!
//! HIV, AIDS, Tested, HAART, PrEP, Incarcerated, HighRisk        (same subsets)
//! NewInfections, NewDiagnosis, NewHRrolls, NewIncarRelease      (per step)
//! ```

pub mod agent;
pub mod builder;
pub mod error;
pub mod population;
pub mod set;

#[cfg(test)]
mod tests;

pub use agent::{Agent, Demographics};
pub use builder::{Facility, PopulationBuilder, draw_haart_adherence, draw_sentence};
pub use error::{AgentError, AgentResult};
pub use population::{FlagSets, Population, StepSets};
pub use set::{AgentSet, SetKey};
