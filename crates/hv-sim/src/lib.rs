//! `hv-sim` — the monthly step loop for the `hiv_abm` simulation.
//!
//! # Step loop
//!
//! ```text
//! build:  params → RngStreams{run, pop, net} → PopulationBuilder (pop)
//!         → optional agent zero (IDU, four partners, infected)
//! burn:   for m in 0..burn_duration:
//!             partnerships → HR windows + incarceration → mortality
//!         clear step sets
//! main:   for t in 1..=tmax:
//!   ① Partnerships  — dissolve, then form (net stream)
//!   ② Transmission  — serodiscordant free pairs, snapshot order
//!   ③ Agents        — HR window, incarceration, progression, care
//!   ④ Report        — SimObserver::on_step sees this step's event sets
//!   ⑤ Mortality     — reset death counts, die-and-replace
//!   ⑥ Cleanup       — clear step sets, one-shot treatment trigger
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                     |
//! |------------|--------------------------------------------|
//! | `parallel` | Runs replicates on Rayon's thread pool.    |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use hv_core::Params;
//! use hv_sim::{SimBuilder, SummaryRecorder};
//!
//! let params = Params::from_json_path("params.json".as_ref())?;
//! let mut recorder = SummaryRecorder::new();
//! SimBuilder::new(params).build()?.run(&mut recorder)?;
//! ```

pub mod builder;
pub mod error;
pub mod observer;
pub mod replicate;
pub mod sim;

#[cfg(test)]
mod tests;

pub use builder::SimBuilder;
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, SimObserver, StepReport, StepSummary, SummaryRecorder};
pub use replicate::{replicate_seeds, run_replicates};
pub use sim::{AGENT_ZERO_PARTNERS, Sim};
