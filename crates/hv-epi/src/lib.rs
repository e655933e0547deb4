//! `hv-epi` — the epidemic engines for the `hiv_abm` simulation.
//!
//! | Module             | Contents                                                     |
//! |--------------------|--------------------------------------------------------------|
//! | [`transmission`]   | `TransmissionEngine`: needle/sex acts, per-act probability, PrEP reduction |
//! | [`progression`]    | `ProgressionEngine`: time-in-state, AIDS progression          |
//! | [`mortality`]      | `MortalityEngine`: death draws, die-and-replace, `DeathCounts` |
//! | [`error`]          | `EpiError`, `EpiResult`                                      |
//!
//! Engines borrow the immutable `Params` and take the population, the
//! relationship store, and an RNG stream per call.

pub mod error;
pub mod mortality;
pub mod progression;
pub mod transmission;


pub use error::{EpiError, EpiResult};
pub use mortality::{DeathCounts, MortalityEngine};
pub use progression::{AIDS_PROGRESSION, ProgressionEngine};
pub use transmission::{Route, TransmissionEngine, TransmissionStats, cumulative_prob};
