//! `hv-core` — foundational types for the `hiv_abm` simulation.
//!
//! This crate is a dependency of every other `hv-*` crate.  It has no `hv-*`
//! dependencies of its own.
//!
//! # What lives here
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`ids`]         | `AgentId`, `RelId`                                         |
//! | [`time`]        | `Tick` (one simulated month)                               |
//! | [`rng`]         | `SimRng`, `RngStreams` (run / pop / net)                   |
//! | [`types`]       | `SexType`, `DrugType`, `Race`, `SexRole`, mode enums       |
//! | [`params`]      | `Params` bundle, JSON loading, validation                  |
//! | [`error`]       | `HvError`, `HvResult`                                      |

pub mod error;
pub mod ids;
pub mod params;
pub mod rng;
pub mod time;
pub mod types;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{HvError, HvResult};
pub use ids::{AgentId, RelId};
pub use params::{
    AdherenceTable, AgeBin, AssortParams, Bin, Calibration, ClinicBin, DemographicRow,
    Features, HighRiskParams, IncarParams, MortalityRates, Params, PartnershipParams,
    PrepParams, RaceDemographics, RoleDist, Seeds, Sizing, TransmissionTables,
    TreatmentParams, BehaviorParams,
};
pub use rng::{RngStreams, SimRng};
pub use time::Tick;
pub use types::{
    AssortMode, ClinicCategory, DrugType, PostReleaseTreatment, PrepTargetModel, PrepType,
    Race, SexRole, SexType,
};
