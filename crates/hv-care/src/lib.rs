//! `hv-care` — intervention controllers for the `hiv_abm` simulation.
//!
//! | Module               | Contents                                                    |
//! |----------------------|-------------------------------------------------------------|
//! | [`testing`]          | `TestingController`: routine testing, partner notification  |
//! | [`art`]              | `ArtController`: HAART initiation / discontinuation         |
//! | [`prep`]             | `PrepController`: targeting models, injectable PK, fallout   |
//! | [`sne`]              | `enroll_sne`: one-shot syringe-exchange sweep                |
//! | [`incarceration`]    | `IncarcerationController`: entry, intake care, release      |
//! | [`high_risk`]        | `HighRiskController`: post-incarceration high-risk windows   |
//! | [`error`]            | `CareError`, `CareResult`                                   |
//!
//! Every controller borrows `Params` and acts on one agent per call; the
//! driver decides which agents each controller sees and in what order.

pub mod art;
pub mod error;
pub mod high_risk;
pub mod incarceration;
pub mod prep;
pub mod sne;
pub mod testing;


pub use art::{ART_INIT_IDU, ART_INIT_OTHER, ArtController, ArtEvent};
pub use error::{CareError, CareResult};
pub use high_risk::HighRiskController;
pub use incarceration::{IncarEvent, IncarcerationController};
pub use prep::{PrepController, PrepEvent, injectable_load};
pub use sne::enroll_sne;
pub use testing::{PARTNER_TEST_PROB, TestingController};
