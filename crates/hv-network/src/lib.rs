//! `hv-network` — the partnership graph for the `hiv_abm` simulation.
//!
//! # Crate layout
//!
//! | Module             | Contents                                                   |
//! |--------------------|------------------------------------------------------------|
//! | [`relationship`]   | `Relationship`, `RelKind`                                  |
//! | [`store`]          | `RelationshipStore` (owner; keeps endpoint lists in sync)  |
//! | [`engine`]         | `PartnershipEngine` (formation, dissolution), `PartnershipStats` |
//! | [`graph`]          | `Components` (connected components over partner lists)     |
//! | [`error`]          | `NetworkError`, `NetworkResult`                            |
//!
//! The relationship store owns every relationship; agents only index them.
//! There is no separate adjacency structure.  Graph views are derived from
//! the partner lists on demand.

pub mod engine;
pub mod error;
pub mod graph;
pub mod relationship;
pub mod store;

#[cfg(test)]
mod tests;

pub use engine::{PartnershipEngine, PartnershipStats};
pub use error::{NetworkError, NetworkResult};
pub use graph::Components;
pub use relationship::{RelKind, Relationship};
pub use store::RelationshipStore;
