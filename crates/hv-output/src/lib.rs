//! `hv-output` — CSV reporters for the hiv_abm simulation.
//!
//! | File                  | Written                              | Columns                                   |
//! |-----------------------|--------------------------------------|-------------------------------------------|
//! | `step_summaries.csv`  | every main step                      | replicate, t, headline counts, prevalence |
//! | `edges.csv`           | every `dump_every` steps (optional)  | replicate, t, a, b                        |
//! | `components.csv`      | every `dump_every` steps (optional)  | replicate, t, component, agent, size      |
//!
//! [`CsvWriter`] implements [`OutputWriter`]; [`SimOutputObserver`] drives it
//! from `hv_sim::SimObserver` callbacks.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hv_output::{CsvWriter, SimOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = SimOutputObserver::new(writer, 0).with_network_dumps(12);
//! sim.run(&mut obs)?;
//! if let Some(e) = obs.take_error() { log::error!("output error: {e}"); }
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use crate::csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::SimOutputObserver;
pub use row::{ComponentRow, EdgeRow, StepSummaryRow};
pub use writer::OutputWriter;
