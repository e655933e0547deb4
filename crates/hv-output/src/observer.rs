//! `SimOutputObserver<W>`: bridges `SimObserver` to an `OutputWriter`.

use hv_core::Tick;
use hv_network::Components;
use hv_sim::{SimObserver, StepReport};

use crate::row::{ComponentRow, EdgeRow, StepSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that writes per-step summaries and, optionally, periodic
/// edge-list and component-membership dumps to an [`OutputWriter`].
///
/// Writer errors are stored because `SimObserver` methods return nothing.
/// Check with [`take_error`][Self::take_error] after `sim.run()` returns.
pub struct SimOutputObserver<W: OutputWriter> {
    writer:     W,
    replicate:  usize,
    dump_every: u32,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> SimOutputObserver<W> {
    /// Summaries only; tagged with replicate `replicate`.
    pub fn new(writer: W, replicate: usize) -> Self {
        Self { writer, replicate, dump_every: 0, last_error: None }
    }

    /// Also dump the edge list and component membership every `every` steps
    /// (0 disables).
    pub fn with_network_dumps(mut self, every: u32) -> Self {
        self.dump_every = every;
        self
    }

    /// Take the stored write error (if any) after `sim.run()` returns.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // First error wins.
            if self.last_error.is_none() {
                log::error!("output write failed: {e}");
                self.last_error = Some(e);
            }
        }
    }

    fn dump_due(&self, t: Tick) -> bool {
        self.dump_every > 0 && t.0 % self.dump_every == 0
    }

    fn edge_rows(&self, report: &StepReport<'_>) -> Vec<EdgeRow> {
        report
            .rels
            .edge_list()
            .into_iter()
            .map(|(a, b)| EdgeRow { replicate: self.replicate, t: report.t.0, a: a.0, b: b.0 })
            .collect()
    }

    fn component_rows(&self, report: &StepReport<'_>) -> Vec<ComponentRow> {
        let components = Components::of(report.pop);
        components
            .groups()
            .iter()
            .enumerate()
            .flat_map(|(c, members)| {
                members.iter().map(move |&agent| ComponentRow {
                    replicate: self.replicate,
                    t:         report.t.0,
                    component: c,
                    agent:     agent.0,
                    size:      members.len(),
                })
            })
            .collect()
    }
}

impl<W: OutputWriter> SimObserver for SimOutputObserver<W> {
    fn on_step(&mut self, report: &StepReport<'_>) {
        let row = StepSummaryRow { replicate: self.replicate, summary: report.summary() };
        let result = self.writer.write_summary(&row);
        self.store_err(result);

        if self.dump_due(report.t) {
            let edges = self.edge_rows(report);
            let result = self.writer.write_edges(&edges);
            self.store_err(result);

            let components = self.component_rows(report);
            let result = self.writer.write_components(&components);
            self.store_err(result);
        }
    }

    fn on_sim_end(&mut self, _final_tick: Tick) {
        let result = self.writer.finish();
        self.store_err(result);
    }
}
