//! CSV output backend.
//!
//! Creates three files in the configured output directory:
//! - `step_summaries.csv`
//! - `edges.csv`
//! - `components.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{ComponentRow, EdgeRow, OutputResult, StepSummaryRow};

pub struct CsvWriter {
    summaries:  Writer<File>,
    edges:      Writer<File>,
    components: Writer<File>,
    finished:   bool,
}

impl CsvWriter {
    /// Create `dir` if needed, open the three CSV files, and write headers.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;

        let mut summaries = Writer::from_path(dir.join("step_summaries.csv"))?;
        summaries.write_record(StepSummaryRow::HEADER)?;

        let mut edges = Writer::from_path(dir.join("edges.csv"))?;
        edges.write_record(["replicate", "t", "a", "b"])?;

        let mut components = Writer::from_path(dir.join("components.csv"))?;
        components.write_record(["replicate", "t", "component", "agent", "size"])?;

        log::debug!("writing CSV output to {}", dir.display());
        Ok(Self { summaries, edges, components, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_summary(&mut self, row: &StepSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(row.record())?;
        Ok(())
    }

    fn write_edges(&mut self, rows: &[EdgeRow]) -> OutputResult<()> {
        for row in rows {
            self.edges.write_record(&[
                row.replicate.to_string(),
                row.t.to_string(),
                row.a.to_string(),
                row.b.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_components(&mut self, rows: &[ComponentRow]) -> OutputResult<()> {
        for row in rows {
            self.components.write_record(&[
                row.replicate.to_string(),
                row.t.to_string(),
                row.component.to_string(),
                row.agent.to_string(),
                row.size.to_string(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.summaries.flush()?;
        self.edges.flush()?;
        self.components.flush()?;
        Ok(())
    }
}
