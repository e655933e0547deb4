//! The `OutputWriter` trait implemented by backend writers.

use crate::{ComponentRow, EdgeRow, OutputResult, StepSummaryRow};

/// Sink for everything the reporter emits.
///
/// Errors are stored by the observer and retrieved with
/// [`SimOutputObserver::take_error`](crate::SimOutputObserver::take_error).
pub trait OutputWriter {
    fn write_summary(&mut self, row: &StepSummaryRow) -> OutputResult<()>;

    fn write_edges(&mut self, rows: &[EdgeRow]) -> OutputResult<()>;

    fn write_components(&mut self, rows: &[ComponentRow]) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent: safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
