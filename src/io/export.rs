//! CSV export for control traces and objective breakdowns.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::control::{ControlObserver, StepRecord};
use crate::objective::EvaluationResult;

/// One control step as recorded by [`TraceRecorder`].
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRow {
    pub step: usize,
    pub planned: bool,
    /// Applied action per building (fraction of capacity).
    pub actions: Vec<f64>,
    /// Stored energy per building after the step (kWh).
    pub socs: Vec<f64>,
}

/// Control observer that keeps every step for later export.
#[derive(Debug, Clone, Default)]
pub struct TraceRecorder {
    rows: Vec<TraceRow>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[TraceRow] {
        &self.rows
    }

    /// Number of steps whose action came from a planner solve.
    pub fn planned_steps(&self) -> usize {
        self.rows.iter().filter(|r| r.planned).count()
    }
}

impl ControlObserver for TraceRecorder {
    fn on_step(&mut self, record: &StepRecord<'_>) {
        self.rows.push(TraceRow {
            step: record.step,
            planned: record.planned,
            actions: record.actions.as_slice().to_vec(),
            socs: record.socs.to_vec(),
        });
    }
}

/// Exports a control trace to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_trace(rows: &[TraceRow], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_trace_csv(rows, io::BufWriter::new(file))
}

/// Writes a control trace as CSV to any writer.
///
/// Columns are `step,planned`, then `action_<b>` and `soc_kwh_<b>` for each
/// building `b`. The building count is taken from the first row.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_trace_csv(rows: &[TraceRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    let n = rows.first().map_or(0, |r| r.actions.len());

    let mut header = vec!["step".to_string(), "planned".to_string()];
    header.extend((0..n).map(|b| format!("action_{b}")));
    header.extend((0..n).map(|b| format!("soc_kwh_{b}")));
    wtr.write_record(&header)?;

    for r in rows {
        let mut record = vec![r.step.to_string(), r.planned.to_string()];
        record.extend(r.actions.iter().map(|a| format!("{a:.6}")));
        record.extend(r.socs.iter().map(|s| format!("{s:.4}")));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports an objective breakdown to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_breakdown(result: &EvaluationResult, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_breakdown_csv(result, io::BufWriter::new(file))
}

/// Writes one `contribution,value` row per contribution in order, then the
/// `objective` total.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_breakdown_csv(result: &EvaluationResult, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(["contribution", "value"])?;
    for c in &result.objective_contrs {
        wtr.write_record([c.kind.label(), format!("{:.6}", c.value).as_str()])?;
    }
    wtr.write_record(["objective", format!("{:.6}", result.objective).as_str()])?;
    wtr.flush()?;
    Ok(())
}
